//! GPU-ready interleaved vertex for terrain meshes.

/// Position and normal on (or displaced from) the unit sphere.
///
/// Layout (24 bytes total):
///   - `[0..12]`  position `[f32; 3]`
///   - `[12..24]` normal `[f32; 3]`
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SurfaceVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

static_assertions::assert_eq_size!(SurfaceVertex, [u8; 24]);

impl SurfaceVertex {
    pub fn new(position: glam::Vec3, normal: glam::Vec3) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_vertex_casts_to_bytes() {
        let vertices = [
            SurfaceVertex::new(Vec3::X, Vec3::Y),
            SurfaceVertex::new(Vec3::Z, Vec3::NEG_X),
        ];
        let bytes: &[u8] = bytemuck::cast_slice(&vertices);
        assert_eq!(bytes.len(), 48);

        let floats: &[f32] = bytemuck::cast_slice(&vertices);
        assert_eq!(&floats[..6], &[1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
    }
}
