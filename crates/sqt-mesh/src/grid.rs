//! Raw sphere grid for one quadtree cell.

use glam::{DVec2, Vec3};
use sqt_cubesphere::{Face, face_plane_to_sphere};

use crate::SurfaceVertex;

/// Positions and normals of a `resolution × resolution` lattice, row-major
/// with vertex index `x + resolution · y`.
#[derive(Debug, Clone, PartialEq)]
pub struct GridBuffers {
    pub resolution: u32,
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
}

impl GridBuffers {
    /// Lattice covering the square of half-extent `scale` centred at `offset`
    /// in the plane of `face`, projected onto the unit sphere. Every normal
    /// equals its position.
    pub fn generate(face: Face, offset: DVec2, scale: f64, resolution: u32) -> Self {
        let count = (resolution * resolution) as usize;
        let mut positions = Vec::with_capacity(count);
        let step = if resolution > 1 {
            2.0 / f64::from(resolution - 1)
        } else {
            0.0
        };

        for y in 0..resolution {
            for x in 0..resolution {
                let local = DVec2::new(
                    -1.0 + step * f64::from(x),
                    -1.0 + step * f64::from(y),
                );
                let on_sphere = face_plane_to_sphere(face, offset + local * scale);
                positions.push(on_sphere.as_vec3());
            }
        }

        let normals = positions.clone();
        Self {
            resolution,
            positions,
            normals,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Interleave into the GPU vertex format.
    pub fn vertices(&self) -> Vec<SurfaceVertex> {
        self.positions
            .iter()
            .zip(&self.normals)
            .map(|(&p, &n)| SurfaceVertex::new(p, n))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_grid_spans_face() {
        let grid = GridBuffers::generate(Face::Up, DVec2::ZERO, 1.0, 5);
        assert_eq!(grid.vertex_count(), 25);
        // Centre vertex sits on the face normal.
        assert!((grid.positions[12] - Vec3::Y).length() < 1e-6);
        // Corner (x=0, y=0) is the cube corner up − forward − right.
        let corner = Vec3::new(-1.0, 1.0, 1.0).normalize();
        assert!((grid.positions[0] - corner).length() < 1e-6);
    }

    #[test]
    fn test_positions_on_unit_sphere_and_normals_match() {
        let grid = GridBuffers::generate(Face::Back, DVec2::new(0.5, -0.25), 0.25, 7);
        for (p, n) in grid.positions.iter().zip(&grid.normals) {
            assert!((p.length() - 1.0).abs() < 1e-6);
            assert_eq!(p, n);
        }
    }

    #[test]
    fn test_adjacent_cells_share_boundary_vertices() {
        let r = 5;
        let west = GridBuffers::generate(Face::Left, DVec2::new(-0.5, 0.5), 0.5, r);
        let east = GridBuffers::generate(Face::Left, DVec2::new(0.5, 0.5), 0.5, r);
        for y in 0..r {
            let a = west.positions[(r - 1 + r * y) as usize];
            let b = east.positions[(r * y) as usize];
            assert!((a - b).length() < 1e-6, "row {y} differs");
        }
    }

    #[test]
    fn test_interleaved_vertices() {
        let grid = GridBuffers::generate(Face::Forward, DVec2::ZERO, 1.0, 3);
        let vertices = grid.vertices();
        assert_eq!(vertices.len(), 9);
        assert_eq!(vertices[4].position, [0.0, 0.0, 1.0]);
        assert_eq!(vertices[4].normal, [0.0, 0.0, 1.0]);
    }
}
