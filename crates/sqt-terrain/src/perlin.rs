//! Seeded 3D gradient noise with analytic derivatives, and the fBm
//! displacement built on it.
//!
//! The lattice hash follows the two-table layout used by GPU "improved noise":
//! a 256×256 RGBA table holding `(AA, BA, AB, BB)` per `(x, y)` cell and a
//! 256-entry gradient table indexed by `hash + z`. Both are exported so the
//! shading path evaluates exactly the same function.

use std::sync::{Arc, Mutex};

use glam::Vec3;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sqt_mesh::GridBuffers;

use crate::displacement::check_buffers;
use crate::{CancelToken, DisplacementError, DisplacementProvider, MaterialParams, TextureData};

/// Lattice period and table size.
pub const PERLIN_SIZE: usize = 256;

/// Noise value and its gradient with respect to the sample position.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PerlinSample {
    pub value: f32,
    pub derivative: Vec3,
}

impl std::ops::Add for PerlinSample {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self {
            value: self.value + rhs.value,
            derivative: self.derivative + rhs.derivative,
        }
    }
}

impl std::ops::AddAssign for PerlinSample {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl std::ops::Mul<f32> for PerlinSample {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self {
            value: self.value * rhs,
            derivative: self.derivative * rhs,
        }
    }
}

/// Gradient noise over a 256-periodic lattice.
#[derive(Debug, Clone)]
pub struct Perlin {
    permutation: [u8; PERLIN_SIZE * 2],
    gradients: [Vec3; PERLIN_SIZE],
}

impl Perlin {
    pub fn new(seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let mut table: Vec<u8> = (0..PERLIN_SIZE).map(|i| i as u8).collect();
        table.shuffle(&mut rng);
        let mut permutation = [0u8; PERLIN_SIZE * 2];
        for (i, slot) in permutation.iter_mut().enumerate() {
            *slot = table[i % PERLIN_SIZE];
        }

        let mut gradients = [Vec3::ZERO; PERLIN_SIZE];
        for g in gradients.iter_mut() {
            // Uniform on the unit sphere.
            let z: f32 = rng.random_range(-1.0..=1.0);
            let phi: f32 = rng.random_range(0.0..std::f32::consts::TAU);
            let r = (1.0 - z * z).max(0.0).sqrt();
            *g = Vec3::new(r * phi.cos(), r * phi.sin(), z);
        }

        Self {
            permutation,
            gradients,
        }
    }

    /// `(AA, BA, AB, BB)` for lattice column `(x, y)`, both in `0..256`.
    pub fn hash2d(&self, x: usize, y: usize) -> [u8; 4] {
        let p = &self.permutation;
        let a = p[x] as usize + y;
        let b = p[x + 1] as usize + y;
        [p[a], p[b], p[a + 1], p[b + 1]]
    }

    /// Gradient for a hash value combined with a lattice z.
    fn gradient(&self, hash: u8, z: usize) -> Vec3 {
        self.gradients[self.permutation[hash as usize + z] as usize]
    }

    /// Gradient table as seen by the shader: entry `i` is the gradient at
    /// permutation index `i`.
    pub fn permuted_gradients(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.permutation[..PERLIN_SIZE]
            .iter()
            .map(|&i| self.gradients[i as usize])
    }

    pub fn sample(&self, position: Vec3) -> PerlinSample {
        let cell = position.floor();
        let f = position - cell;
        let xi = (cell.x as i64).rem_euclid(PERLIN_SIZE as i64) as usize;
        let yi = (cell.y as i64).rem_euclid(PERLIN_SIZE as i64) as usize;
        let zi = (cell.z as i64).rem_euclid(PERLIN_SIZE as i64) as usize;

        let [aa, ba, ab, bb] = self.hash2d(xi, yi);
        let g000 = self.gradient(aa, zi);
        let g100 = self.gradient(ba, zi);
        let g010 = self.gradient(ab, zi);
        let g110 = self.gradient(bb, zi);
        let g001 = self.gradient(aa, zi + 1);
        let g101 = self.gradient(ba, zi + 1);
        let g011 = self.gradient(ab, zi + 1);
        let g111 = self.gradient(bb, zi + 1);

        let n000 = g000.dot(f);
        let n100 = g100.dot(f - Vec3::X);
        let n010 = g010.dot(f - Vec3::Y);
        let n110 = g110.dot(f - Vec3::new(1.0, 1.0, 0.0));
        let n001 = g001.dot(f - Vec3::Z);
        let n101 = g101.dot(f - Vec3::new(1.0, 0.0, 1.0));
        let n011 = g011.dot(f - Vec3::new(0.0, 1.0, 1.0));
        let n111 = g111.dot(f - Vec3::ONE);

        let (u, v, w) = (fade(f.x), fade(f.y), fade(f.z));
        let (du, dv, dw) = (fade_derivative(f.x), fade_derivative(f.y), fade_derivative(f.z));

        let k1 = n100 - n000;
        let k2 = n010 - n000;
        let k3 = n001 - n000;
        let k4 = n000 - n100 - n010 + n110;
        let k5 = n000 - n010 - n001 + n011;
        let k6 = n000 - n100 - n001 + n101;
        let k7 = -n000 + n100 + n010 - n110 + n001 - n101 - n011 + n111;

        let value = n000 + k1 * u + k2 * v + k3 * w + k4 * u * v + k5 * v * w + k6 * w * u
            + k7 * u * v * w;

        let gradient_blend = g000
            + u * (g100 - g000)
            + v * (g010 - g000)
            + w * (g001 - g000)
            + u * v * (g000 - g100 - g010 + g110)
            + v * w * (g000 - g010 - g001 + g011)
            + w * u * (g000 - g100 - g001 + g101)
            + u * v * w * (-g000 + g100 + g010 - g110 + g001 - g101 - g011 + g111);
        let fade_terms = Vec3::new(
            du * (k1 + k4 * v + k6 * w + k7 * v * w),
            dv * (k2 + k5 * w + k4 * u + k7 * w * u),
            dw * (k3 + k6 * u + k5 * v + k7 * u * v),
        );

        PerlinSample {
            value,
            derivative: gradient_blend + fade_terms,
        }
    }

    /// 256×1 RGBA texture of permuted gradients remapped from `[-1, 1]` to bytes.
    pub fn gradients_texture(&self) -> TextureData {
        let mut texture = TextureData::new(PERLIN_SIZE as u32, 1);
        for (x, g) in self.permuted_gradients().enumerate() {
            let c = (g + Vec3::ONE) * 0.5 * 255.0;
            texture.set_pixel(
                x as u32,
                0,
                [c.x.round() as u8, c.y.round() as u8, c.z.round() as u8, 255],
            );
        }
        texture
    }

    /// 256×256 RGBA texture of [`hash2d`](Self::hash2d).
    pub fn permutation_texture(&self) -> TextureData {
        let mut texture = TextureData::new(PERLIN_SIZE as u32, PERLIN_SIZE as u32);
        for y in 0..PERLIN_SIZE {
            for x in 0..PERLIN_SIZE {
                texture.set_pixel(x as u32, y as u32, self.hash2d(x, y));
            }
        }
        texture
    }
}

#[inline]
fn fade(t: f32) -> f32 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

#[inline]
fn fade_derivative(t: f32) -> f32 {
    30.0 * t * t * (t * (t - 2.0) + 1.0)
}

/// fBm parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerlinSettings {
    pub strength: f32,
    pub frequency: f32,
    pub lacunarity: f32,
    pub persistence: f32,
    pub octaves: u32,
}

impl Default for PerlinSettings {
    fn default() -> Self {
        Self {
            strength: 0.1,
            frequency: 1.0,
            lacunarity: 2.0,
            persistence: 0.5,
            octaves: 8,
        }
    }
}

struct PerlinTextures {
    gradients: Arc<TextureData>,
    permutation: Arc<TextureData>,
}

/// Multi-octave Perlin displacement along vertex normals.
pub struct PerlinDisplacement {
    perlin: Perlin,
    settings: PerlinSettings,
    textures: Mutex<Option<PerlinTextures>>,
}

impl PerlinDisplacement {
    pub fn new(seed: u64, settings: PerlinSettings) -> Self {
        let perlin = Perlin::new(seed);
        let textures = PerlinTextures {
            gradients: Arc::new(perlin.gradients_texture()),
            permutation: Arc::new(perlin.permutation_texture()),
        };
        Self {
            perlin,
            settings,
            textures: Mutex::new(Some(textures)),
        }
    }

    pub fn settings(&self) -> &PerlinSettings {
        &self.settings
    }

    pub fn perlin(&self) -> &Perlin {
        &self.perlin
    }

    /// Sum of octaves at `position`. Each octave's derivative is scaled by its
    /// frequency so the result is the derivative with respect to `position`.
    pub fn sample(&self, position: Vec3) -> PerlinSample {
        let s = &self.settings;
        let mut strength = s.strength;
        let mut frequency = s.frequency;
        let mut sum = PerlinSample::default();
        for _ in 0..s.octaves {
            let mut octave = self.perlin.sample(position * frequency);
            octave.derivative *= frequency;
            sum += octave * strength;
            strength *= s.persistence;
            frequency *= s.lacunarity;
        }
        sum
    }
}

impl DisplacementProvider for PerlinDisplacement {
    fn modify_vertices(
        &self,
        buffers: &mut GridBuffers,
        cancel: &CancelToken,
    ) -> Result<(), DisplacementError> {
        check_buffers(buffers)?;
        let row = buffers.resolution.max(1) as usize;

        for (i, (position, normal)) in buffers
            .positions
            .iter_mut()
            .zip(buffers.normals.iter_mut())
            .enumerate()
        {
            if i % row == 0 && cancel.is_cancelled() {
                return Err(DisplacementError::Cancelled);
            }
            let sample = self.sample(*position);
            *position += *normal * sample.value;
            *normal = (*normal - sample.derivative)
                .try_normalize()
                .unwrap_or(*normal);
        }
        Ok(())
    }

    fn modify_material(&self, material: &mut MaterialParams) {
        if let Ok(guard) = self.textures.lock()
            && let Some(textures) = guard.as_ref()
        {
            material.set_texture("_Gradients2D", Arc::clone(&textures.gradients));
            material.set_texture("_Permutation2D", Arc::clone(&textures.permutation));
        } else {
            material.remove("_Gradients2D");
            material.remove("_Permutation2D");
        }
        material.set_float("_Strength", self.settings.strength);
        material.set_float("_Frequency", self.settings.frequency);
        material.set_float("_Lacunarity", self.settings.lacunarity);
        material.set_float("_Persistence", self.settings.persistence);
        material.set_int("_Octaves", self.settings.octaves as i32);
    }

    fn destroy(&self) {
        if let Ok(mut guard) = self.textures.lock() {
            guard.take();
        }
    }

    fn name(&self) -> &'static str {
        "perlin"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec2;
    use sqt_cubesphere::Face;

    const PROBES: [Vec3; 5] = [
        Vec3::new(0.3, 0.7, 0.1),
        Vec3::new(1.25, -3.5, 2.75),
        Vec3::new(-0.6, 0.2, -0.9),
        Vec3::new(17.3, 4.1, -8.8),
        Vec3::new(0.5, 0.5, 0.5),
    ];

    #[test]
    fn test_same_seed_is_deterministic() {
        let a = Perlin::new(42);
        let b = Perlin::new(42);
        let c = Perlin::new(43);
        for p in PROBES {
            assert_eq!(a.sample(p), b.sample(p));
        }
        assert!(
            PROBES.iter().any(|&p| a.sample(p).value != c.sample(p).value),
            "different seeds should give different noise"
        );
    }

    #[test]
    fn test_zero_at_lattice_points() {
        let perlin = Perlin::new(7);
        for p in [Vec3::ZERO, Vec3::new(3.0, -2.0, 5.0), Vec3::new(255.0, 1.0, 0.0)] {
            assert!(perlin.sample(p).value.abs() < 1e-6, "noise at {p} is not zero");
        }
    }

    #[test]
    fn test_value_is_bounded() {
        let perlin = Perlin::new(1);
        for i in 0..2000 {
            let t = i as f32 * 0.137;
            let p = Vec3::new(t.sin() * 9.0, t * 0.31, (t * 0.7).cos() * 5.0);
            assert!(perlin.sample(p).value.abs() <= 1.0);
        }
    }

    #[test]
    fn test_derivative_matches_finite_difference() {
        let perlin = Perlin::new(99);
        let h = 1e-3;
        for p in PROBES {
            let d = perlin.sample(p).derivative;
            let numeric = Vec3::new(
                (perlin.sample(p + Vec3::X * h).value - perlin.sample(p - Vec3::X * h).value)
                    / (2.0 * h),
                (perlin.sample(p + Vec3::Y * h).value - perlin.sample(p - Vec3::Y * h).value)
                    / (2.0 * h),
                (perlin.sample(p + Vec3::Z * h).value - perlin.sample(p - Vec3::Z * h).value)
                    / (2.0 * h),
            );
            assert!(
                (d - numeric).length() < 1e-2,
                "analytic {d} vs numeric {numeric} at {p}"
            );
        }
    }

    #[test]
    fn test_periodic_over_lattice_size() {
        let perlin = Perlin::new(5);
        let p = Vec3::new(0.25, 0.5, 0.75);
        let shifted = p + Vec3::new(PERLIN_SIZE as f32, 0.0, 0.0);
        assert!((perlin.sample(p).value - perlin.sample(shifted).value).abs() < 1e-4);
    }

    #[test]
    fn test_textures_encode_tables() {
        let perlin = Perlin::new(3);
        let perm = perlin.permutation_texture();
        assert_eq!((perm.width, perm.height), (256, 256));
        assert_eq!(perm.pixel(17, 200), perlin.hash2d(17, 200));

        let grads = perlin.gradients_texture();
        assert_eq!((grads.width, grads.height), (256, 1));
        for (x, g) in perlin.permuted_gradients().enumerate().take(16) {
            let px = grads.pixel(x as u32, 0);
            let decoded = Vec3::new(px[0] as f32, px[1] as f32, px[2] as f32) / 255.0 * 2.0
                - Vec3::ONE;
            assert!((decoded - g).length() < 0.02);
        }
    }

    #[test]
    fn test_fbm_octave_sum() {
        let settings = PerlinSettings {
            strength: 0.5,
            frequency: 2.0,
            lacunarity: 3.0,
            persistence: 0.25,
            octaves: 2,
        };
        let displacement = PerlinDisplacement::new(11, settings);
        let p = Vec3::new(0.4, 0.1, 0.8);
        let perlin = displacement.perlin();
        let expected = perlin.sample(p * 2.0).value * 0.5 + perlin.sample(p * 6.0).value * 0.125;
        assert!((displacement.sample(p).value - expected).abs() < 1e-6);
    }

    #[test]
    fn test_displaces_along_normals() {
        let displacement = PerlinDisplacement::new(21, PerlinSettings::default());
        let original = GridBuffers::generate(Face::Forward, DVec2::new(0.5, 0.5), 0.5, 5);
        let mut grid = original.clone();
        displacement
            .modify_vertices(&mut grid, &CancelToken::new())
            .unwrap();

        for i in 0..grid.vertex_count() {
            let expected = displacement.sample(original.positions[i]).value;
            let radial = grid.positions[i].length() - 1.0;
            assert!((radial - expected).abs() < 1e-5, "vertex {i}");
            assert!((grid.normals[i].length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_cancelled_displacement_stops() {
        let displacement = PerlinDisplacement::new(0, PerlinSettings::default());
        let mut grid = GridBuffers::generate(Face::Up, DVec2::ZERO, 1.0, 9);
        let cancel = CancelToken::new();
        cancel.cancel();
        assert_eq!(
            displacement.modify_vertices(&mut grid, &cancel),
            Err(DisplacementError::Cancelled)
        );
    }

    #[test]
    fn test_material_parameters_and_destroy() {
        let settings = PerlinSettings {
            octaves: 5,
            ..Default::default()
        };
        let displacement = PerlinDisplacement::new(8, settings);
        let mut material = MaterialParams::new();
        displacement.modify_material(&mut material);

        assert_eq!(material.float("_Strength"), Some(0.1));
        assert_eq!(material.float("_Lacunarity"), Some(2.0));
        assert_eq!(material.int("_Octaves"), Some(5));
        assert!(material.texture("_Gradients2D").is_some());
        assert!(material.texture("_Permutation2D").is_some());

        displacement.destroy();
        displacement.modify_material(&mut material);
        assert!(material.texture("_Gradients2D").is_none());
        assert_eq!(material.float("_Frequency"), Some(1.0));
    }
}
