//! Immutable per-configuration data shared by the reconciler and the tree.

use std::sync::Arc;

use sqt_config::{MAX_SUPPORTED_DEPTH, TerrainConfig};
use sqt_mesh::TriangulationTables;

use crate::LodError;

/// Tunables fixed for the lifetime of a [`Context`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constants {
    pub max_depth: u8,
    /// Vertices per grid edge. Always odd.
    pub resolution: u32,
    /// Target on-screen triangle edge length in pixels.
    pub desired_screen_space_length: f32,
}

impl Constants {
    /// Normalize a terrain config: the requested resolution `r` becomes `2r − 1`.
    pub fn from_config(config: &TerrainConfig) -> Self {
        Self {
            max_depth: config.max_depth,
            resolution: config.grid_resolution(),
            desired_screen_space_length: config.desired_screen_space_length,
        }
    }
}

/// Sizes of a quadtree level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Depth {
    pub index: u8,
    /// Half-extent of a cell in face-plane units: `2^-index`.
    pub scale: f64,
    /// Rough spacing between grid vertices: `scale / resolution`.
    pub approximate_size: f64,
}

#[derive(Debug, Clone)]
pub struct Context {
    pub constants: Constants,
    depths: Vec<Depth>,
    triangulations: Arc<TriangulationTables>,
}

impl Context {
    pub fn new(constants: Constants) -> Result<Self, LodError> {
        if constants.max_depth > MAX_SUPPORTED_DEPTH {
            return Err(LodError::DepthTooLarge {
                requested: constants.max_depth,
                supported: MAX_SUPPORTED_DEPTH,
            });
        }
        let triangulations = Arc::new(TriangulationTables::new(constants.resolution)?);
        let depths = (0..=constants.max_depth)
            .map(|index| {
                let scale = 0.5f64.powi(i32::from(index));
                Depth {
                    index,
                    scale,
                    approximate_size: scale / f64::from(constants.resolution),
                }
            })
            .collect();
        Ok(Self {
            constants,
            depths,
            triangulations,
        })
    }

    pub fn from_config(config: &TerrainConfig) -> Result<Self, LodError> {
        Self::new(Constants::from_config(config))
    }

    pub fn max_depth(&self) -> u8 {
        self.constants.max_depth
    }

    pub fn resolution(&self) -> u32 {
        self.constants.resolution
    }

    /// Constants for `depth`, clamped to the deepest level.
    pub fn depth(&self, depth: u8) -> &Depth {
        let index = usize::from(depth).min(self.depths.len() - 1);
        &self.depths[index]
    }

    pub fn depths(&self) -> &[Depth] {
        &self.depths
    }

    pub fn triangulations(&self) -> &TriangulationTables {
        &self.triangulations
    }
}
