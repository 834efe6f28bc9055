//! LOD error types.

use sqt_config::ConfigError;
use sqt_mesh::TriangulationError;
use sqt_terrain::BuildError;

#[derive(Debug, thiserror::Error)]
pub enum LodError {
    #[error("max depth {requested} exceeds the supported maximum {supported}")]
    DepthTooLarge { requested: u8, supported: u8 },

    #[error(transparent)]
    Triangulation(#[from] TriangulationError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
