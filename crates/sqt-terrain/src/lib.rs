//! Terrain displacement and asynchronous cell mesh builds.
//!
//! A [`DisplacementProvider`] perturbs the raw sphere grid of a cell. Builds
//! run on a worker pool ([`AsyncMeshBuilder`]) or inline on the caller
//! ([`SyncMeshBuilder`]) and can be cancelled through a [`CancelToken`].

mod builder;
mod cancel;
mod displacement;
mod material;
mod perlin;

pub use builder::{
    AsyncMeshBuilder, BuildError, BuildRequest, BuildResult, MeshBuilder, SyncMeshBuilder,
    build_mesh_sync, default_worker_count,
};
pub use cancel::CancelToken;
pub use displacement::{DisplacementError, DisplacementProvider, NoDisplacement};
pub use material::{MaterialParams, MaterialValue, TextureData};
pub use perlin::{PERLIN_SIZE, Perlin, PerlinDisplacement, PerlinSample, PerlinSettings};
