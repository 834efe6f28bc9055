//! Level-of-detail for the spherical quadtree: the node arena, the reconciler
//! that refines it around a viewpoint, and the manager driving it over time.

mod context;
mod error;
mod manager;
mod node;
mod reconciler;
mod reconciliation;
mod tree;
mod viewpoint;

pub use context::{Constants, Context, Depth};
pub use error::LodError;
pub use manager::{
    BuilderFactory, TerrainManager, async_builder, provider_from_config, sync_builder,
};
pub use node::{BuildState, Node, NodeId};
pub use reconciler::{ReconcileStats, Reconciler};
pub use reconciliation::ReconciliationData;
pub use tree::QuadTree;
pub use viewpoint::{PerspectiveViewpoint, Viewpoint};
