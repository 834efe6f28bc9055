//! Per-cell terrain meshes: the raw sphere grid, seam-aware triangulation
//! tables, the GPU vertex format, and the sink that receives finished meshes.

pub mod grid;
pub mod sink;
pub mod triangulation;
pub mod vertex;

pub use grid::GridBuffers;
pub use sink::{MeshKey, MeshSink, NullSink, RecordingSink, SinkEvent, SinkMesh};
pub use triangulation::{TRIANGULATION_COUNT, TriangulationError, TriangulationTables, triangle_count};
pub use vertex::SurfaceVertex;
