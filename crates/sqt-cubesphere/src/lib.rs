//! Cube-sphere geometry and quadtree addressing: the six faces and their bases,
//! node paths, cross-face neighbor topology, and cube-to-sphere projection.

mod direction;
mod face;
mod path;
mod plane;
mod projection;
mod topology;

pub use direction::{Direction, Quadrant};
pub use face::Face;
pub use path::{NodeAddress, NodePath, PathError};
pub use plane::point_in_face_plane;
pub use projection::{face_plane_to_cube, face_plane_to_sphere};
pub use topology::{
    NEIGHBOR_ORDINAL, NEIGHBOR_ORDINAL_ROTATION, NEIGHBOR_SAME_PARENT, ROOT_ORDINAL_ROTATION,
    neighbor_address, seam_face,
};
