//! Face plane to cube and sphere mapping.

use glam::DVec2;
use glam::DVec3;

use crate::Face;

/// Point on the unit cube for face-plane coordinates in `[-1, 1]²`.
#[inline]
#[must_use]
pub fn face_plane_to_cube(face: Face, plane: DVec2) -> DVec3 {
    face.up() + plane.x * face.forward() + plane.y * face.right()
}

/// Point on the unit sphere by normalizing the cube point.
///
/// Cells near face corners cover less of the sphere than those at the face
/// centre; the LOD metric compensates by working in screen space.
#[inline]
#[must_use]
pub fn face_plane_to_sphere(face: Face, plane: DVec2) -> DVec3 {
    face_plane_to_cube(face, plane).normalize()
}
