//! Central projection of a direction onto a face plane.

use glam::{DVec2, DVec3};

use crate::Face;

/// Where the ray from the sphere centre along `direction` hits the plane of
/// `face`, in face-plane coordinates.
///
/// Returns `None` when the ray points away from the face or the hit lies
/// outside `[-1, 1]²`. A zero direction is treated as the face normal.
#[must_use]
pub fn point_in_face_plane(face: Face, direction: DVec3) -> Option<DVec2> {
    let up = face.up();
    let (direction, denominator) = if direction == DVec3::ZERO {
        (up, 1.0)
    } else {
        let direction = direction.normalize();
        (direction, up.dot(direction))
    };

    if denominator <= 0.0 {
        return None;
    }

    let on_plane = direction / denominator;
    let local = DVec2::new(face.forward().dot(on_plane), face.right().dot(on_plane));
    if local.x.abs() > 1.0 || local.y.abs() > 1.0 {
        return None;
    }
    Some(local)
}
