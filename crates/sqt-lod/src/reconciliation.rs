//! Per-pass refinement target derived from a viewpoint.

use glam::{DVec2, DVec3};
use sqt_cubesphere::{Face, point_in_face_plane};

use crate::{Context, Viewpoint};

/// Where to refine, and how far.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconciliationData {
    /// Face whose plane the viewpoint projects onto.
    pub face: Face,
    /// World length that covers the desired on-screen length at the surface
    /// in front of the viewpoint.
    pub desired_length: f64,
    /// Viewpoint projected onto the face plane, in `[-1, 1]²`.
    pub point_in_plane: DVec2,
}

impl ReconciliationData {
    /// Returns `None` if no face plane accepts the viewpoint direction.
    pub fn from_viewpoint(ctx: &Context, viewpoint: &dyn Viewpoint) -> Option<Self> {
        let position = viewpoint.position();
        let distance = (position.length() - 1.0).abs();

        let aa = position + viewpoint.forward() * distance;
        let a = viewpoint.world_to_screen(aa);
        let b = DVec3::new(
            a.x,
            a.y + f64::from(ctx.constants.desired_screen_space_length),
            a.z,
        );
        let bb = viewpoint.screen_to_world(b);
        let desired_length = (aa - bb).length();

        Face::ALL.into_iter().find_map(|face| {
            point_in_face_plane(face, position).map(|point_in_plane| Self {
                face,
                desired_length,
                point_in_plane,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Constants, PerspectiveViewpoint};
    use std::f64::consts::FRAC_PI_2;

    fn context() -> Context {
        Context::new(Constants {
            max_depth: 4,
            resolution: 5,
            desired_screen_space_length: 10.0,
        })
        .unwrap()
    }

    fn looking_at_origin(position: DVec3) -> PerspectiveViewpoint {
        PerspectiveViewpoint::looking_at(position, DVec3::ZERO, DVec3::Z, FRAC_PI_2, 1280.0, 720.0)
    }

    #[test]
    fn test_above_up_face_centre() {
        let data = ReconciliationData::from_viewpoint(&context(), &looking_at_origin(DVec3::Y * 3.0))
            .unwrap();
        assert_eq!(data.face, Face::Up);
        assert!(data.point_in_plane.length() < 1e-12);
        // 10 px at depth 2 with 360 px per unit.
        let expected = 10.0 * 2.0 / 360.0;
        assert!(
            (data.desired_length - expected).abs() < 1e-9,
            "desired length {} != {expected}",
            data.desired_length
        );
    }

    #[test]
    fn test_desired_length_shrinks_near_surface() {
        let ctx = context();
        let far = ReconciliationData::from_viewpoint(&ctx, &looking_at_origin(DVec3::X * 4.0)).unwrap();
        let near =
            ReconciliationData::from_viewpoint(&ctx, &looking_at_origin(DVec3::X * 1.01)).unwrap();
        assert_eq!(far.face, Face::Right);
        assert!(near.desired_length < far.desired_length);
    }

    #[test]
    fn test_picks_face_below_viewpoint() {
        let ctx = context();
        let data =
            ReconciliationData::from_viewpoint(&ctx, &looking_at_origin(DVec3::new(0.2, -3.0, 0.1)))
                .unwrap();
        assert_eq!(data.face, Face::Down);
        assert!(data.point_in_plane.x.abs() <= 1.0 && data.point_in_plane.y.abs() <= 1.0);
    }

    #[test]
    fn test_face_edge_goes_to_first_face() {
        let ctx = context();
        let data =
            ReconciliationData::from_viewpoint(&ctx, &looking_at_origin(DVec3::new(2.0, 2.0, 0.0)))
                .unwrap();
        assert_eq!(data.face, Face::Up, "ties resolve in face index order");
        assert!((data.point_in_plane - DVec2::new(1.0, 0.0)).length() < 1e-12);
    }

    #[test]
    fn test_viewpoint_at_centre() {
        let ctx = context();
        let camera = PerspectiveViewpoint::looking_at(
            DVec3::ZERO,
            DVec3::NEG_Z,
            DVec3::Y,
            FRAC_PI_2,
            100.0,
            100.0,
        );
        let data = ReconciliationData::from_viewpoint(&ctx, &camera).unwrap();
        assert_eq!(data.face, Face::Up);
        assert_eq!(data.point_in_plane, DVec2::ZERO);
    }
}
