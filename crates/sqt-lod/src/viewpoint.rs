//! Observer the terrain is refined for.

use glam::{DMat3, DQuat, DVec3};

/// Position, heading, and screen mapping of an observer in sphere-local space
/// (unit sphere at the origin).
///
/// Screen coordinates are pixels with the origin at the bottom-left corner
/// and `z` holding the distance along the view direction.
pub trait Viewpoint {
    fn position(&self) -> DVec3;

    /// Unit view direction.
    fn forward(&self) -> DVec3;

    fn world_to_screen(&self, world: DVec3) -> DVec3;

    fn screen_to_world(&self, screen: DVec3) -> DVec3;
}

/// Pinhole camera with a vertical field of view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveViewpoint {
    /// Position in sphere-local space.
    pub position: DVec3,
    /// Rotation as a unit quaternion. Identity looks down −Z.
    pub rotation: DQuat,
    /// Vertical field of view in radians.
    pub fov_y: f64,
    /// Viewport width in pixels.
    pub width: f64,
    /// Viewport height in pixels.
    pub height: f64,
}

impl PerspectiveViewpoint {
    /// Camera at `position` looking at `target`.
    ///
    /// Falls back to the identity rotation when the two coincide and picks
    /// another up vector when `up` is parallel to the view direction.
    pub fn looking_at(
        position: DVec3,
        target: DVec3,
        up: DVec3,
        fov_y: f64,
        width: f64,
        height: f64,
    ) -> Self {
        let rotation = match (target - position).try_normalize() {
            Some(forward) => {
                let right = forward
                    .cross(up)
                    .try_normalize()
                    .or_else(|| forward.cross(DVec3::X).try_normalize())
                    .unwrap_or(DVec3::Z);
                let camera_up = right.cross(forward);
                DQuat::from_mat3(&DMat3::from_cols(right, camera_up, -forward))
            }
            None => DQuat::IDENTITY,
        };
        Self {
            position,
            rotation,
            fov_y,
            width,
            height,
        }
    }

    /// The up direction vector (+Y in camera space).
    pub fn up(&self) -> DVec3 {
        self.rotation * DVec3::Y
    }

    /// The right direction vector (+X in camera space).
    pub fn right(&self) -> DVec3 {
        self.rotation * DVec3::X
    }

    /// Pixels per world unit at unit distance.
    pub fn focal_length(&self) -> f64 {
        self.height * 0.5 / (self.fov_y * 0.5).tan()
    }
}

impl Viewpoint for PerspectiveViewpoint {
    fn position(&self) -> DVec3 {
        self.position
    }

    /// The forward direction vector (-Z in camera space).
    fn forward(&self) -> DVec3 {
        self.rotation * DVec3::NEG_Z
    }

    fn world_to_screen(&self, world: DVec3) -> DVec3 {
        let view = self.rotation.inverse() * (world - self.position);
        let depth = -view.z;
        let scale = self.focal_length() / depth;
        DVec3::new(
            self.width * 0.5 + view.x * scale,
            self.height * 0.5 + view.y * scale,
            depth,
        )
    }

    fn screen_to_world(&self, screen: DVec3) -> DVec3 {
        let depth = screen.z;
        let scale = depth / self.focal_length();
        let view = DVec3::new(
            (screen.x - self.width * 0.5) * scale,
            (screen.y - self.height * 0.5) * scale,
            -depth,
        );
        self.position + self.rotation * view
    }
}
