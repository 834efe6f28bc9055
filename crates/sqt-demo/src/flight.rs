//! Scripted camera descent toward the sphere.

use glam::DVec3;
use sqt_config::CameraConfig;
use sqt_lod::PerspectiveViewpoint;

/// Direction the camera approaches from. Off-axis so the target crosses
/// face seams as the tree refines.
const APPROACH: DVec3 = DVec3::new(0.35, 1.0, 0.2);

/// Viewpoints for a geometric descent from `start_distance` to `end_distance`.
pub struct Flight {
    camera: CameraConfig,
    step: u32,
}

impl Flight {
    pub fn new(camera: CameraConfig) -> Self {
        Self { camera, step: 0 }
    }

    /// Distance from the sphere centre at `step`.
    pub fn distance_at(&self, step: u32) -> f64 {
        let steps = self.camera.steps.max(1);
        let t = f64::from(step.min(steps)) / f64::from(steps);
        let ratio = self.camera.end_distance / self.camera.start_distance;
        self.camera.start_distance * ratio.powf(t)
    }

    /// Simulated time at `step`, in seconds.
    pub fn time_at(&self, step: u32) -> f64 {
        f64::from(step) * f64::from(self.camera.tick_s)
    }

    pub fn viewpoint_at(&self, step: u32) -> PerspectiveViewpoint {
        let position = APPROACH.normalize() * self.distance_at(step);
        PerspectiveViewpoint::looking_at(
            position,
            DVec3::ZERO,
            DVec3::Z,
            self.camera.fov_y_deg.to_radians(),
            f64::from(self.camera.viewport_width),
            f64::from(self.camera.viewport_height),
        )
    }
}

impl Iterator for Flight {
    /// `(step, seconds, viewpoint)`
    type Item = (u32, f64, PerspectiveViewpoint);

    fn next(&mut self) -> Option<Self::Item> {
        if self.step > self.camera.steps {
            return None;
        }
        let step = self.step;
        self.step += 1;
        Some((step, self.time_at(step), self.viewpoint_at(step)))
    }
}
