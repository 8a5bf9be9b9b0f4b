//! Camera and the per-frame render view consumed by the streaming engine

use crate::core::types::{Mat4, Vec3};
use glam::Quat;

/// Snapshot of the render context polled once per update cycle
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderView {
    /// Projection matrix (camera to clip space)
    pub projection: Mat4,
    /// View matrix (world to camera space)
    pub view: Mat4,
    /// Viewport width in pixels
    pub viewport_width: u32,
    /// Viewport height in pixels
    pub viewport_height: u32,
}

impl Default for RenderView {
    fn default() -> Self {
        Self {
            projection: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            viewport_width: 1,
            viewport_height: 1,
        }
    }
}

impl RenderView {
    pub fn new(projection: Mat4, view: Mat4, viewport_width: u32, viewport_height: u32) -> Self {
        Self {
            projection,
            view,
            viewport_width,
            viewport_height,
        }
    }

    /// False while either matrix is still identity (camera not set up yet).
    pub fn is_initialized(&self) -> bool {
        self.projection != Mat4::IDENTITY && self.view != Mat4::IDENTITY
    }

    /// Combined `projection * view` matrix used for frustum extraction
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }

    /// Camera position in world space
    pub fn camera_position(&self) -> Vec3 {
        self.view.inverse().w_axis.truncate()
    }

    /// `tan(fov_y / 2)` recovered from a perspective projection matrix.
    ///
    /// Returns `None` for projections without a usable vertical scale.
    pub fn half_fov_slope(&self) -> Option<f32> {
        let scale_y = self.projection.y_axis.y;
        if scale_y.is_finite() && scale_y > 0.0 {
            Some(1.0 / scale_y)
        } else {
            None
        }
    }

    /// Aspect ratio (width / height)
    pub fn aspect(&self) -> f32 {
        self.viewport_width as f32 / self.viewport_height.max(1) as f32
    }
}

/// Perspective camera with position and rotation
#[derive(Clone, Debug)]
pub struct Camera {
    /// World position
    pub position: Vec3,
    /// Rotation as quaternion
    pub rotation: Quat,
    /// Vertical field of view in radians
    pub fov_y: f32,
    /// Near clip plane
    pub near: f32,
    /// Far clip plane
    pub far: f32,
}

impl Camera {
    /// Create a camera at `position` looking down -Z
    pub fn new(position: Vec3, fov_y_degrees: f32) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
            fov_y: fov_y_degrees.to_radians(),
            near: 0.1,
            far: 10_000.0,
        }
    }

    /// Create camera looking at a target
    pub fn look_at(position: Vec3, target: Vec3, up: Vec3) -> Self {
        let forward = (target - position).normalize();
        let right = forward.cross(up).normalize();
        let up = right.cross(forward);

        let rotation = Quat::from_mat3(&glam::Mat3::from_cols(right, up, -forward));

        Self {
            rotation,
            ..Self::new(position, 60.0)
        }
    }

    /// Get view matrix (world to camera space)
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_quat(self.rotation.conjugate()) * Mat4::from_translation(-self.position)
    }

    /// Get projection matrix for the given aspect ratio
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, aspect, self.near, self.far)
    }

    /// Build the render view for a viewport of the given size
    pub fn render_view(&self, viewport_width: u32, viewport_height: u32) -> RenderView {
        let aspect = viewport_width as f32 / viewport_height.max(1) as f32;
        RenderView::new(
            self.projection_matrix(aspect),
            self.view_matrix(),
            viewport_width,
            viewport_height,
        )
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 0.0, 5.0), 60.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_view_is_uninitialized() {
        assert!(!RenderView::default().is_initialized());
    }

    #[test]
    fn test_camera_view_is_initialized() {
        let view = Camera::default().render_view(800, 600);
        assert!(view.is_initialized());
        assert!((view.aspect() - 800.0 / 600.0).abs() < 1e-6);
    }

    #[test]
    fn test_camera_position_roundtrip() {
        let camera = Camera::look_at(Vec3::new(3.0, 4.0, 12.0), Vec3::ZERO, Vec3::Y);
        let view = camera.render_view(640, 480);
        let pos = view.camera_position();
        assert!((pos - camera.position).length() < 1e-3);
    }

    #[test]
    fn test_half_fov_slope() {
        let camera = Camera::new(Vec3::ZERO, 90.0);
        let view = camera.render_view(100, 100);
        // tan(45 deg) == 1
        let slope = view.half_fov_slope().unwrap();
        assert!((slope - 1.0).abs() < 1e-4);
    }
}
