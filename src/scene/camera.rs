//! Orthographic camera

use glam::{Mat4, Vec3};

/// Near plane of the orthographic depth range
pub const ORTHO_NEAR: f32 = -1.0;
/// Far plane of the orthographic depth range
pub const ORTHO_FAR: f32 = 1.0;

/// 2D camera with an orthographic projection, a position and a rotation
/// about the view axis
///
/// The view and view-projection matrices are recomputed by every setter, so
/// the getters never return stale values.
#[derive(Debug, Clone, PartialEq)]
pub struct OrthographicCamera {
    projection_matrix: Mat4,
    view_matrix: Mat4,
    view_projection_matrix: Mat4,

    position: Vec3,
    /// Degrees, counter-clockwise
    rotation: f32,
}

impl OrthographicCamera {
    pub fn new(left: f32, right: f32, bottom: f32, top: f32) -> Self {
        let projection_matrix =
            Mat4::orthographic_rh(left, right, bottom, top, ORTHO_NEAR, ORTHO_FAR);
        Self {
            projection_matrix,
            view_matrix: Mat4::IDENTITY,
            view_projection_matrix: projection_matrix,
            position: Vec3::ZERO,
            rotation: 0.0,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.recalculate_view_matrix();
    }

    /// Rotation in degrees
    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn set_rotation(&mut self, degrees: f32) {
        self.rotation = degrees;
        self.recalculate_view_matrix();
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection_matrix
    }

    /// World-to-view transform (inverse of the camera's own transform)
    pub fn view_matrix(&self) -> Mat4 {
        self.view_matrix
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.view_projection_matrix
    }

    fn recalculate_view_matrix(&mut self) {
        let transform = Mat4::from_translation(self.position)
            * Mat4::from_rotation_z(self.rotation.to_radians());
        self.view_matrix = transform.inverse();
        self.view_projection_matrix = self.projection_matrix * self.view_matrix;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn test_new_camera_has_identity_view() {
        let camera = OrthographicCamera::new(-1.0, 1.0, -1.0, 1.0);
        assert_eq!(camera.view_matrix(), Mat4::IDENTITY);
        assert_eq!(camera.view_projection_matrix(), camera.projection_matrix());
    }

    #[test]
    fn test_rotation_turns_world_the_other_way() {
        let mut camera = OrthographicCamera::new(-1.0, 1.0, -1.0, 1.0);
        camera.set_rotation(90.0);

        let p = camera.view_projection_matrix() * Vec4::new(1.0, 0.0, 0.0, 1.0);
        assert!((p.x - 0.0).abs() < 1e-5);
        assert!((p.y + 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_projection_fixed_at_construction() {
        let mut camera = OrthographicCamera::new(-1.6, 1.6, -0.9, 0.9);
        let projection = Mat4::orthographic_rh(-1.6, 1.6, -0.9, 0.9, ORTHO_NEAR, ORTHO_FAR);

        camera.set_position(Vec3::new(2.0, -1.0, 0.0));
        camera.set_rotation(30.0);

        assert_eq!(camera.projection_matrix(), projection);
    }
}
