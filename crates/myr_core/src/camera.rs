//! Pinhole camera.

use myr_math::{Mat3, Ray, Vec3};
use serde::{Deserialize, Serialize};

/// Pinhole camera looking down its local -Z axis.
///
/// `orientation` is an orthonormal rotation from camera space to world space.
/// Its columns are the camera's right, up and backward axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub position: Vec3,
    pub orientation: Mat3,
    /// Vertical field of view in radians.
    pub fov: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Mat3::IDENTITY,
            fov: std::f32::consts::FRAC_PI_4,
        }
    }
}

impl Camera {
    pub fn new(position: Vec3, orientation: Mat3, fov: f32) -> Self {
        Self {
            position,
            orientation,
            fov,
        }
    }

    /// Camera at `position` looking towards `target`, with `up` as the
    /// approximate vertical.
    pub fn look_at(position: Vec3, target: Vec3, up: Vec3, fov: f32) -> Self {
        let w = (position - target).normalize();
        let u = up.cross(w).normalize();
        let v = w.cross(u);
        Self::new(position, Mat3::from_cols(u, v, w), fov)
    }

    /// Distance from the pinhole to an image plane `image_height` pixels tall.
    pub fn focal_length(&self, image_height: u32) -> f32 {
        0.5 * image_height as f32 / (0.5 * self.fov).tan()
    }

    /// Primary ray through pixel `(row, col)` offset by `(dx, dy)` in [0, 1).
    ///
    /// Row 0 is the top of the image.
    pub fn generate_ray(&self, row: u32, col: u32, dx: f32, dy: f32, width: u32, height: u32) -> Ray {
        let focal = self.focal_length(height);
        let local = Vec3::new(
            (col as f32 + dx - 0.5 * width as f32) / focal,
            (0.5 * height as f32 - row as f32 - dy) / focal,
            -1.0,
        );
        let direction = self.orientation * local.normalize();
        Ray::new(self.position, direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_focal_length() {
        let camera = Camera::new(Vec3::ZERO, Mat3::IDENTITY, std::f32::consts::FRAC_PI_2);
        // tan(45deg) = 1
        assert!((camera.focal_length(512) - 256.0).abs() < 1e-3);
    }

    #[test]
    fn test_center_ray_points_forward() {
        let camera = Camera::default();
        let ray = camera.generate_ray(50, 50, 0.0, 0.0, 100, 100);

        assert_eq!(ray.origin, Vec3::ZERO);
        assert!((ray.direction - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-6);
        assert!((ray.direction.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_top_left_ray_points_up_and_left() {
        let camera = Camera::default();
        let ray = camera.generate_ray(0, 0, 0.0, 0.0, 100, 100);
        assert!(ray.direction.x < 0.0);
        assert!(ray.direction.y > 0.0);
    }

    #[test]
    fn test_look_at_orientation() {
        let camera = Camera::look_at(
            Vec3::new(0.0, 0.0, 5.0),
            Vec3::ZERO,
            Vec3::Y,
            std::f32::consts::FRAC_PI_3,
        );
        let ray = camera.generate_ray(50, 50, 0.0, 0.0, 100, 100);
        assert!((ray.direction - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-6);

        let down = Camera::look_at(Vec3::new(0.0, 3.0, 0.0), Vec3::ZERO, Vec3::Z, 1.0);
        let ray = down.generate_ray(50, 50, 0.0, 0.0, 100, 100);
        assert!((ray.direction - Vec3::new(0.0, -1.0, 0.0)).length() < 1e-6);

        let o = down.orientation;
        assert!((o.determinant() - 1.0).abs() < 1e-5);
    }
}
