//! Triangle primitive.
//!
//! Uses the Möller-Trumbore algorithm for ray-triangle intersection.

use crate::{Aabb, Ray, Vec3};

/// Determinants below this magnitude are treated as parallel/degenerate.
pub const DETERMINANT_EPSILON: f32 = 1e-7;

/// A triangle with the per-face data the BVH builder needs precomputed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub v0: Vec3,
    pub v1: Vec3,
    pub v2: Vec3,
    pub centroid: Vec3,
    pub bbox: Aabb,
    pub area: f32,
}

impl Triangle {
    /// Create a new triangle from three vertices.
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        let area = 0.5 * (v1 - v0).cross(v2 - v0).length();
        Self {
            v0,
            v1,
            v2,
            centroid: (v0 + v1 + v2) / 3.0,
            bbox: Aabb::enclosing(&[v0, v1, v2]),
            area,
        }
    }

    /// Unit geometric normal following the counter-clockwise winding
    /// `v0 -> v1 -> v2`. Zero for degenerate triangles.
    pub fn normal(&self) -> Vec3 {
        (self.v1 - self.v0).cross(self.v2 - self.v0).normalize_or_zero()
    }

    /// Möller-Trumbore intersection.
    ///
    /// Returns the ray parameter of the hit if it lies inside `ray.t`.
    /// Near-parallel rays and degenerate triangles are reported as misses.
    #[inline]
    pub fn intersect(&self, ray: &Ray) -> Option<f32> {
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;

        let h = ray.direction.cross(edge2);
        let det = edge1.dot(h);
        if det.abs() < DETERMINANT_EPSILON {
            return None;
        }

        let inv_det = 1.0 / det;
        let s = ray.origin - self.v0;
        let u = inv_det * s.dot(h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(edge1);
        let v = inv_det * ray.direction.dot(q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = inv_det * edge2.dot(q);
        if t < 0.0 || !ray.t.contains(t) {
            return None;
        }
        Some(t)
    }

    /// Barycentric weights `(w0, w1, w2)` of a point on the triangle's plane.
    ///
    /// Only meaningful after a confirmed hit; traversal never needs them.
    pub fn barycentric(&self, p: Vec3) -> Vec3 {
        let e0 = self.v1 - self.v0;
        let e1 = self.v2 - self.v0;
        let e2 = p - self.v0;

        let d00 = e0.dot(e0);
        let d01 = e0.dot(e1);
        let d11 = e1.dot(e1);
        let d20 = e2.dot(e0);
        let d21 = e2.dot(e1);

        let denom = d00 * d11 - d01 * d01;
        if denom.abs() < f32::EPSILON {
            return Vec3::new(1.0, 0.0, 0.0);
        }
        let w1 = (d11 * d20 - d01 * d21) / denom;
        let w2 = (d00 * d21 - d01 * d20) / denom;
        Vec3::new(1.0 - w1 - w2, w1, w2)
    }

    /// Maps `(u, v)` in the unit square to a point uniformly distributed over
    /// the triangle's area.
    pub fn sample_point(&self, u: f32, v: f32) -> Vec3 {
        let su = u.sqrt();
        self.v0 * (1.0 - su) + self.v1 * (su * (1.0 - v)) + self.v2 * (su * v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Interval;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn xy_triangle() -> Triangle {
        // Triangle in XY plane at z=-1
        Triangle::new(
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(1.0, -1.0, -1.0),
            Vec3::new(0.0, 1.0, -1.0),
        )
    }

    #[test]
    fn test_triangle_hit() {
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0));
        let t = xy_triangle().intersect(&ray).unwrap();
        assert!((t - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_triangle_miss() {
        let away = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, 1.0));
        assert!(xy_triangle().intersect(&away).is_none());

        let outside = Ray::new(Vec3::new(5.0, 0.0, 0.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(xy_triangle().intersect(&outside).is_none());
    }

    #[test]
    fn test_triangle_respects_ray_range() {
        let ray = Ray::with_range(Vec3::ZERO, -Vec3::Z, Interval::new(0.0, 0.5));
        assert!(xy_triangle().intersect(&ray).is_none());
    }

    #[test]
    fn test_parallel_ray_is_rejected() {
        let ray = Ray::new(Vec3::new(-5.0, 0.0, -1.0), Vec3::X);
        assert!(xy_triangle().intersect(&ray).is_none());
    }

    #[test]
    fn test_degenerate_triangle_never_hits() {
        let sliver = Triangle::new(Vec3::ZERO, Vec3::X, Vec3::new(2.0, 0.0, 0.0));
        let ray = Ray::new(Vec3::new(0.5, 0.0, 1.0), -Vec3::Z);
        assert!(sliver.intersect(&ray).is_none());
        assert_eq!(sliver.area, 0.0);
    }

    #[test]
    fn test_triangle_precomputed_fields() {
        let tri = Triangle::new(Vec3::ZERO, Vec3::X, Vec3::Y);
        assert!((tri.area - 0.5).abs() < 1e-6);
        assert!((tri.centroid - Vec3::new(1.0 / 3.0, 1.0 / 3.0, 0.0)).length() < 1e-6);
        assert_eq!(tri.bbox.min, Vec3::ZERO);
        assert_eq!(tri.bbox.max, Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(tri.normal(), Vec3::Z);
    }

    #[test]
    fn test_barycentric_weights_sum_to_one() {
        let tri = Triangle::new(
            Vec3::new(0.3, -1.2, 2.0),
            Vec3::new(4.0, 0.5, -1.0),
            Vec3::new(-2.0, 3.0, 0.7),
        );
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..1000 {
            let p = tri.sample_point(rng.gen(), rng.gen());
            let w = tri.barycentric(p);
            assert!((w.x + w.y + w.z - 1.0).abs() < 1e-5);
            assert!(w.min_element() > -1e-4, "point outside triangle: {w:?}");

            let rebuilt = tri.v0 * w.x + tri.v1 * w.y + tri.v2 * w.z;
            assert!((rebuilt - p).length() < 1e-4);
        }
    }

    #[test]
    fn test_sample_point_stays_on_triangle_plane() {
        let tri = xy_triangle();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..100 {
            let p = tri.sample_point(rng.gen(), rng.gen());
            assert!((p.z + 1.0).abs() < 1e-6);
        }
    }
}
