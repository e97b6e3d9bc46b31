use crate::{Ray, Vec3};

/// Axis-Aligned Bounding Box for the BVH.
///
/// Invariant: `min <= max` on every axis for any box that contains at least
/// one point. [`Aabb::EMPTY`] is the inverted box used as the identity for
/// [`Aabb::merge`]; it is never hit by any ray.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Box containing nothing. Merging anything into it yields that thing.
    pub const EMPTY: Aabb = Aabb {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Tightest box around a set of points.
    pub fn enclosing(points: &[Vec3]) -> Self {
        points.iter().fold(Aabb::EMPTY, |acc, p| acc.grow(*p))
    }

    /// Box extended to contain `p`.
    #[inline]
    pub fn grow(&self, p: Vec3) -> Aabb {
        Aabb {
            min: self.min.min(p),
            max: self.max.max(p),
        }
    }

    /// Smallest box containing both.
    #[inline]
    pub fn merge(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }

    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    /// Total area of the six faces. Zero for empty boxes.
    pub fn surface_area(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        let d = self.extent();
        2.0 * (d.x * d.y + d.y * d.z + d.z * d.x)
    }

    /// True if `other` lies entirely inside this box (boundaries included).
    pub fn contains(&self, other: &Aabb) -> bool {
        other.is_empty() || (self.min.cmple(other.min).all() && self.max.cmpge(other.max).all())
    }

    /// Slab test.
    ///
    /// Returns the entry distance clamped to `t_min`, or `None` when the slabs
    /// do not overlap or the box lies entirely behind `t_min`. Axes where the
    /// ray direction is exactly zero are resolved by a containment check on
    /// the origin instead of a division.
    #[inline]
    pub fn intersect(&self, ray: &Ray, t_min: f32) -> Option<f32> {
        let mut entry = f32::NEG_INFINITY;
        let mut exit = f32::INFINITY;

        for axis in 0..3 {
            let origin = ray.origin[axis];
            if ray.direction[axis] == 0.0 {
                if origin < self.min[axis] || origin > self.max[axis] {
                    return None;
                }
                continue;
            }

            let inv = ray.inv_direction[axis];
            let mut t0 = (self.min[axis] - origin) * inv;
            let mut t1 = (self.max[axis] - origin) * inv;
            if inv < 0.0 {
                std::mem::swap(&mut t0, &mut t1);
            }
            entry = entry.max(t0);
            exit = exit.min(t1);
        }

        if entry > exit || exit < t_min {
            return None;
        }
        Some(entry.max(t_min))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corners(a: Vec3, b: Vec3) -> Aabb {
        Aabb::enclosing(&[a, b])
    }

    fn unit_box() -> Aabb {
        corners(Vec3::ZERO, Vec3::ONE)
    }

    #[test]
    fn test_aabb_enclosing_points() {
        let aabb = Aabb::enclosing(&[Vec3::new(10.0, 0.0, 5.0), Vec3::new(0.0, 10.0, 0.0), Vec3::ONE]);

        assert_eq!(aabb.min, Vec3::ZERO);
        assert_eq!(aabb.max, Vec3::new(10.0, 10.0, 5.0));
        assert!(Aabb::enclosing(&[]).is_empty());
    }

    #[test]
    fn test_aabb_merge() {
        let box1 = corners(Vec3::ZERO, Vec3::splat(5.0));
        let box2 = corners(Vec3::splat(3.0), Vec3::splat(10.0));
        let merged = box1.merge(&box2);

        assert_eq!(merged.min, Vec3::ZERO);
        assert_eq!(merged.max, Vec3::splat(10.0));
        assert!(merged.contains(&box1));
        assert!(merged.contains(&box2));
        assert_eq!(Aabb::EMPTY.merge(&box1), box1);
    }

    #[test]
    fn test_aabb_surface_area() {
        assert_eq!(unit_box().surface_area(), 6.0);
        let flat = corners(Vec3::ZERO, Vec3::new(2.0, 3.0, 0.0));
        assert_eq!(flat.surface_area(), 12.0);
        assert_eq!(Aabb::EMPTY.surface_area(), 0.0);
    }

    #[test]
    fn test_aabb_axis_aligned_ray_enters_at_one() {
        let ray = Ray::new(Vec3::new(-1.0, 0.5, 0.5), Vec3::new(1.0, 0.0, 0.0));
        let t = unit_box().intersect(&ray, 0.0);

        assert_eq!(t, Some(1.0));
    }

    #[test]
    fn test_aabb_zero_direction_outside_slab_misses() {
        // y is outside [0, 1] and the ray never moves along y.
        let ray = Ray::new(Vec3::new(-1.0, 2.0, 0.5), Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(unit_box().intersect(&ray, 0.0), None);
    }

    #[test]
    fn test_aabb_hit_and_miss() {
        let aabb = corners(Vec3::splat(-1.0), Vec3::splat(1.0));

        let toward = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);
        assert_eq!(aabb.intersect(&toward, 0.0), Some(4.0));

        let away = Ray::new(Vec3::new(0.0, 0.0, -5.0), -Vec3::Z);
        assert_eq!(aabb.intersect(&away, 0.0), None);

        let beside = Ray::new(Vec3::new(10.0, 0.0, 0.0), Vec3::Z);
        assert_eq!(aabb.intersect(&beside, 0.0), None);
    }

    #[test]
    fn test_aabb_origin_inside_returns_t_min() {
        let ray = Ray::new(Vec3::splat(0.5), Vec3::new(0.3, -0.2, 0.9));
        assert_eq!(unit_box().intersect(&ray, 0.0), Some(0.0));
        assert_eq!(unit_box().intersect(&ray, 0.25), Some(0.25));
    }

    #[test]
    fn test_aabb_behind_t_min_misses() {
        let ray = Ray::new(Vec3::new(-1.0, 0.5, 0.5), Vec3::X);
        // Exit is at t = 2.
        assert_eq!(unit_box().intersect(&ray, 3.0), None);
    }

    #[test]
    fn test_empty_aabb_never_hit() {
        let rays = [
            Ray::new(Vec3::ZERO, Vec3::X),
            Ray::new(Vec3::ZERO, Vec3::new(1.0, 1.0, 1.0)),
            Ray::new(Vec3::splat(-3.0), Vec3::new(0.0, 0.0, -1.0)),
        ];
        for ray in rays {
            assert_eq!(Aabb::EMPTY.intersect(&ray, 0.0), None);
        }
    }
}
