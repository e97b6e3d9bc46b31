use crate::{Interval, Vec3};

/// A ray in 3D space.
///
/// Rays carry their reciprocal direction so slab tests against bounding
/// boxes multiply instead of divide. Components of `inv_direction` are
/// infinite where the matching direction component is exactly zero; slab
/// tests branch on the direction and never read those.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    pub inv_direction: Vec3,
    /// Valid parametric range.
    pub t: Interval,
}

impl Ray {
    /// Create a ray valid over `[0, +inf)`.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self::with_range(origin, direction, Interval::positive())
    }

    /// Create a ray valid over the given parametric range.
    pub fn with_range(origin: Vec3, direction: Vec3, t: Interval) -> Self {
        Self {
            origin,
            direction,
            inv_direction: direction.recip(),
            t,
        }
    }

    /// Get the point along the ray at parameter t.
    ///
    /// Returns: origin + t * direction
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}
