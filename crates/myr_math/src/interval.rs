/// A closed range of ray parameters `[min, max]`.
///
/// Rays carry one of these as their valid parametric range; traversal
/// shrinks `max` as closer hits are found.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub min: f32,
    pub max: f32,
}

impl Interval {
    /// Create a new interval given min and max values.
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// `[0, +inf)`, the default range of a freshly cast ray.
    pub const fn positive() -> Self {
        Self::new(0.0, f32::INFINITY)
    }

    /// Returns true if x is within the interval [min, max] (inclusive).
    pub fn contains(&self, x: f32) -> bool {
        self.min <= x && x <= self.max
    }
}
