//! Result of a nearest-hit query.

/// Nearest intersection found along a ray.
///
/// [`Hit::MISS`] is the sentinel for "nothing hit": `t` is infinite and the
/// triangle index is invalid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub found: bool,
    /// Ray parameter of the hit, `>= 0`.
    pub t: f32,
    /// Index into the scene's triangle (face) array.
    pub triangle: u32,
}

impl Hit {
    pub const INVALID_TRIANGLE: u32 = u32::MAX;

    pub const MISS: Hit = Hit {
        found: false,
        t: f32::INFINITY,
        triangle: Hit::INVALID_TRIANGLE,
    };

    #[inline]
    pub fn new(t: f32, triangle: u32) -> Self {
        Self {
            found: true,
            t,
            triangle,
        }
    }

    /// `Some(self)` if something was hit.
    pub fn into_option(self) -> Option<Hit> {
        self.found.then_some(self)
    }
}
