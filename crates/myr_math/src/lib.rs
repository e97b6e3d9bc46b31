// Re-export glam for convenience
pub use glam::*;

// Myrtille geometry primitives
mod aabb;
mod frame;
mod interval;
mod ray;
mod triangle;

pub use aabb::Aabb;
pub use frame::{reflect, Frame};
pub use interval::Interval;
pub use ray::Ray;
pub use triangle::{Triangle, DETERMINANT_EPSILON};
