//! Myrtille Renderer - CPU Path Tracing
//!
//! A Monte Carlo path tracer over triangle meshes:
//!
//! - `bvh`: SAH bounding volume hierarchy with nearest-hit and any-hit queries
//! - `sampler`: Cranley-Patterson rotated random or Sobol sample tables
//! - `bsdf`: diffuse and glossy reflectance lobes
//! - `integrator`: path tracing with next-event estimation and Russian roulette
//! - `renderer`: configuration, parallel row rendering and the output image

pub mod bsdf;
pub mod bvh;
mod hit;
pub mod integrator;
pub mod renderer;
pub mod sampler;
mod sobol;

pub use bsdf::{Bsdf, Lobe};
pub use bvh::{Bvh, BvhNode, LEAF_MAX_SIZE};
pub use hit::Hit;
pub use integrator::{dimension_count, Integrator};
pub use renderer::{render, ImageBuffer, RenderConfig, RenderError, RenderResult, Renderer};
pub use sampler::{SampleMethod, Sampler, SamplerError};

/// Re-export Vec3 and common math types from myr_math
pub use myr_math::{Aabb, Interval, Ray, Vec3};
