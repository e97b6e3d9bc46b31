//! Myrtille Core - scene data for the path tracer.
//!
//! This crate provides:
//!
//! - **Scene arrays**: `Mesh` (positions, normals, uvs, faces) and the
//!   `Material` table
//! - **Camera**: a pinhole `Camera`
//! - **Scene**: validated, immutable bundle of the above with derived
//!   per-face triangles and the emissive-face list
//! - **Presets**: procedural scenes (Cornell box, light over a floor)
//!
//! # Example
//!
//! ```ignore
//! use myr_core::presets::cornell_box;
//!
//! let scene = cornell_box()?;
//! println!("{} faces, {} lights",
//!     scene.triangles().len(),
//!     scene.emissive_faces().len());
//! ```

pub mod camera;
pub mod material;
pub mod mesh;
pub mod presets;
pub mod scene;

// Re-export commonly used types
pub use camera::Camera;
pub use material::{Color, Material};
pub use mesh::{Face, Mesh};
pub use scene::{Scene, SceneError, SceneResult};
