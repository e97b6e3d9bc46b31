//! Surface materials.

use myr_math::Vec3;
use serde::{Deserialize, Serialize};

/// Color type alias (linear RGB, typically 0-1)
pub type Color = Vec3;

/// A metallic/roughness material with an optional emission.
///
/// `metallic` doubles as the probability of scattering through the glossy
/// lobe; the rest of the time the surface scatters diffusely.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    /// Diffuse/albedo color (RGB, 0-1)
    pub base_color: Color,

    /// Metallic factor (0=dielectric, 1=metal)
    pub metallic: f32,

    /// Roughness factor (0=mirror, 1=rough)
    pub roughness: f32,

    /// Emitted radiance (RGB, unbounded)
    pub emission: Color,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            base_color: Color::splat(0.5), // Grey default
            metallic: 0.0,
            roughness: 0.5,
            emission: Color::ZERO,
        }
    }
}

impl Material {
    /// Create a simple diffuse material.
    pub fn diffuse(color: Color) -> Self {
        Self {
            base_color: color,
            metallic: 0.0,
            roughness: 1.0,
            ..Default::default()
        }
    }

    /// Create a metallic material.
    pub fn metal(color: Color, roughness: f32) -> Self {
        Self {
            base_color: color,
            metallic: 1.0,
            roughness: roughness.clamp(0.0, 1.0),
            ..Default::default()
        }
    }

    /// Create a black-bodied emitter.
    pub fn light(emission: Color) -> Self {
        Self {
            base_color: Color::ZERO,
            emission,
            ..Default::default()
        }
    }

    /// Builder method to set metallic.
    pub fn with_metallic(mut self, metallic: f32) -> Self {
        self.metallic = metallic.clamp(0.0, 1.0);
        self
    }

    /// Check if this material is emissive.
    pub fn is_emissive(&self) -> bool {
        self.emission.max_element() > 0.0
    }
}
