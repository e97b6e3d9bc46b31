//! Reflectance lobes.
//!
//! A surface scatters through one of a small set of [`Lobe`]s. The lobe is
//! picked stochastically from the material's mixture weight, and each lobe
//! maps two uniform numbers to an outgoing world-space direction.

use std::f32::consts::PI;

use myr_core::Material;
use myr_math::{reflect, Frame, Vec3};

/// One scattering lobe with its sampling parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lobe {
    /// Lambertian reflection, sampled with a cosine-weighted hemisphere.
    Diffuse,
    /// Rough mirror reflection.
    Glossy { roughness: f32 },
}

impl Lobe {
    /// Whether next-event estimation accounts for this lobe.
    ///
    /// Paths leaving through a lobe that is not light-sampled must pick up
    /// emission when they hit a light.
    pub fn uses_light_sampling(&self) -> bool {
        matches!(self, Lobe::Diffuse)
    }

    /// Outgoing direction for an incoming `direction` at a surface with
    /// local `frame`, from two uniform numbers in `[0, 1)`.
    pub fn sample(&self, direction: Vec3, frame: &Frame, r1: f32, r2: f32) -> Vec3 {
        match *self {
            Lobe::Diffuse => {
                let phi = 2.0 * PI * r1;
                let radius = r2.sqrt();
                let local = Vec3::new(radius * phi.cos(), radius * phi.sin(), (1.0 - r2).max(0.0).sqrt());
                frame.to_world(local).normalize()
            }
            Lobe::Glossy { roughness } => {
                let alpha = roughness * roughness;
                let tan_theta = alpha * r1.sqrt() / (1.0 - r1).max(f32::EPSILON).sqrt();
                let theta = tan_theta.atan();
                let phi = 2.0 * PI * r2;
                let half = frame.to_world(Vec3::new(
                    theta.sin() * phi.cos(),
                    theta.sin() * phi.sin(),
                    theta.cos(),
                ));

                let mut out = reflect(direction, half);
                if out.dot(frame.normal) < 0.0 {
                    // Flip back above the surface.
                    out = reflect(out, frame.normal);
                }
                out.normalize()
            }
        }
    }
}

/// Scattering at one shading point.
#[derive(Debug, Clone, Copy)]
pub struct Bsdf {
    direction: Vec3,
    frame: Frame,
    metallic: f32,
    roughness: f32,
}

impl Bsdf {
    /// `direction` is the incoming ray direction (pointing at the surface),
    /// `normal` the unit shading normal on the side the ray arrived from.
    pub fn new(direction: Vec3, normal: Vec3, material: &Material) -> Self {
        Self {
            direction,
            frame: Frame::from_normal(normal),
            metallic: material.metallic,
            roughness: material.roughness,
        }
    }

    /// Pick a lobe with probability equal to its mixture weight.
    ///
    /// Returns the lobe and `u` rescaled to `[0, 1)` within the chosen
    /// sub-interval, so the same draw can still drive the direction sample.
    pub fn choose_lobe(&self, u: f32) -> (Lobe, f32) {
        if u < self.metallic {
            let rescaled = u / self.metallic;
            (
                Lobe::Glossy {
                    roughness: self.roughness,
                },
                rescaled.min(ONE_MINUS_EPSILON),
            )
        } else {
            let rescaled = (u - self.metallic) / (1.0 - self.metallic);
            (Lobe::Diffuse, rescaled.clamp(0.0, ONE_MINUS_EPSILON))
        }
    }

    /// Choose a lobe from `u` and sample a direction from it, reusing the
    /// rescaled `u` alongside `v`.
    pub fn sample(&self, u: f32, v: f32) -> (Lobe, Vec3) {
        let (lobe, u) = self.choose_lobe(u);
        (lobe, lobe.sample(self.direction, &self.frame, u, v))
    }
}

/// Largest `f32` below 1.
const ONE_MINUS_EPSILON: f32 = 1.0 - f32::EPSILON / 2.0;
