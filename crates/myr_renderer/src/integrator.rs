//! Path integrator.
//!
//! Estimates radiance along camera paths with next-event estimation at every
//! diffuse vertex, a sampled indirect bounce, and Russian roulette past a
//! configurable depth. Every random number comes from the [`Sampler`] at a
//! fixed dimension, so a pixel's estimate is a pure function of the sampler
//! tables.

use std::f32::consts::PI;

use myr_core::{Color, Scene};
use myr_math::{Ray, Vec3};

use crate::bsdf::Bsdf;
use crate::bvh::Bvh;
use crate::renderer::RenderConfig;
use crate::sampler::Sampler;

/// Leading sampler dimensions used for the sub-pixel offset.
const JITTER_DIMS: usize = 2;
/// Dimensions drawn per bounce: light u/v, bounce u/v.
const BOUNCE_DIMS: usize = 4;

/// Minimum probability of a path surviving Russian roulette.
const MIN_SURVIVAL: f32 = 0.05;

/// Number of sampler dimensions a path of at most `max_bounces` vertices reads.
pub fn dimension_count(max_bounces: u32) -> usize {
    JITTER_DIMS + (BOUNCE_DIMS + 1) * max_bounces as usize
}

/// Identifies one sample of one pixel.
#[derive(Debug, Clone, Copy)]
struct PathSample {
    index: usize,
    row: usize,
    col: usize,
}

/// Traces camera paths through a scene. Shares everything read-only.
pub struct Integrator<'a> {
    scene: &'a Scene,
    bvh: &'a Bvh<'a>,
    sampler: &'a Sampler,
    config: &'a RenderConfig,
}

impl<'a> Integrator<'a> {
    pub fn new(scene: &'a Scene, bvh: &'a Bvh<'a>, sampler: &'a Sampler, config: &'a RenderConfig) -> Self {
        Self {
            scene,
            bvh,
            sampler,
            config,
        }
    }

    /// Mean linear radiance over all samples of pixel `(row, col)`.
    pub fn pixel(&self, row: u32, col: u32) -> Color {
        let spp = self.config.samples_per_pixel as usize;
        let mut sum = Color::ZERO;

        for index in 0..spp {
            let sample = PathSample {
                index,
                row: row as usize,
                col: col as usize,
            };
            let dx = self.draw(sample, 0);
            let dy = self.draw(sample, 1);
            let ray = self.scene.camera().generate_ray(
                row,
                col,
                dx,
                dy,
                self.config.width,
                self.config.height,
            );
            sum += self.trace(&ray, 0, true, sample);
        }

        sum / spp as f32
    }

    #[inline]
    fn draw(&self, sample: PathSample, dim: usize) -> f32 {
        self.sampler.get(sample.index, sample.row, sample.col, dim)
    }

    /// Radiance arriving along `ray` from a path vertex at `depth`.
    ///
    /// `count_emission` is set when the previous vertex did not light-sample
    /// (the camera, or a glossy bounce), so emitters hit here are not already
    /// accounted for.
    fn trace(&self, ray: &Ray, depth: u32, count_emission: bool, sample: PathSample) -> Color {
        if depth >= self.config.max_bounces {
            return Color::ZERO;
        }

        let mut t_max = f32::INFINITY;
        let Some(hit) = self.bvh.intersect(ray, &mut t_max).into_option() else {
            return Color::ZERO;
        };

        let material = self.scene.face_material(hit.triangle);
        let mut radiance = Color::ZERO;
        if count_emission {
            radiance += material.emission;
        }

        let p = ray.at(hit.t);
        let mut n = self.scene.shading_normal(hit.triangle, p);
        if n.dot(ray.direction) > 0.0 {
            n = -n;
        }
        let origin = p + n * self.config.scene_epsilon;

        let bounce_dim = JITTER_DIMS + BOUNCE_DIMS * depth as usize;
        let diffuse_weight = 1.0 - material.metallic;
        if diffuse_weight > 0.0 {
            radiance += diffuse_weight
                * material.base_color
                / PI
                * self.sample_light(origin, n, sample, bounce_dim);
        }

        // Russian roulette.
        let mut throughput = material.base_color;
        if depth >= self.config.russian_roulette_depth {
            let survival = material.base_color.max_element().clamp(MIN_SURVIVAL, 1.0);
            let roulette_dim = JITTER_DIMS + BOUNCE_DIMS * self.config.max_bounces as usize + depth as usize;
            if self.draw(sample, roulette_dim) >= survival {
                return radiance.min(Color::splat(self.config.max_sample_value));
            }
            throughput /= survival;
        }

        let bsdf = Bsdf::new(ray.direction, n, material);
        let (lobe, direction) = bsdf.sample(self.draw(sample, bounce_dim + 2), self.draw(sample, bounce_dim + 3));
        let next = Ray::new(origin, direction);
        radiance += throughput * self.trace(&next, depth + 1, !lobe.uses_light_sampling(), sample);

        radiance.min(Color::splat(self.config.max_sample_value))
    }

    /// Incident radiance from one sampled point on one emissive face, times
    /// the cosine at the receiver, divided by the sampling density.
    ///
    /// `origin` is the already-offset shading point and `n` its normal on the
    /// side facing the incoming path.
    fn sample_light(&self, origin: Vec3, n: Vec3, sample: PathSample, dim: usize) -> Color {
        let lights = self.scene.emissive_faces();
        let count = lights.len();
        if count == 0 {
            return Color::ZERO;
        }

        // One draw picks the face; what is left of it places the point.
        let scaled = self.draw(sample, dim) * count as f32;
        let pick = (scaled as usize).min(count - 1);
        let u = (scaled - pick as f32).clamp(0.0, 1.0);
        let v = self.draw(sample, dim + 1);

        let face = lights[pick];
        let light = self.scene.triangle(face);
        let point = light.sample_point(u, v);
        let light_normal = self.scene.shading_normal(face, point);
        let target = point + light_normal * self.config.scene_epsilon;

        let to_light = target - origin;
        let distance_sq = to_light.length_squared();
        if distance_sq <= 0.0 {
            return Color::ZERO;
        }
        let distance = distance_sq.sqrt();
        let direction = to_light / distance;

        let cos_surface = direction.dot(n);
        let cos_light = -direction.dot(light_normal);
        if cos_surface <= 0.0 || cos_light <= 0.0 {
            return Color::ZERO;
        }

        if self.bvh.occluded(&Ray::new(origin, direction), distance) {
            return Color::ZERO;
        }

        let emission = self.scene.face_material(face).emission;
        // pdf_A = 1 / (count * area)
        emission * (cos_surface * cos_light / distance_sq) * (count as f32 * light.area)
    }
}
