//! Render driver.
//!
//! Builds the acceleration structure and sampler for a scene, then renders
//! image rows in parallel on a dedicated rayon pool. Each row is written by
//! exactly one task; the only shared mutable state is the progress counter.

use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;

use myr_core::{Color, Scene, SceneError};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bvh::Bvh;
use crate::integrator::{dimension_count, Integrator};
use crate::sampler::{SampleMethod, Sampler, SamplerError};

/// Errors that can occur while rendering.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("scene error: {0}")]
    Scene(#[from] SceneError),

    #[error("sampler error: {0}")]
    Sampler(#[from] SamplerError),

    #[error("invalid render config: {0}")]
    InvalidConfig(String),

    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Result type for rendering.
pub type RenderResult<T> = Result<T, RenderError>;

/// Render configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    pub samples_per_pixel: u32,
    /// Maximum number of path vertices
    pub max_bounces: u32,
    /// Per-sample radiance clamp
    pub max_sample_value: f32,
    /// Offset along the normal for rays leaving a surface
    pub scene_epsilon: f32,
    /// Display gamma; pixels are stored as `linear^(1/gamma)`
    pub gamma: f32,
    pub sample_method: SampleMethod,
    pub seed: u64,
    /// Worker threads; `None` uses every core
    pub threads: Option<usize>,
    /// First path depth at which Russian roulette may end a path
    pub russian_roulette_depth: u32,
    /// Log progress in 10% steps
    pub progress: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            samples_per_pixel: 64,
            max_bounces: 4,
            max_sample_value: 10.0,
            scene_epsilon: 1e-3,
            gamma: 2.2,
            sample_method: SampleMethod::Sobol,
            seed: 0x5eed,
            threads: None,
            russian_roulette_depth: 3,
            progress: true,
        }
    }
}

impl RenderConfig {
    /// Reject configurations the renderer cannot run.
    pub fn validate(&self) -> RenderResult<()> {
        let invalid = |msg: &str| Err(RenderError::InvalidConfig(msg.to_string()));

        if self.width == 0 || self.height == 0 {
            return invalid("image size must be non-zero");
        }
        if self.samples_per_pixel == 0 {
            return invalid("samples_per_pixel must be non-zero");
        }
        if self.max_bounces == 0 {
            return invalid("max_bounces must be non-zero");
        }
        if self.max_sample_value.is_nan() || self.max_sample_value <= 0.0 {
            return invalid("max_sample_value must be positive");
        }
        if !self.scene_epsilon.is_finite() || self.scene_epsilon < 0.0 {
            return invalid("scene_epsilon must be a finite non-negative number");
        }
        if !self.gamma.is_finite() || self.gamma <= 0.0 {
            return invalid("gamma must be positive");
        }
        if self.threads == Some(0) {
            return invalid("threads must be non-zero");
        }
        Ok(())
    }
}

/// Row-major RGB image, row 0 at the top.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Color>,
}

impl ImageBuffer {
    /// Create a new image buffer filled with black.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::ZERO; width as usize * height as usize],
        }
    }

    #[inline]
    fn index(&self, row: u32, col: u32) -> usize {
        row as usize * self.width as usize + col as usize
    }

    pub fn get(&self, row: u32, col: u32) -> Color {
        self.pixels[self.index(row, col)]
    }

    pub fn set(&mut self, row: u32, col: u32, color: Color) {
        let index = self.index(row, col);
        self.pixels[index] = color;
    }

    /// Clamp to `[0, 1]` and quantize to 8-bit RGB.
    pub fn to_rgb8(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.pixels.len() * 3);
        for color in &self.pixels {
            bytes.extend(color.to_array().map(to_byte));
        }
        bytes
    }

    /// Write to disk; the format follows the file extension.
    pub fn save(&self, path: impl AsRef<Path>) -> RenderResult<()> {
        let buffer = image::RgbImage::from_raw(self.width, self.height, self.to_rgb8())
            .ok_or_else(|| RenderError::InvalidConfig("pixel count does not match image size".to_string()))?;
        buffer.save(path)?;
        Ok(())
    }
}

#[inline]
fn to_byte(x: f32) -> u8 {
    (255.0 * x.clamp(0.0, 1.0)).round() as u8
}

/// Owns everything a render reads: the BVH, the sampler tables and the
/// worker pool they were built on.
pub struct Renderer<'a> {
    scene: &'a Scene,
    config: RenderConfig,
    pool: rayon::ThreadPool,
    bvh: Bvh<'a>,
    sampler: Sampler,
}

impl<'a> Renderer<'a> {
    /// Validate `config`, start the worker pool and build the BVH and
    /// sampler for `scene` on it.
    pub fn new(scene: &'a Scene, config: RenderConfig) -> RenderResult<Self> {
        config.validate()?;

        let mut builder = rayon::ThreadPoolBuilder::new();
        if let Some(threads) = config.threads {
            builder = builder.num_threads(threads);
        }
        let pool = builder.build()?;

        let (bvh, sampler) = pool.install(|| {
            let bvh = Bvh::new(scene.triangles());
            let sampler = Sampler::new(
                config.samples_per_pixel as usize,
                dimension_count(config.max_bounces),
                config.width as usize,
                config.height as usize,
                config.sample_method,
                config.seed,
            );
            (bvh, sampler)
        });

        Ok(Self {
            scene,
            config,
            pool,
            bvh,
            sampler: sampler?,
        })
    }

    fn integrator(&self) -> Integrator<'_> {
        Integrator::new(self.scene, &self.bvh, &self.sampler, &self.config)
    }

    /// Mean linear radiance of one pixel, before gamma.
    pub fn render_pixel(&self, row: u32, col: u32) -> Color {
        self.integrator().pixel(row, col)
    }

    /// Render the full image, gamma-corrected.
    pub fn render(&self) -> RenderResult<ImageBuffer> {
        let (width, height) = (self.config.width, self.config.height);
        let inv_gamma = 1.0 / self.config.gamma;
        let integrator = self.integrator();
        let progress = Progress::new(height, self.config.progress);
        let mut image = ImageBuffer::new(width, height);

        log::info!(
            "Rendering {}x{} at {} spp, {} bounces on {} threads",
            width,
            height,
            self.config.samples_per_pixel,
            self.config.max_bounces,
            self.pool.current_num_threads()
        );
        let start = Instant::now();

        self.pool.install(|| {
            image
                .pixels
                .par_chunks_mut(width as usize)
                .enumerate()
                .for_each(|(row, pixels)| {
                    for (col, pixel) in pixels.iter_mut().enumerate() {
                        let linear = integrator.pixel(row as u32, col as u32);
                        *pixel = linear.max(Color::ZERO).powf(inv_gamma);
                    }
                    progress.row_done();
                });
        });

        let elapsed = start.elapsed();
        let samples = u64::from(width) * u64::from(height) * u64::from(self.config.samples_per_pixel);
        log::info!(
            "Render finished in {:.2?} ({:.0} samples/s)",
            elapsed,
            samples as f64 / elapsed.as_secs_f64().max(1e-9)
        );

        Ok(image)
    }
}

/// Render `scene` with `config`: build, trace, gamma-correct.
pub fn render(scene: &Scene, config: &RenderConfig) -> RenderResult<ImageBuffer> {
    Renderer::new(scene, config.clone())?.render()
}

/// Completed-row counter that logs every 10%.
struct Progress {
    total: u32,
    enabled: bool,
    state: Mutex<(u32, u32)>,
}

impl Progress {
    fn new(total: u32, enabled: bool) -> Self {
        Self {
            total,
            enabled,
            state: Mutex::new((0, 0)),
        }
    }

    fn row_done(&self) {
        if !self.enabled {
            return;
        }
        // A poisoned lock only means another row panicked; skip reporting.
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        let (done, reported) = &mut *state;
        *done += 1;
        let tenths = *done * 10 / self.total;
        if tenths > *reported {
            *reported = tenths;
            log::info!("{}% done", tenths * 10);
        }
    }
}
