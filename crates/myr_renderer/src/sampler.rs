//! Per-pixel sample source.
//!
//! A [`Sampler`] holds one shared table of `spp × dimensions` values and one
//! random offset per (pixel, dimension). Reads combine the two with a
//! Cranley-Patterson rotation, so every pixel sees a decorrelated copy of the
//! same point set. Both tables are built up front; reading never mutates.

use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sobol;

/// Leading dimensions that are always uniform random (pixel jitter).
const JITTER_DIMENSIONS: usize = 2;

/// Errors from building a sampler.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SamplerError {
    #[error("sampler needs {requested} low-discrepancy dimensions, only {available} are available")]
    TooManyDimensions { requested: usize, available: usize },
}

/// How the shared sample table is filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SampleMethod {
    /// Independent uniform draws.
    Random,
    /// Sobol sequence for every dimension past the pixel jitter.
    #[default]
    Sobol,
}

/// Read-only table of sample values in `[0, 1)`.
#[derive(Debug, Clone)]
pub struct Sampler {
    spp: usize,
    dimensions: usize,
    width: usize,
    samples: Vec<f32>,
    offsets: Vec<f32>,
}

impl Sampler {
    /// Build the sample and offset tables.
    ///
    /// The result depends only on the arguments: offsets for row `r` come
    /// from a generator seeded by `(seed, r)`, so the thread count has no
    /// effect.
    pub fn new(
        spp: usize,
        dimensions: usize,
        width: usize,
        height: usize,
        method: SampleMethod,
        seed: u64,
    ) -> Result<Self, SamplerError> {
        let start = Instant::now();
        let mut rng = StdRng::seed_from_u64(seed);

        let samples = match method {
            SampleMethod::Random => (0..spp * dimensions).map(|_| rng.gen::<f32>()).collect(),
            SampleMethod::Sobol => sobol_table(spp, dimensions, &mut rng)?,
        };

        let mut offsets = vec![0.0f32; width * height * dimensions];
        if width > 0 && dimensions > 0 {
            offsets
                .par_chunks_mut(width * dimensions)
                .enumerate()
                .for_each(|(row, chunk)| {
                    let mut rng = StdRng::seed_from_u64(row_seed(seed, row));
                    chunk.iter_mut().for_each(|o| *o = rng.gen());
                });
        }

        log::info!(
            "Sampler: {:?}, {} spp x {} dimensions, {}x{} offsets in {:?}",
            method,
            spp,
            dimensions,
            width,
            height,
            start.elapsed()
        );

        Ok(Self {
            spp,
            dimensions,
            width,
            samples,
            offsets,
        })
    }

    /// Value for `sample` of pixel `(row, col)` in dimension `dim`.
    #[inline]
    pub fn get(&self, sample: usize, row: usize, col: usize, dim: usize) -> f32 {
        debug_assert!(sample < self.spp && dim < self.dimensions);
        let base = self.samples[sample * self.dimensions + dim];
        let offset = self.offsets[(row * self.width + col) * self.dimensions + dim];
        wrap(base + offset)
    }
}

/// Reduce a sum of two `[0, 1)` values back into `[0, 1)`.
#[inline]
fn wrap(x: f32) -> f32 {
    // f32 rounding can land a sum exactly on 1.0.
    if x >= 1.0 {
        x - 1.0
    } else {
        x
    }
}

fn row_seed(seed: u64, row: usize) -> u64 {
    seed ^ (row as u64 + 1).wrapping_mul(0x9e37_79b9_7f4a_7c15)
}

fn sobol_table(spp: usize, dimensions: usize, rng: &mut StdRng) -> Result<Vec<f32>, SamplerError> {
    let sobol_dims = dimensions.saturating_sub(JITTER_DIMENSIONS);
    if sobol_dims > sobol::MAX_DIMENSIONS {
        return Err(SamplerError::TooManyDimensions {
            requested: sobol_dims,
            available: sobol::MAX_DIMENSIONS,
        });
    }

    let columns: Vec<Vec<f32>> = (0..sobol_dims)
        .into_par_iter()
        .map(|d| sobol::sobol_dimension(d, spp))
        .collect();

    let mut table = Vec::with_capacity(spp * dimensions);
    for i in 0..spp {
        for dim in 0..dimensions {
            let value = if dim < JITTER_DIMENSIONS {
                rng.gen()
            } else {
                columns[dim - JITTER_DIMENSIONS][i]
            };
            table.push(value);
        }
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_in_unit_interval() {
        for method in [SampleMethod::Random, SampleMethod::Sobol] {
            let sampler = Sampler::new(16, 22, 8, 6, method, 1).unwrap();
            for s in 0..16 {
                for row in 0..6 {
                    for col in 0..8 {
                        for dim in 0..22 {
                            let v = sampler.get(s, row, col, dim);
                            assert!((0.0..1.0).contains(&v), "{method:?} gave {v}");
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_reads_are_repeatable() {
        let sampler = Sampler::new(8, 12, 4, 4, SampleMethod::Sobol, 7).unwrap();
        let first = sampler.get(3, 2, 1, 5);
        for _ in 0..10 {
            assert_eq!(sampler.get(3, 2, 1, 5), first);
        }
    }

    #[test]
    fn test_same_seed_same_tables() {
        let a = Sampler::new(8, 12, 5, 3, SampleMethod::Sobol, 42).unwrap();
        let b = Sampler::new(8, 12, 5, 3, SampleMethod::Sobol, 42).unwrap();
        assert_eq!(a.samples, b.samples);
        assert_eq!(a.offsets, b.offsets);

        let c = Sampler::new(8, 12, 5, 3, SampleMethod::Sobol, 43).unwrap();
        assert_ne!(a.offsets, c.offsets);
    }

    #[test]
    fn test_pixels_are_decorrelated() {
        let sampler = Sampler::new(4, 6, 4, 4, SampleMethod::Sobol, 3).unwrap();
        assert_ne!(sampler.get(1, 0, 0, 3), sampler.get(1, 0, 1, 3));
        assert_ne!(sampler.get(1, 0, 0, 3), sampler.get(1, 1, 0, 3));
    }

    #[test]
    fn test_sobol_dimensions_follow_sequence() {
        let sampler = Sampler::new(8, 4, 1, 1, SampleMethod::Sobol, 9).unwrap();
        let van_der_corput = sobol::sobol_dimension(0, 8);
        for (i, &expected) in van_der_corput.iter().enumerate() {
            assert_eq!(sampler.samples[i * 4 + 2], expected);
        }
    }

    #[test]
    fn test_too_many_dimensions() {
        let dims = sobol::MAX_DIMENSIONS + JITTER_DIMENSIONS + 1;
        assert_eq!(
            Sampler::new(4, dims, 2, 2, SampleMethod::Sobol, 0).unwrap_err(),
            SamplerError::TooManyDimensions {
                requested: sobol::MAX_DIMENSIONS + 1,
                available: sobol::MAX_DIMENSIONS,
            }
        );
        // Random tables have no dimension limit.
        assert!(Sampler::new(4, dims, 2, 2, SampleMethod::Random, 0).is_ok());
    }

    #[test]
    fn test_wrap() {
        assert_eq!(wrap(0.25), 0.25);
        assert_eq!(wrap(1.0), 0.0);
        assert!((wrap(1.5) - 0.5).abs() < 1e-7);
    }
}
