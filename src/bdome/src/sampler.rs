//! Weighted random sampling of arena prizes.
//!
//! Weights are converted to integer ticks (`weight * WEIGHT_SCALE`) so the
//! draw range is exact. A draw picks `sample` uniformly from `1..=total` and
//! walks the items in ascending-weight order, emitting the first whose
//! running sum reaches `sample`. Items with equal weight are shuffled before
//! the ascending sort so neither is favoured.
//!
//! Large sample counts are split into chunks and drawn on the rayon pool.
//! Each chunk prepares its own shuffled walk order once.

use indicatif::ProgressBar;
use rand::seq::SliceRandom;
use rand::Rng;
use rayon::prelude::*;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::weights::ItemWeight;

/// Ticks per unit of weight
pub const WEIGHT_SCALE: f64 = 1_000_000.0;

/// Draws per parallel task
const CHUNK_SIZE: u64 = 1 << 16;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SampleError {
    #[error("No weights to sample from")]
    Empty,

    #[error("Invalid weight {weight} for \"{name}\"")]
    InvalidWeight { name: String, weight: f64 },

    #[error("Walk ended without reaching sample {sample} of {total}")]
    Exhausted { sample: u64, total: u64 },
}

/// Walk order and running sums for one shuffle
struct Prepared {
    order: Vec<usize>,
    cumulative: Vec<u64>,
    total: u64,
}

impl Prepared {
    fn draw_index<R: Rng>(&self, rng: &mut R) -> Result<usize, SampleError> {
        let sample = rng.gen_range(1..=self.total);
        let position = self.cumulative.partition_point(|&running| running < sample);
        self.order
            .get(position)
            .copied()
            .ok_or(SampleError::Exhausted {
                sample,
                total: self.total,
            })
    }
}

/// Samples item names in proportion to their weights
#[derive(Debug, Clone)]
pub struct WeightedSampler {
    names: Vec<String>,
    ticks: Vec<u64>,
}

impl WeightedSampler {
    pub fn new(weights: &[ItemWeight]) -> Result<Self, SampleError> {
        Self::from_pairs(weights.iter().map(|w| (w.name.as_str(), w.weight)))
    }

    /// Build from `(name, weight)` pairs. Weights need not sum to 1.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self, SampleError>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut names = Vec::new();
        let mut ticks = Vec::new();

        for (name, weight) in pairs {
            let name = name.into();
            if !weight.is_finite() || weight <= 0.0 {
                return Err(SampleError::InvalidWeight { name, weight });
            }
            // A positive weight never rounds away entirely
            ticks.push(((weight * WEIGHT_SCALE).round() as u64).max(1));
            names.push(name);
        }

        if names.is_empty() {
            return Err(SampleError::Empty);
        }

        Ok(Self { names, ticks })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Sum of all ticks, the upper end of the draw range
    pub fn total(&self) -> u64 {
        self.ticks.iter().sum()
    }

    fn prepare<R: Rng>(&self, rng: &mut R) -> Prepared {
        let mut order: Vec<usize> = (0..self.names.len()).collect();
        order.shuffle(rng);
        // sort_by_key is stable, so shuffled ties stay shuffled
        order.sort_by_key(|&i| self.ticks[i]);

        let mut running = 0u64;
        let cumulative = order
            .iter()
            .map(|&i| {
                running += self.ticks[i];
                running
            })
            .collect();

        Prepared {
            order,
            cumulative,
            total: running,
        }
    }

    /// One independent draw
    pub fn draw<R: Rng>(&self, rng: &mut R) -> Result<&str, SampleError> {
        let index = self.prepare(rng).draw_index(rng)?;
        Ok(&self.names[index])
    }

    /// `n` independent draws, in no particular order
    pub fn sample(&self, n: u64) -> Result<Vec<String>, SampleError> {
        let chunks: Vec<Vec<usize>> = chunk_lengths(n)
            .into_par_iter()
            .map(|len| {
                let mut rng = rand::thread_rng();
                let prepared = self.prepare(&mut rng);
                (0..len)
                    .map(|_| prepared.draw_index(&mut rng))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<_, _>>()?;

        Ok(chunks
            .into_iter()
            .flatten()
            .map(|i| self.names[i].clone())
            .collect())
    }

    /// `n` independent draws aggregated into `name -> count`.
    ///
    /// Counts always sum to `n`. Names never drawn are absent.
    pub fn sample_counts(
        &self,
        n: u64,
        progress: Option<&ProgressBar>,
    ) -> Result<BTreeMap<String, u64>, SampleError> {
        let counts = chunk_lengths(n)
            .into_par_iter()
            .map(|len| {
                let mut rng = rand::thread_rng();
                let prepared = self.prepare(&mut rng);
                let mut counts = vec![0u64; self.names.len()];
                for _ in 0..len {
                    counts[prepared.draw_index(&mut rng)?] += 1;
                }
                if let Some(pb) = progress {
                    pb.inc(len);
                }
                Ok::<_, SampleError>(counts)
            })
            .try_reduce(
                || vec![0u64; self.names.len()],
                |mut acc, counts| {
                    for (a, c) in acc.iter_mut().zip(counts) {
                        *a += c;
                    }
                    Ok(acc)
                },
            )?;

        Ok(self
            .names
            .iter()
            .zip(counts)
            .filter(|(_, count)| *count > 0)
            .map(|(name, count)| (name.clone(), count))
            .collect())
    }
}

/// Split `n` draws into task-sized pieces
fn chunk_lengths(n: u64) -> Vec<u64> {
    let mut lengths = Vec::with_capacity((n / CHUNK_SIZE + 1) as usize);
    let mut remaining = n;
    while remaining > 0 {
        let len = remaining.min(CHUNK_SIZE);
        lengths.push(len);
        remaining -= len;
    }
    lengths
}
