//! On-disk stores for synthetic samples and the drop rates derived from them.
//!
//! Both files are written once per arena and sample count, then loaded
//! verbatim on every later run so statistics stay reproducible.

use indicatif::ProgressBar;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::analysis::ItemDropRate;
use crate::arena::{Arena, DropMetadata, UnknownArena};
use crate::constants::{drop_rates_file_name, generated_drops_file_name};
use crate::drops::{DropsError, NormalisedDrops};
use crate::sampler::{SampleError, WeightedSampler};
use crate::weights::WeightTable;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}:{line}: malformed line \"{text}\"")]
    Malformed {
        path: PathBuf,
        line: usize,
        text: String,
    },

    #[error("{path}:{line}: {source}")]
    Arena {
        path: PathBuf,
        line: usize,
        #[source]
        source: UnknownArena,
    },

    #[error("No item weights for {0}")]
    NoWeights(Arena),

    #[error("Sampling failed: {0}")]
    Sample(#[from] SampleError),

    #[error(transparent)]
    Drops(#[from] DropsError),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Split an `arena|name|value` row
fn split_row<'a>(
    path: &Path,
    line_no: usize,
    line: &'a str,
) -> Result<(Arena, &'a str, &'a str), StoreError> {
    let malformed = || StoreError::Malformed {
        path: path.to_path_buf(),
        line: line_no,
        text: line.to_string(),
    };

    let mut fields = line.splitn(3, '|');
    let (Some(arena), Some(name), Some(value)) = (fields.next(), fields.next(), fields.next())
    else {
        return Err(malformed());
    };
    let arena = arena.parse::<Arena>().map_err(|source| StoreError::Arena {
        path: path.to_path_buf(),
        line: line_no,
        source,
    })?;
    Ok((arena, name, value.trim()))
}

/// Parse a generated-drops file, keeping rows for `arena`
pub fn parse_generated(
    content: &str,
    arena: Arena,
    path: &Path,
) -> Result<NormalisedDrops, StoreError> {
    let mut counts = Vec::new();
    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let (row_arena, name, value) = split_row(path, index + 1, line)?;
        let quantity: u64 = value.parse().map_err(|_| StoreError::Malformed {
            path: path.to_path_buf(),
            line: index + 1,
            text: line.to_string(),
        })?;
        if row_arena == arena {
            counts.push((name.to_string(), quantity));
        }
    }
    Ok(NormalisedDrops::from_counts(DropMetadata::generated(arena), counts)?)
}

/// `arena|name|quantity` per item, in name order
pub fn serialise_generated(drops: &NormalisedDrops) -> String {
    drops
        .items()
        .map(|item| format!("{}|{}|{}\n", item.metadata.arena, item.name, item.quantity))
        .collect()
}

/// Aggregated synthetic samples, one file per arena
#[derive(Debug, Clone)]
pub struct GeneratedDropsStore {
    dir: PathBuf,
    sample_count: u64,
}

impl GeneratedDropsStore {
    pub fn new<P: Into<PathBuf>>(dir: P, sample_count: u64) -> Self {
        Self {
            dir: dir.into(),
            sample_count,
        }
    }

    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    pub fn path(&self, arena: Arena) -> PathBuf {
        self.dir
            .join(generated_drops_file_name(arena, self.sample_count))
    }

    /// Previously generated drops, if the file exists
    pub fn load(&self, arena: Arena) -> Result<Option<NormalisedDrops>, StoreError> {
        let path = self.path(arena);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path).map_err(io_error(&path))?;
        parse_generated(&content, arena, &path).map(Some)
    }

    pub fn save(&self, drops: &NormalisedDrops) -> Result<(), StoreError> {
        let path = self.path(drops.arena());
        std::fs::create_dir_all(&self.dir).map_err(io_error(&self.dir))?;
        std::fs::write(&path, serialise_generated(drops)).map_err(io_error(&path))?;
        Ok(())
    }

    /// Draw a fresh sample for `arena` without touching the file
    pub fn generate(
        &self,
        arena: Arena,
        weights: &WeightTable,
        progress: Option<&ProgressBar>,
    ) -> Result<NormalisedDrops, StoreError> {
        let arena_weights = weights
            .for_arena(arena)
            .filter(|w| !w.is_empty())
            .ok_or(StoreError::NoWeights(arena))?;
        let sampler = WeightedSampler::new(arena_weights)?;

        info!("Generating {} drops for {}", self.sample_count, arena);
        let counts = sampler.sample_counts(self.sample_count, progress)?;
        Ok(NormalisedDrops::from_counts(
            DropMetadata::generated(arena),
            counts,
        )?)
    }

    /// Load the stored sample for `arena`, generating and saving it first if needed
    pub fn get_or_generate(
        &self,
        arena: Arena,
        weights: &WeightTable,
        progress: Option<&ProgressBar>,
    ) -> Result<NormalisedDrops, StoreError> {
        if let Some(drops) = self.load(arena)? {
            return Ok(drops);
        }

        let drops = self.generate(arena, weights, progress)?;
        self.save(&drops)?;
        info!("Saved generated drops to {}", self.path(arena).display());
        Ok(drops)
    }
}

/// Predicted drop rates, one file per arena
#[derive(Debug, Clone)]
pub struct DropRateStore {
    dir: PathBuf,
    sample_count: u64,
}

impl DropRateStore {
    pub fn new<P: Into<PathBuf>>(dir: P, sample_count: u64) -> Self {
        Self {
            dir: dir.into(),
            sample_count,
        }
    }

    pub fn path(&self, arena: Arena) -> PathBuf {
        self.dir.join(drop_rates_file_name(arena, self.sample_count))
    }

    pub fn load(&self, arena: Arena) -> Result<Option<BTreeMap<String, ItemDropRate>>, StoreError> {
        let path = self.path(arena);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path).map_err(io_error(&path))?;
        let mut rates = BTreeMap::new();
        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let (row_arena, name, value) = split_row(&path, index + 1, line)?;
            let rate: f64 = value.parse().map_err(|_| StoreError::Malformed {
                path: path.clone(),
                line: index + 1,
                text: line.to_string(),
            })?;
            if row_arena != arena {
                continue;
            }
            rates.insert(
                name.to_string(),
                ItemDropRate {
                    metadata: DropMetadata::generated(arena),
                    name: name.to_string(),
                    rate,
                },
            );
        }
        Ok(Some(rates))
    }

    pub fn save(
        &self,
        arena: Arena,
        rates: &BTreeMap<String, ItemDropRate>,
    ) -> Result<(), StoreError> {
        let path = self.path(arena);
        std::fs::create_dir_all(&self.dir).map_err(io_error(&self.dir))?;
        let content: String = rates
            .values()
            .map(|r| format!("{}|{}|{}\n", arena, r.name, r.rate))
            .collect();
        std::fs::write(&path, content).map_err(io_error(&path))?;
        Ok(())
    }
}
