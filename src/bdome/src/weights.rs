//! Published per-arena item weights.
//!
//! The weights file is a sequence of sections. Each section starts with an
//! arena name on its own line, followed by `Item Name - 1.25%` lines:
//!
//! ```text
//! Frost Arena
//! Diamond Snowball - 2%
//! Weak Bottled Earth Faerie - 1.5%
//!
//! Ugga Dome
//! ...
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

use crate::arena::{Arena, UnknownArena};

#[derive(Error, Debug)]
pub enum WeightsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Line {line}: item \"{item}\" appears before any arena header")]
    ItemBeforeArena { line: usize, item: String },

    #[error("Line {line}: expected \"name - percentage%\", got \"{text}\"")]
    MalformedLine { line: usize, text: String },

    #[error("Line {line}: invalid weight \"{value}\" for \"{item}\"")]
    InvalidWeight {
        line: usize,
        item: String,
        value: String,
    },

    #[error("Line {line}: {source}")]
    Arena {
        line: usize,
        #[source]
        source: UnknownArena,
    },
}

/// Probability weight of one item in one arena
#[derive(Debug, Clone, PartialEq)]
pub struct ItemWeight {
    pub arena: Arena,
    pub name: String,
    pub weight: f64,
}

/// All weights, grouped by arena in file order
#[derive(Debug, Clone, Default)]
pub struct WeightTable {
    by_arena: BTreeMap<Arena, Vec<ItemWeight>>,
}

impl WeightTable {
    /// Load a weights file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, WeightsError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, WeightsError> {
        let mut by_arena: BTreeMap<Arena, Vec<ItemWeight>> = BTreeMap::new();
        let mut current: Option<Arena> = None;

        for (index, raw) in content.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            if !line.contains('-') {
                let arena = line.parse::<Arena>().map_err(|source| WeightsError::Arena {
                    line: line_no,
                    source,
                })?;
                by_arena.entry(arena).or_default();
                current = Some(arena);
                continue;
            }

            let (name, pct) = line
                .rsplit_once(" - ")
                .ok_or_else(|| WeightsError::MalformedLine {
                    line: line_no,
                    text: line.to_string(),
                })?;
            let name = name.trim();

            let arena = current.ok_or_else(|| WeightsError::ItemBeforeArena {
                line: line_no,
                item: name.to_string(),
            })?;

            let weight = parse_percentage(pct).ok_or_else(|| WeightsError::InvalidWeight {
                line: line_no,
                item: name.to_string(),
                value: pct.trim().to_string(),
            })?;

            by_arena.entry(arena).or_default().push(ItemWeight {
                arena,
                name: name.to_string(),
                weight,
            });
        }

        Ok(Self { by_arena })
    }

    /// Weights for one arena, if the file had a section for it
    pub fn for_arena(&self, arena: Arena) -> Option<&[ItemWeight]> {
        self.by_arena.get(&arena).map(Vec::as_slice)
    }

    pub fn weight(&self, arena: Arena, name: &str) -> Option<f64> {
        self.for_arena(arena)?
            .iter()
            .find(|w| w.name == name)
            .map(|w| w.weight)
    }

    pub fn arenas(&self) -> impl Iterator<Item = Arena> + '_ {
        self.by_arena.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.by_arena.values().all(Vec::is_empty)
    }
}

/// `"1.5%"` -> `0.015`. Weights must lie in (0, 1].
fn parse_percentage(text: &str) -> Option<f64> {
    let value: f64 = text.trim().trim_end_matches('%').trim().parse().ok()?;
    let weight = value / 100.0;
    (weight.is_finite() && weight > 0.0 && weight <= 1.0).then_some(weight)
}
