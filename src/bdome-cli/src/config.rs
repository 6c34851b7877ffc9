//! Configuration management for bdome CLI

use anyhow::{Context, Result};
use bdome::constants::{ARENAS, NUMBER_OF_ITEMS_TO_GENERATE};
use bdome::{Arena, PriceSourceKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::GlobalArgs;

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_DROPS_DIR: &str = "battledome_drop_data";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: Option<PathBuf>,
    pub drops_dir: Option<PathBuf>,
    pub price_source: Option<PriceSourceKind>,
    pub sample_count: Option<u64>,
    /// Arena names; empty means every arena
    pub arenas: Vec<String>,
    pub banned_items: Vec<String>,
    pub special_prices: BTreeMap<String, f64>,
}

impl Config {
    /// Get the path to the config file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("bdome");

        Ok(config_dir.join("config.toml"))
    }

    /// Load configuration from file, or create default if it doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config from {}", config_path.display()))?;

        toml::from_str(&contents).context("Failed to parse config file")
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory at {}", parent.display())
            })?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(config_path, contents)
            .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

        Ok(())
    }

    /// Configured arena filter, parsed
    pub fn arena_filter(&self) -> Result<Vec<Arena>> {
        self.arenas
            .iter()
            .map(|name| {
                name.parse::<Arena>()
                    .with_context(|| format!("Invalid arena '{}' in config file", name))
            })
            .collect()
    }

    pub fn set_arena_filter(&mut self, arenas: &[Arena]) {
        self.arenas = arenas.iter().map(|arena| arena.name().to_string()).collect();
    }

    pub fn ban(&mut self, name: String) {
        if !self.banned_items.contains(&name) {
            self.banned_items.push(name);
            self.banned_items.sort();
        }
    }

    pub fn unban(&mut self, name: &str) {
        self.banned_items.retain(|banned| banned != name);
    }
}

/// Effective settings: CLI flags over the config file over built-in defaults
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub drops_dir: PathBuf,
    pub source: PriceSourceKind,
    pub sample_count: u64,
    pub arenas: Vec<Arena>,
    pub banned_items: Vec<String>,
    pub special_prices: BTreeMap<String, f64>,
}

impl Settings {
    pub fn resolve(config: Config, args: &GlobalArgs) -> Result<Self> {
        let arenas = config.arena_filter()?;
        Ok(Self {
            data_dir: args
                .data_dir
                .clone()
                .or(config.data_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            drops_dir: args
                .drops_dir
                .clone()
                .or(config.drops_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DROPS_DIR)),
            source: args.source.or(config.price_source).unwrap_or_default(),
            sample_count: args
                .samples
                .or(config.sample_count)
                .unwrap_or(NUMBER_OF_ITEMS_TO_GENERATE),
            arenas: if arenas.is_empty() { ARENAS.to_vec() } else { arenas },
            banned_items: config.banned_items,
            special_prices: config.special_prices,
        })
    }

    /// Whether reports should include `arena`
    pub fn includes(&self, arena: Arena) -> bool {
        self.arenas.contains(&arena)
    }
}
