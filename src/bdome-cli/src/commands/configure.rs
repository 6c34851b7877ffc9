//! Configuration command handlers
//!
//! Handles the `configure` subcommand for setting up bdome CLI defaults.

use crate::config::Config;
use anyhow::Result;
use bdome::{Arena, PriceSourceKind};
use std::path::PathBuf;

/// Requested changes to the config file
#[derive(Debug, Default)]
pub struct ConfigChanges {
    pub data_dir: Option<PathBuf>,
    pub drops_dir: Option<PathBuf>,
    pub source: Option<PriceSourceKind>,
    pub samples: Option<u64>,
    pub arenas: Option<Vec<Arena>>,
    pub all_arenas: bool,
    pub ban: Vec<String>,
    pub unban: Vec<String>,
    pub special: Vec<(String, f64)>,
}

impl ConfigChanges {
    fn is_empty(&self) -> bool {
        self.data_dir.is_none()
            && self.drops_dir.is_none()
            && self.source.is_none()
            && self.samples.is_none()
            && self.arenas.is_none()
            && !self.all_arenas
            && self.ban.is_empty()
            && self.unban.is_empty()
            && self.special.is_empty()
    }

    fn apply(self, config: &mut Config) {
        if let Some(dir) = self.data_dir {
            config.data_dir = Some(dir);
        }
        if let Some(dir) = self.drops_dir {
            config.drops_dir = Some(dir);
        }
        if let Some(source) = self.source {
            config.price_source = Some(source);
        }
        if let Some(samples) = self.samples {
            config.sample_count = Some(samples);
        }
        if let Some(arenas) = self.arenas {
            config.set_arena_filter(&arenas);
        }
        if self.all_arenas {
            config.arenas.clear();
        }
        for name in self.ban {
            config.ban(name);
        }
        for name in &self.unban {
            config.unban(name);
        }
        config.special_prices.extend(self.special);
    }
}

/// Handle the configure command
///
/// # Arguments
/// * `changes` - Settings to store as defaults
/// * `show` - If true, show current configuration
pub fn handle(changes: ConfigChanges, show: bool) -> Result<()> {
    let mut config = Config::load()?;

    if show {
        show_config(&config);
        return Ok(());
    }

    if changes.is_empty() {
        show_usage();
        return Ok(());
    }

    changes.apply(&mut config);
    config.save()?;
    if let Ok(path) = Config::config_path() {
        println!("Config saved to: {}", path.display());
    }

    Ok(())
}

fn show_value<T: std::fmt::Display>(label: &str, value: Option<T>) {
    match value {
        Some(value) => println!("{:<16} {}", label, value),
        None => println!("{:<16} (default)", label),
    }
}

/// Display current configuration
fn show_config(config: &Config) {
    show_value("Data dir:", config.data_dir.as_ref().map(|p| p.display()));
    show_value("Drops dir:", config.drops_dir.as_ref().map(|p| p.display()));
    show_value("Price source:", config.price_source);
    show_value("Sample count:", config.sample_count);
    if config.arenas.is_empty() {
        println!("{:<16} (all)", "Arenas:");
    } else {
        println!("{:<16} {}", "Arenas:", config.arenas.join(", "));
    }
    if !config.banned_items.is_empty() {
        println!("{:<16} {}", "Banned items:", config.banned_items.join(", "));
    }
    for (name, price) in &config.special_prices {
        println!("{:<16} {} = {} NP", "Special price:", name, price);
    }

    if let Ok(path) = Config::config_path() {
        println!("Config file: {}", path.display());
    }
}

/// Show usage help for the configure command
fn show_usage() {
    println!("Usage: bdome configure --source itemdb --samples 1000000");
    println!("   or: bdome configure --arenas Frost_Arena,Ugga_Dome");
    println!("   or: bdome configure --ban \"Retired Plushie\" --special \"Rusty Pipe=150\"");
    println!("   or: bdome configure --show");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_usage_does_not_panic() {
        show_usage();
    }

    #[test]
    fn test_empty_changes() {
        assert!(ConfigChanges::default().is_empty());
        let changes = ConfigChanges {
            all_arenas: true,
            ..ConfigChanges::default()
        };
        assert!(!changes.is_empty());
    }

    #[test]
    fn test_apply_changes() {
        let mut config = Config::default();
        config.ban("Can of Neocola".to_string());

        ConfigChanges {
            source: Some(PriceSourceKind::ItemDb),
            samples: Some(10_000),
            arenas: Some(vec![Arena::UggaDome, Arena::CosmicDome]),
            ban: vec!["Retired Plushie".to_string()],
            unban: vec!["Can of Neocola".to_string()],
            special: vec![("Rusty Pipe".to_string(), 150.0)],
            ..ConfigChanges::default()
        }
        .apply(&mut config);

        assert_eq!(config.price_source, Some(PriceSourceKind::ItemDb));
        assert_eq!(config.sample_count, Some(10_000));
        assert_eq!(config.arenas, vec!["Ugga Dome", "Cosmic Dome"]);
        assert_eq!(config.banned_items, vec!["Retired Plushie"]);
        assert_eq!(config.special_prices.get("Rusty Pipe"), Some(&150.0));

        ConfigChanges {
            all_arenas: true,
            ..ConfigChanges::default()
        }
        .apply(&mut config);
        assert!(config.arenas.is_empty());
    }

    #[test]
    fn test_config_path_exists() {
        let result = Config::config_path();
        assert!(result.is_ok());
    }
}
