//! Per-file profit breakdown of recorded drops

use anyhow::{Context, Result};
use bdome::constants::{ARENAS, NOTHING};
use bdome::{total_profit, DropMetadata};
use serde::Serialize;
use tracing::info;

use crate::cli::OutputFormat;
use crate::commands::{emit, load_drops, open_cache};
use crate::config::Settings;
use crate::views;

#[derive(Debug, Serialize)]
struct DropsItem {
    name: String,
    quantity: u64,
    price: f64,
    profit: f64,
}

#[derive(Debug, Serialize)]
struct DropsReport {
    metadata: DropMetadata,
    items: Vec<DropsItem>,
    total_profit: f64,
}

/// Handle the drops command
///
/// # Arguments
/// * `count` - How many of the most recent files for the configured arenas to
///   show; 0 shows every file
pub fn handle(settings: &Settings, count: usize, format: OutputFormat) -> Result<()> {
    if settings.arenas.len() < ARENAS.len() {
        let names: Vec<&str> = settings.arenas.iter().map(|a| a.name()).collect();
        info!("Only displaying data related to {}", names.join(", "));
    }

    let dataset = load_drops(settings)?;
    let mut cache = open_cache(settings)?;
    let mut lines = Vec::new();
    let mut reports = Vec::new();

    for drops in dataset.latest(count, |drops| settings.includes(drops.metadata.arena)) {
        let normalised = drops
            .normalise()
            .with_context(|| format!("Failed to combine drops in {}", drops.metadata.source))?;
        let prices = cache.prices_for(normalised.names().filter(|name| *name != NOTHING));

        lines.push(drops.metadata.to_string());
        lines.extend(
            views::drops_table(&normalised, &prices)?
                .lines()
                .into_iter()
                .map(|line| format!("  {}", line)),
        );
        lines.push(String::new());

        reports.push(DropsReport {
            metadata: drops.metadata.clone(),
            items: normalised
                .items()
                .filter(|item| !item.is_nothing())
                .map(|item| DropsItem {
                    name: item.name.clone(),
                    quantity: item.quantity,
                    price: prices.get(&item.name),
                    profit: item.quantity as f64 * prices.get(&item.name),
                })
                .collect(),
            total_profit: total_profit(&normalised, &prices),
        });
    }

    cache.close().context("Failed to save price cache")?;
    emit(format, &lines, &reports)
}
