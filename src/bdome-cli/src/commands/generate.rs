//! Forced regeneration of an arena's synthetic sample

use anyhow::{Context, Result};
use bdome::constants::NUMBER_OF_ITEMS_TO_PRINT;
use bdome::{Arena, ItemDropRate};

use crate::cli::OutputFormat;
use crate::commands::{emit, open_engine, progress_bar};
use crate::config::Settings;
use crate::views;

/// Handle the generate command
pub fn handle(settings: &Settings, arena: Arena, format: OutputFormat) -> Result<()> {
    let pb = progress_bar()?;
    let mut engine = open_engine(settings, &pb)?;

    let drops = engine
        .regenerate(arena)
        .with_context(|| format!("Failed to generate drops for {}", arena))?;
    let rates = engine
        .predicted_rates(arena)
        .with_context(|| format!("Failed to read drop rates for {}", arena))?;
    pb.finish_and_clear();
    engine.close().context("Failed to save price cache")?;

    let mut ordered: Vec<&ItemDropRate> = rates.values().collect();
    ordered.sort_by(|a, b| b.rate.total_cmp(&a.rate).then_with(|| a.name.cmp(&b.name)));

    let mut lines = vec![format!(
        "Generated {} drops ({} distinct items) for {}",
        drops.total_quantity(),
        drops.len(),
        arena
    )];
    let shown = &ordered[..ordered.len().min(NUMBER_OF_ITEMS_TO_PRINT)];
    lines.extend(views::generated_rates_table(arena, shown)?.lines());
    emit(format, &lines, &ordered)
}
