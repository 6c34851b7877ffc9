//! Command handlers for bdome CLI
//!
//! Each subcommand has its own module with handler functions.

pub mod arenas;
pub mod challenger;
pub mod challengers;
pub mod configure;
pub mod drops;
pub mod generate;
pub mod price;

use anyhow::{Context, Result};
use bdome::constants::ITEM_WEIGHTS_FILE;
use bdome::{
    ComparisonEngine, DropDataSet, DropRateStore, GeneratedDropsStore, HtmlPriceSource,
    PriceCache, WeightTable,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::config::Settings;

/// Price cache for the configured source, with banned items and fixed prices applied
pub fn open_cache(settings: &Settings) -> Result<PriceCache> {
    let source = HtmlPriceSource::new(settings.source, &settings.data_dir);
    let cache = PriceCache::load(Box::new(source))
        .with_context(|| format!("Failed to load {} price cache", settings.source))?
        .with_banned(settings.banned_items.iter().cloned())
        .with_special_prices(
            settings
                .special_prices
                .iter()
                .map(|(name, price)| (name.clone(), *price)),
        );
    Ok(cache)
}

pub fn load_drops(settings: &Settings) -> Result<DropDataSet> {
    DropDataSet::load_dir(&settings.drops_dir).with_context(|| {
        format!(
            "Failed to load drop data from {}",
            settings.drops_dir.display()
        )
    })
}

pub fn progress_bar() -> Result<ProgressBar> {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .context("Invalid progress bar template")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

/// Everything the comparison commands need, loaded from the configured directories
pub fn open_engine(settings: &Settings, progress: &ProgressBar) -> Result<ComparisonEngine> {
    let weights_path = settings.data_dir.join(ITEM_WEIGHTS_FILE);
    let weights = WeightTable::load(&weights_path)
        .with_context(|| format!("Failed to load item weights from {}", weights_path.display()))?;

    Ok(ComparisonEngine::new(
        load_drops(settings)?,
        weights,
        GeneratedDropsStore::new(&settings.data_dir, settings.sample_count),
        DropRateStore::new(&settings.data_dir, settings.sample_count),
        open_cache(settings)?,
    )
    .with_progress(progress.clone()))
}

/// Print report lines, or `value` as JSON
pub fn emit<T: Serialize>(format: OutputFormat, lines: &[String], value: &T) -> Result<()> {
    match format {
        OutputFormat::Table => {
            for line in lines {
                println!("{}", line);
            }
        }
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(value).context("Failed to serialize report")?
            );
        }
    }
    Ok(())
}

/// A batch entry with its error flattened to text
#[derive(Debug, Serialize)]
pub struct OutcomeRow<'a, K, T> {
    pub key: &'a K,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<&'a T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<'a, K, T> From<&'a bdome::Outcome<K, T>> for OutcomeRow<'a, K, T> {
    fn from(outcome: &'a bdome::Outcome<K, T>) -> Self {
        Self {
            key: &outcome.key,
            result: outcome.result.as_ref().ok(),
            error: outcome.result.as_ref().err().map(ToString::to_string),
        }
    }
}

pub fn outcome_rows<K, T>(outcomes: &[bdome::Outcome<K, T>]) -> Vec<OutcomeRow<'_, K, T>> {
    outcomes.iter().map(OutcomeRow::from).collect()
}
