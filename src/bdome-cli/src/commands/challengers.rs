//! Profit comparison across every recorded challenger

use anyhow::{Context, Result};

use crate::cli::OutputFormat;
use crate::commands::{emit, open_engine, outcome_rows, progress_bar};
use crate::config::Settings;
use crate::views;

/// Handle the challengers command
pub fn handle(settings: &Settings, format: OutputFormat) -> Result<()> {
    let pb = progress_bar()?;
    let mut engine = open_engine(settings, &pb)?;

    let mut outcomes = engine
        .compare_all_challengers()
        .context("Failed to compare challengers")?;
    pb.finish_and_clear();
    engine.close().context("Failed to save price cache")?;

    outcomes.retain(|outcome| settings.includes(outcome.key.arena));
    emit(format, &views::challenger_summaries(&outcomes)?, &outcome_rows(&outcomes))
}
