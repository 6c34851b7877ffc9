//! Arena comparisons, full or brief

use anyhow::{Context, Result};
use bdome::{Arena, ArenaComparison, Outcome};
use tracing::warn;

use crate::cli::OutputFormat;
use crate::commands::{emit, open_engine, outcome_rows, progress_bar};
use crate::config::Settings;
use crate::views;

/// Handle the arenas command
pub fn handle(settings: &Settings, brief: bool, format: OutputFormat) -> Result<()> {
    let pb = progress_bar()?;
    let mut engine = open_engine(settings, &pb)?;
    let alpha = engine.significance();

    if brief {
        let outcomes = engine.compare_all_arenas_brief(&settings.arenas);
        pb.finish_and_clear();
        engine.close().context("Failed to save price cache")?;
        return emit(format, &views::brief_arenas(&outcomes)?, &outcome_rows(&outcomes));
    }

    let mut outcomes: Vec<Outcome<Arena, ArenaComparison>> = settings
        .arenas
        .iter()
        .map(|&arena| {
            let result = engine.compare_arena(arena);
            if let Err(e) = &result {
                warn!("Comparison for {} failed: {}", arena, e);
            }
            Outcome { key: arena, result }
        })
        .collect();
    pb.finish_and_clear();
    engine.close().context("Failed to save price cache")?;

    outcomes.sort_by(|a, b| actual_mean(b).total_cmp(&actual_mean(a)));
    emit(format, &views::arena_reports(&outcomes, alpha)?, &outcome_rows(&outcomes))
}

fn actual_mean(outcome: &Outcome<Arena, ArenaComparison>) -> f64 {
    outcome
        .result
        .as_ref()
        .map_or(0.0, |result| result.comparison.actual.mean_day())
}
