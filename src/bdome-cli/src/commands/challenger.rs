//! Full comparison for one challenger

use anyhow::{Context, Result};
use bdome::{Arena, ChallengerKey};

use crate::cli::OutputFormat;
use crate::commands::{emit, open_engine, progress_bar};
use crate::config::Settings;
use crate::views;

/// Challenger and difficulty as typed on the command line, `_` for spaces
pub fn key_from_args(arena: Arena, challenger: &str, difficulty: &str) -> ChallengerKey {
    ChallengerKey::new(
        arena,
        challenger.replace('_', " "),
        difficulty.replace('_', " "),
    )
}

/// Handle the challenger command
pub fn handle(
    settings: &Settings,
    arena: Arena,
    challenger: &str,
    difficulty: &str,
    format: OutputFormat,
) -> Result<()> {
    let key = key_from_args(arena, challenger, difficulty);
    let pb = progress_bar()?;
    let mut engine = open_engine(settings, &pb)?;
    let alpha = engine.significance();

    let result = engine
        .compare_challenger(&key)
        .with_context(|| format!("Failed to compare {}", key))?;
    pb.finish_and_clear();
    engine.close().context("Failed to save price cache")?;

    emit(format, &views::challenger_report(&result, alpha)?, &result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_from_args() {
        let key = key_from_args(Arena::RattlingCauldron, "Koi_Warrior", "Great");
        assert_eq!(key.arena, Arena::RattlingCauldron);
        assert_eq!(key.challenger, "Koi Warrior");
        assert_eq!(key.difficulty, "Great");
    }
}
