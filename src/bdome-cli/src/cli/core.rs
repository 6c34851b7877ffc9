//! Core CLI definitions

use bdome::constants::NUMBER_OF_DROPS_TO_PRINT;
use bdome::{Arena, PriceSourceKind};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bdome")]
#[command(about = "Battledome loot-drop analysis", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub globals: GlobalArgs,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Locations and sampling options, overriding the config file
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Directory holding item weights, generated drops and price caches
    #[arg(long, env = "BDOME_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Directory holding recorded daily drop files
    #[arg(long, env = "BDOME_DROPS_DIR")]
    pub drops_dir: Option<PathBuf>,

    /// Price site to look items up on (jellyneo, itemdb)
    #[arg(long, env = "BDOME_PRICE_SOURCE")]
    pub source: Option<PriceSourceKind>,

    /// Number of synthetic drops to generate per arena
    #[arg(long, env = "BDOME_SAMPLES")]
    pub samples: Option<u64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Profit breakdown of the most recent drop files
    #[command(visible_alias = "d")]
    Drops {
        /// Number of files to show
        #[arg(short, long, default_value_t = NUMBER_OF_DROPS_TO_PRINT)]
        count: usize,
    },

    /// Compare recorded and predicted profit for every arena
    #[command(visible_alias = "a")]
    Arenas {
        /// One summary table instead of a full report per arena
        #[arg(short, long)]
        brief: bool,
    },

    /// Compare recorded and predicted profit for every challenger
    Challengers,

    /// Full comparison for a single challenger (underscores stand for spaces)
    #[command(visible_alias = "c")]
    Challenger {
        /// Arena, e.g. Central_Arena
        arena: Arena,

        /// Challenger, e.g. Flaming_Meerca
        challenger: String,

        /// Difficulty, e.g. Mighty
        difficulty: String,
    },

    /// Draw a fresh synthetic sample for an arena, replacing the stored one
    #[command(visible_alias = "g")]
    Generate {
        /// Arena, e.g. Frost_Arena
        arena: Arena,
    },

    /// Look up an item price through the cache
    #[command(visible_alias = "p")]
    Price {
        /// Item name
        name: String,
    },

    /// Configure default settings
    Configure {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Set default data directory
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Set default drop-data directory
        #[arg(long)]
        drops_dir: Option<PathBuf>,

        /// Set default price source
        #[arg(long)]
        source: Option<PriceSourceKind>,

        /// Set default synthetic sample count
        #[arg(long)]
        samples: Option<u64>,

        /// Only report on these arenas (comma-separated)
        #[arg(long, value_delimiter = ',')]
        arenas: Option<Vec<Arena>>,

        /// Report on every arena again
        #[arg(long, conflicts_with = "arenas")]
        all_arenas: bool,

        /// Never price this item
        #[arg(long)]
        ban: Vec<String>,

        /// Price this item normally again
        #[arg(long)]
        unban: Vec<String>,

        /// Fixed price for an item, as NAME=PRICE
        #[arg(long, value_parser = parse_special_price)]
        special: Vec<(String, f64)>,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

fn parse_special_price(s: &str) -> Result<(String, f64), String> {
    let (name, price) = s
        .rsplit_once('=')
        .ok_or_else(|| format!("expected NAME=PRICE, got '{}'", s))?;
    let price: f64 = price
        .trim()
        .parse()
        .map_err(|_| format!("invalid price '{}'", price.trim()))?;
    if !price.is_finite() || price < 0.0 {
        return Err(format!("price must be non-negative, got {}", price));
    }
    Ok((name.trim().to_string(), price))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_challenger_arguments() {
        let cli = Cli::parse_from([
            "bdome",
            "challenger",
            "Central_Arena",
            "Flaming_Meerca",
            "Mighty",
        ]);
        match cli.command {
            Commands::Challenger {
                arena,
                challenger,
                difficulty,
            } => {
                assert_eq!(arena, Arena::CentralArena);
                assert_eq!(challenger, "Flaming_Meerca");
                assert_eq!(difficulty, "Mighty");
            }
            _ => panic!("expected challenger command"),
        }
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from([
            "bdome",
            "--source",
            "itemdb",
            "--samples",
            "5000",
            "arenas",
            "--brief",
            "--format",
            "json",
            "-v",
        ]);
        assert_eq!(cli.globals.source, Some(PriceSourceKind::ItemDb));
        assert_eq!(cli.globals.samples, Some(5000));
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Arenas { brief: true }));
    }

    #[test]
    fn test_drops_default_count() {
        let cli = Cli::parse_from(["bdome", "drops"]);
        assert!(matches!(
            cli.command,
            Commands::Drops { count } if count == NUMBER_OF_DROPS_TO_PRINT
        ));
    }

    #[test]
    fn test_parse_special_price() {
        assert!(parse_special_price("Dubloon-o-Matic=12,000").is_err());
        assert_eq!(
            parse_special_price("Rusty Pipe = 150").unwrap(),
            ("Rusty Pipe".to_string(), 150.0)
        );
        assert!(parse_special_price("Rusty Pipe").is_err());
        assert!(parse_special_price("Rusty Pipe=-1").is_err());
    }
}
