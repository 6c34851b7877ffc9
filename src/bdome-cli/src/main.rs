mod cli;
mod commands;
mod config;
mod report;
mod views;

use anyhow::Result;
use clap::Parser;
use config::{Config, Settings};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::*;
use commands::configure::ConfigChanges;

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "bdome=debug,bdome_cli=debug"
    } else {
        "bdome=info,bdome_cli=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let format = cli.format;
    let settings = || Settings::resolve(Config::load()?, &cli.globals);

    match cli.command {
        Commands::Drops { count } => {
            commands::drops::handle(&settings()?, count, format)?;
        }

        Commands::Arenas { brief } => {
            commands::arenas::handle(&settings()?, brief, format)?;
        }

        Commands::Challengers => {
            commands::challengers::handle(&settings()?, format)?;
        }

        Commands::Challenger {
            arena,
            challenger,
            difficulty,
        } => {
            commands::challenger::handle(&settings()?, arena, &challenger, &difficulty, format)?;
        }

        Commands::Generate { arena } => {
            commands::generate::handle(&settings()?, arena, format)?;
        }

        Commands::Price { name } => {
            commands::price::handle(&settings()?, &name, format)?;
        }

        Commands::Configure {
            show,
            data_dir,
            drops_dir,
            source,
            samples,
            arenas,
            all_arenas,
            ban,
            unban,
            special,
        } => {
            let changes = ConfigChanges {
                data_dir,
                drops_dir,
                source,
                samples,
                arenas,
                all_arenas,
                ban,
                unban,
                special,
            };
            commands::configure::handle(changes, show)?;
        }
    }

    Ok(())
}
