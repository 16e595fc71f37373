use clap::{Parser, Subcommand};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

mod error;
mod loader;
mod subcommands;

/// Reads wiki documents, runs their macros and prints them back
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Convert(subcommands::convert::Args),
    Inspect(subcommands::inspect::Args),
    Events(subcommands::events::Args),
}

fn main() -> miette::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match &cli.command {
        Commands::Convert(args) => subcommands::convert::run(args),
        Commands::Inspect(args) => subcommands::inspect::run(args),
        Commands::Events(args) => subcommands::events::run(args),
    }
}
