//! Modalis CLI - render modal generators to WAV files.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "modalis")]
#[command(author, version, about = "Modalis modal synthesis CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a generator to a WAV file
    Render(commands::render::RenderArgs),

    /// List, inspect and copy presets
    Presets(commands::presets::PresetsArgs),

    /// Inspect and export piano model files
    Model(commands::model::ModelArgs),

    /// Display WAV file information
    Info(commands::info::InfoArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render(args) => commands::render::run(args),
        Commands::Presets(args) => commands::presets::run(args),
        Commands::Model(args) => commands::model::run(args),
        Commands::Info(args) => commands::info::run(args),
    }
}
