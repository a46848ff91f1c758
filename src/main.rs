//! scriptswap - live script hot-reload orchestrator.

use anyhow::Result;
use clap::{ColorChoice, Parser};
use scriptswap::cli::{self, Cli, Commands};
use scriptswap::config::ReloadConfig;
use scriptswap::{core, logger};

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = ReloadConfig::load(&cli)?;

    match &cli.command {
        Commands::Watch { .. } => cli::watch::watch_scripts(&config),
        Commands::Backups => cli::backups::list_backups(&config),
        Commands::ClearBackup { path } => cli::backups::clear_backup(&config, path),
    }
}
