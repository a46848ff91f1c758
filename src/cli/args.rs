//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Live script hot-reload: recompile on save, swap atomically, roll back on failure
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: scriptswap.toml)
    #[arg(short = 'C', long, global = true, default_value = "scriptswap.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Compile all scripts, then hot-reload them on change until Ctrl+C
    #[command(visible_alias = "w")]
    Watch {
        #[command(flatten)]
        args: WatchArgs,
    },

    /// List persisted backup snapshots
    #[command(visible_alias = "b")]
    Backups,

    /// Delete the persisted backup of one script
    ClearBackup {
        /// Script whose backup is deleted
        #[arg(value_hint = clap::ValueHint::FilePath)]
        path: PathBuf,
    },
}

/// Watch command arguments. Each one overrides `[watch]` in the config.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct WatchArgs {
    /// Directory to watch (relative to project root)
    #[arg(value_hint = clap::ValueHint::DirPath)]
    pub dir: Option<PathBuf>,

    /// File-name glob of hot-reloadable scripts (e.g. "*.lua")
    #[arg(short, long)]
    pub pattern: Option<String>,

    /// Debounce delay in milliseconds
    #[arg(short, long, value_name = "MS")]
    pub debounce: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_watch() {
        let cli = Cli::parse_from([
            "scriptswap", "-C", "game.toml", "watch", "lua", "-p", "*.lua", "-d", "50",
        ]);
        assert_eq!(cli.config, PathBuf::from("game.toml"));
        let Commands::Watch { args } = cli.command else {
            panic!("expected watch");
        };
        assert_eq!(args.dir, Some(PathBuf::from("lua")));
        assert_eq!(args.pattern.as_deref(), Some("*.lua"));
        assert_eq!(args.debounce, Some(50));
    }

    #[test]
    fn test_parse_clear_backup() {
        let cli = Cli::parse_from(["scriptswap", "clear-backup", "scripts/npc.lua", "--verbose"]);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::ClearBackup { .. }));
    }
}
