//! Configuration management for `scriptswap.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── backup     # [backup]
//! │   ├── cache      # [cache]
//! │   ├── compile    # [compile]
//! │   ├── notify     # [notify]
//! │   └── watch      # [watch]
//! ├── error          # ConfigError
//! ├── util           # config file discovery
//! └── mod.rs         # ReloadConfig (this file)
//! ```
//!
//! # Sections
//!
//! | Section     | Purpose                                          |
//! |-------------|--------------------------------------------------|
//! | `[watch]`   | Watched directory, file pattern, debounce timing |
//! | `[compile]` | External compiler command and timeout            |
//! | `[cache]`   | Versions retained per script                     |
//! | `[backup]`  | Durable backup directory                         |
//! | `[notify]`  | Notification behaviour                           |
//!
//! A missing config file is not an error: every section has defaults and the
//! current directory becomes the root.

mod error;
pub mod section;
mod util;

pub use error::ConfigError;
pub use section::{BackupConfig, CacheConfig, CompileConfig, NotifyConfig, WatchConfig};

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cache::MIN_RETAIN;
use crate::cli::{Cli, Commands, WatchArgs};
use crate::reload::ReloadSettings;
use crate::utils::glob::Glob;
use crate::utils::path::{expand_tilde, normalize_path, resolve_path};
use crate::{debug, log};
use util::find_config_file;

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing scriptswap.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReloadConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub watch: WatchConfig,

    #[serde(default)]
    pub compile: CompileConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub backup: BackupConfig,

    #[serde(default)]
    pub notify: NotifyConfig,
}

impl ReloadConfig {
    /// Load configuration for the given CLI invocation.
    ///
    /// Searches upward from cwd for the config file. Without one, defaults
    /// apply and cwd is the root.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;

        let mut config = match find_config_file(&cli.config, &cwd) {
            Some(path) => {
                let mut config = Self::from_path(&path)?;
                config.root = path.parent().map(Path::to_path_buf).unwrap_or_default();
                config.config_path = path;
                config
            }
            None => {
                debug!("config"; "{} not found, using defaults", cli.config.display());
                Self {
                    config_path: cwd.join(&cli.config),
                    root: cwd,
                    ..Self::default()
                }
            }
        };

        config.root = normalize_path(&config.root);
        if let Commands::Watch { args } = &cli.command {
            config.apply_watch_args(args);
        }
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from file path, warning about unknown fields.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            log!("warning"; "unknown fields in {}, ignoring: {}", path.display(), ignored.join(", "));
        }
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    // ========================================================================
    // paths
    // ========================================================================

    /// Get the root directory path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute watched directory.
    pub fn watch_dir(&self) -> PathBuf {
        self.resolve(&self.watch.dir)
    }

    /// Absolute backup directory, with `~` expanded.
    pub fn backup_dir(&self) -> PathBuf {
        self.resolve(&self.backup.dir)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        normalize_path(&resolve_path(&expand_tilde(path), &self.root))
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    /// Apply `watch` arguments from CLI.
    pub fn apply_watch_args(&mut self, args: &WatchArgs) {
        Self::update_option(&mut self.watch.dir, args.dir.as_ref());
        Self::update_option(&mut self.watch.pattern, args.pattern.as_ref());
        Self::update_option(&mut self.watch.debounce_ms, args.debounce.as_ref());
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    // ========================================================================
    // validation
    // ========================================================================

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.compile.validate()?;
        self.pattern()?;

        if self.cache.retain < MIN_RETAIN {
            log!(
                "warning";
                "[cache] retain = {} is below the minimum, using {}",
                self.cache.retain,
                MIN_RETAIN
            );
        }
        Ok(())
    }

    fn pattern(&self) -> Result<Glob, ConfigError> {
        Glob::new(&self.watch.pattern).map_err(|source| ConfigError::InvalidPattern {
            pattern: self.watch.pattern.clone(),
            source,
        })
    }

    /// Orchestrator settings derived from the config.
    pub fn settings(&self) -> Result<ReloadSettings, ConfigError> {
        Ok(ReloadSettings {
            pattern: self.pattern()?,
            debounce: self.watch.debounce(),
            compile_timeout: self.compile.timeout(),
            retain: self.cache.retain,
            auto_dismiss: self.notify.auto_dismiss,
        })
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse a config snippet.
/// Panics if there are unknown fields (to catch config typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> ReloadConfig {
    let (parsed, ignored) = ReloadConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================
