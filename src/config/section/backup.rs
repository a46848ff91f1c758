//! `[backup]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [backup]
//! dir = "~/.cache/game/backup"   # Tilde is expanded; relative to root otherwise
//! enabled = true                 # false keeps backups in memory only
//! ```
//!
//! With `enabled = false` the last good version of a script does not survive
//! a restart.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    pub dir: PathBuf,
    pub enabled: bool,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".scriptswap/backup"),
            enabled: true,
        }
    }
}
