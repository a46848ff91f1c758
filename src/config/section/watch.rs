//! `[watch]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [watch]
//! dir = "scripts"             # Directory watched recursively
//! pattern = "*.lua"           # File-name glob of hot-reloadable scripts
//! debounce_ms = 300           # Quiet period before a change is processed
//! sweep_interval_secs = 30    # How often idle timers are swept
//! idle_timeout_secs = 60      # Timers idle longer than this are dropped
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::debounce::{
    DEFAULT_DELAY, DEFAULT_IDLE_TIMEOUT, DEFAULT_SWEEP_INTERVAL, DebounceSettings,
};

/// File watching settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Watched directory, relative to the project root.
    pub dir: PathBuf,

    /// File-name glob (`*` and `?`).
    pub pattern: String,

    /// Debounce delay in milliseconds. `0` processes every change at once.
    pub debounce_ms: u64,

    pub sweep_interval_secs: u64,

    pub idle_timeout_secs: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("scripts"),
            pattern: "*".to_string(),
            debounce_ms: DEFAULT_DELAY.as_millis() as u64,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL.as_secs(),
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT.as_secs(),
        }
    }
}

impl WatchConfig {
    pub fn debounce(&self) -> DebounceSettings {
        DebounceSettings {
            delay: Duration::from_millis(self.debounce_ms),
            sweep_interval: Duration::from_secs(self.sweep_interval_secs),
            idle_timeout: Duration::from_secs(self.idle_timeout_secs),
        }
    }
}
