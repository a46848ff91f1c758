//! `[compile]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [compile]
//! command = ["luac", "-p", "{input}"]   # Empty: load the source as-is
//! timeout_ms = 5000                     # 0 waits forever
//! ```
//!
//! `{input}` is replaced with the script path and `{output}` with a scratch
//! file whose contents become the module. Without `{input}` the source is
//! piped to stdin.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileConfig {
    /// Compiler program and arguments.
    pub command: Vec<String>,

    /// Compile timeout in milliseconds.
    pub timeout_ms: u64,
}

impl CompileConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(program) = self.command.first()
            && program.trim().is_empty()
        {
            return Err(ConfigError::Validation(
                "[compile] command starts with an empty program name".into(),
            ));
        }
        Ok(())
    }
}
