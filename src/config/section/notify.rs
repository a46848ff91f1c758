//! `[notify]` section configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Let success and info notifications disappear on their own.
    /// Errors and warnings always stay until replaced.
    pub auto_dismiss: bool,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self { auto_dismiss: true }
    }
}
