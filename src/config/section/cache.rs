//! `[cache]` section configuration.
//!
//! ```toml
//! [cache]
//! retain = 4    # Versions kept per script (at least 2)
//! ```

use serde::{Deserialize, Serialize};

use crate::cache::DEFAULT_RETAIN;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub retain: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            retain: DEFAULT_RETAIN,
        }
    }
}
