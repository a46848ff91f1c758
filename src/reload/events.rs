//! Observable reload events.
//!
//! Published on a `tokio::sync::broadcast` channel; subscribers see events
//! in the order they happened. A lagging subscriber loses the oldest events
//! rather than slowing reloads down.

use std::sync::Arc;

use serde::Serialize;

use crate::core::{Module, ScriptIdentity};
use crate::pipeline::CompilationResult;

/// Broadcast capacity per subscriber.
pub(crate) const EVENT_CAPACITY: usize = 256;

/// Where a rollback found its version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RollbackTier {
    /// In-memory version history.
    Cache,
    /// Durable backup slot.
    Backup,
}

impl RollbackTier {
    pub fn label(self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Backup => "backup",
        }
    }
}

#[derive(Debug, Clone)]
pub enum ReloadEvent {
    Succeeded {
        identity: ScriptIdentity,
        module: Arc<Module>,
        version: u64,
    },
    /// Compilation failed. Unexpected failures carry a synthesized result
    /// holding the error message.
    Failed {
        identity: ScriptIdentity,
        result: Arc<CompilationResult>,
    },
    RolledBack {
        identity: ScriptIdentity,
        module: Arc<Module>,
        version: u64,
        tier: RollbackTier,
        emergency: bool,
    },
}

impl ReloadEvent {
    pub fn identity(&self) -> &ScriptIdentity {
        match self {
            Self::Succeeded { identity, .. }
            | Self::Failed { identity, .. }
            | Self::RolledBack { identity, .. } => identity,
        }
    }
}
