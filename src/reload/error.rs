use std::error::Error as StdError;

use thiserror::Error;

use crate::backup::BackupError;
use crate::config::ConfigError;
use crate::core::ScriptIdentity;

/// Failures crossing the reload boundary.
///
/// `Compilation` is the expected failure (a bad edit); everything except
/// `Compilation` and `RollbackUnavailable` that interrupts a reload triggers
/// an emergency rollback.
#[derive(Debug, Error)]
pub enum ReloadError {
    #[error("{0}: compilation failed with {1} error(s)")]
    Compilation(ScriptIdentity, usize),

    #[error("watcher error: {message}")]
    Watcher { message: String, critical: bool },

    #[error("{0}: no previous version to roll back to")]
    RollbackUnavailable(ScriptIdentity),

    #[error("{identity}: {message}")]
    Unexpected {
        identity: ScriptIdentity,
        message: String,
    },

    #[error(transparent)]
    Backup(#[from] BackupError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ReloadError {
    pub fn unexpected(identity: &ScriptIdentity, message: impl Into<String>) -> Self {
        Self::Unexpected {
            identity: identity.clone(),
            message: message.into(),
        }
    }

    /// Whether this failure takes the emergency rollback path.
    pub fn is_emergency(&self) -> bool {
        !matches!(self, Self::Compilation(..) | Self::RollbackUnavailable(_))
    }
}

/// `err` followed by its sources, joined with `: `.
pub(crate) fn error_chain(err: &dyn StdError) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
