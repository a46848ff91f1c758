//! Per-script reload state and in-flight tracking.
//!
//! ```text
//! Idle ─► Debouncing ─► Compiling ─┬─► Active
//!                                  └─► RollingBack ─┬─► ActiveRestored
//!                                                   └─► Failed
//! ```
//!
//! `Failed` only sticks for scripts that never compiled; the next successful
//! compile moves them to `Active`.

use dashmap::DashMap;
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::core::ScriptIdentity;
use crate::pipeline::{CompilationResult, PipelineError};

/// A compile abandoned at its timeout that is still running on the blocking pool.
pub(crate) type StrayCompile = JoinHandle<Result<CompilationResult, PipelineError>>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReloadState {
    #[default]
    Idle,
    Debouncing,
    Compiling,
    RollingBack,
    Active,
    ActiveRestored,
    Failed,
}

impl ReloadState {
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Debouncing => "debouncing",
            Self::Compiling => "compiling",
            Self::RollingBack => "rolling back",
            Self::Active => "active",
            Self::ActiveRestored => "active (restored)",
            Self::Failed => "failed",
        }
    }

    /// States a script rests in between changes.
    pub fn is_resting(self) -> bool {
        matches!(
            self,
            Self::Idle | Self::Active | Self::ActiveRestored | Self::Failed
        )
    }
}

#[derive(Debug, Default)]
struct Tracker {
    state: ReloadState,
    in_flight: bool,
    /// A settled change arrived while compiling.
    pending: bool,
    stray: Option<StrayCompile>,
}

/// Explicit registry of every script the orchestrator has seen.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    scripts: DashMap<ScriptIdentity, Tracker>,
}

impl Registry {
    pub fn state(&self, id: &ScriptIdentity) -> ReloadState {
        self.scripts.get(id).map(|t| t.state).unwrap_or_default()
    }

    pub fn set_state(&self, id: &ScriptIdentity, state: ReloadState) {
        self.scripts.entry(id.clone()).or_default().state = state;
    }

    /// A raw change was observed. Leaves a compiling script alone.
    pub fn mark_debouncing(&self, id: &ScriptIdentity) {
        let mut tracker = self.scripts.entry(id.clone()).or_default();
        if !tracker.in_flight {
            tracker.state = ReloadState::Debouncing;
        }
    }

    /// Claim the script for a reload.
    ///
    /// Returns `false` if one is already in flight; the change is then
    /// remembered and picked up by [`Registry::finish`].
    pub fn begin(&self, id: &ScriptIdentity) -> bool {
        let mut tracker = self.scripts.entry(id.clone()).or_default();
        if tracker.in_flight {
            tracker.pending = true;
            return false;
        }
        tracker.in_flight = true;
        tracker.pending = false;
        true
    }

    /// Release the script after a reload.
    ///
    /// Returns `true` if a change arrived meanwhile; the caller then keeps
    /// the claim and reloads again.
    pub fn finish(&self, id: &ScriptIdentity) -> bool {
        let mut tracker = self.scripts.entry(id.clone()).or_default();
        if tracker.pending {
            tracker.pending = false;
            return true;
        }
        tracker.in_flight = false;
        false
    }

    /// Park a timed-out compile. The claim is kept until it exits.
    pub fn park_stray(&self, id: &ScriptIdentity, compile: StrayCompile) {
        self.scripts.entry(id.clone()).or_default().stray = Some(compile);
    }

    pub fn take_stray(&self, id: &ScriptIdentity) -> Option<StrayCompile> {
        self.scripts.get_mut(id).and_then(|mut t| t.stray.take())
    }

    /// Every known script, sorted by path.
    pub fn identities(&self) -> Vec<ScriptIdentity> {
        let mut ids: Vec<_> = self.scripts.iter().map(|t| t.key().clone()).collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn id() -> ScriptIdentity {
        ScriptIdentity::from_path(Path::new("/scripts/registry.lua"))
    }

    #[test]
    fn test_unknown_is_idle() {
        assert_eq!(Registry::default().state(&id()), ReloadState::Idle);
    }

    #[test]
    fn test_begin_is_exclusive() {
        let registry = Registry::default();
        assert!(registry.begin(&id()));
        assert!(!registry.begin(&id()));
        assert!(!registry.begin(&id()));

        // Two deferred changes coalesce into one rerun.
        assert!(registry.finish(&id()));
        assert!(!registry.finish(&id()));
        assert!(registry.begin(&id()));
    }

    #[test]
    fn test_debouncing_does_not_override_compiling() {
        let registry = Registry::default();
        assert!(registry.begin(&id()));
        registry.set_state(&id(), ReloadState::Compiling);
        registry.mark_debouncing(&id());
        assert_eq!(registry.state(&id()), ReloadState::Compiling);

        registry.finish(&id());
        registry.mark_debouncing(&id());
        assert_eq!(registry.state(&id()), ReloadState::Debouncing);
    }

    #[tokio::test]
    async fn test_stray_compile_is_taken_once() {
        let registry = Registry::default();
        assert!(registry.take_stray(&id()).is_none());

        let stray = tokio::task::spawn_blocking(|| Ok(CompilationResult::default()));
        registry.park_stray(&id(), stray);
        let stray = registry.take_stray(&id()).unwrap();
        assert!(registry.take_stray(&id()).is_none());
        assert!(stray.await.unwrap().is_ok());
    }

    #[test]
    fn test_resting_states() {
        assert!(ReloadState::Active.is_resting());
        assert!(ReloadState::Failed.is_resting());
        assert!(!ReloadState::Compiling.is_resting());
        assert!(!ReloadState::RollingBack.is_resting());
    }
}
