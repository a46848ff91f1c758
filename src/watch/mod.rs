//! File change watching.
//!
//! A [`ChangeWatcher`] pushes [`WatchEvent`]s onto an unbounded channel; the
//! orchestrator forwards changed paths to the debouncer and turns errors
//! into notifications. [`NotifyWatcher`] is the OS-backed implementation.

mod filter;
mod native;

use std::path::{Path, PathBuf};

use tokio::sync::mpsc;

use crate::reload::ReloadError;
use crate::utils::glob::Glob;

pub use filter::{changed_paths, is_temp_file};
pub use native::NotifyWatcher;

/// Something the watcher observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// A matching file was created or its content modified.
    Changed(PathBuf),
    /// The watcher hit an error. `critical` means events may be lost until
    /// watching is restarted.
    Error { error: String, critical: bool },
}

/// Source of file change events.
pub trait ChangeWatcher: Send + 'static {
    /// Start watching `dir` recursively for files whose name matches
    /// `pattern`. Restarting replaces the previous watch.
    fn start(
        &mut self,
        dir: &Path,
        pattern: &Glob,
        tx: mpsc::UnboundedSender<WatchEvent>,
    ) -> Result<(), ReloadError>;

    fn stop(&mut self);
}
