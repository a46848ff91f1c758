//! OS file watching via the `notify` crate.

use std::path::Path;

use notify::{ErrorKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use super::{ChangeWatcher, WatchEvent, changed_paths};
use crate::debug;
use crate::reload::ReloadError;
use crate::utils::glob::Glob;

/// Recursive watcher backed by the platform's recommended notify backend.
#[derive(Default)]
pub struct NotifyWatcher {
    watcher: Option<RecommendedWatcher>,
}

impl NotifyWatcher {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Errors after which the watch is no longer trustworthy.
fn is_critical(kind: &ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::MaxFilesWatch | ErrorKind::PathNotFound | ErrorKind::InvalidConfig(_)
    )
}

fn to_reload_error(err: &notify::Error) -> ReloadError {
    ReloadError::Watcher {
        message: err.to_string(),
        critical: is_critical(&err.kind),
    }
}

impl ChangeWatcher for NotifyWatcher {
    fn start(
        &mut self,
        dir: &Path,
        pattern: &Glob,
        tx: mpsc::UnboundedSender<WatchEvent>,
    ) -> Result<(), ReloadError> {
        self.stop();

        let label = pattern.as_str().to_string();
        let pattern = pattern.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    for path in changed_paths(&event, &pattern) {
                        let _ = tx.send(WatchEvent::Changed(path));
                    }
                }
                Err(err) => {
                    let _ = tx.send(WatchEvent::Error {
                        critical: is_critical(&err.kind),
                        error: err.to_string(),
                    });
                }
            }
        })
        .map_err(|e| to_reload_error(&e))?;

        watcher
            .watch(dir, RecursiveMode::Recursive)
            .map_err(|e| to_reload_error(&e))?;

        debug!("watch"; "watching {} for {}", dir.display(), label);
        self.watcher = Some(watcher);
        Ok(())
    }

    fn stop(&mut self) {
        if self.watcher.take().is_some() {
            debug!("watch"; "watcher stopped");
        }
    }
}
