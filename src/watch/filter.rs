//! Which raw notify events become changes.

use std::path::{Path, PathBuf};

use notify::EventKind;
use notify::event::ModifyKind;

use crate::utils::glob::Glob;
use crate::utils::path::normalize_path;

/// Editor artifacts: swap files, backups, `foo~`, dotfiles.
pub fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}

/// Normalized paths in `event` that count as content changes for `pattern`.
///
/// Creates and content modifications pass; removes, access and
/// metadata-only modifications (mtime/chmod noise) do not.
pub fn changed_paths(event: &notify::Event, pattern: &Glob) -> Vec<PathBuf> {
    let relevant = match event.kind {
        EventKind::Create(_) => true,
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(_) => true,
        _ => false,
    };
    if !relevant {
        return Vec::new();
    }

    event
        .paths
        .iter()
        .filter(|path| !is_temp_file(path) && pattern.matches(path))
        .map(|path| normalize_path(path))
        .collect()
}
