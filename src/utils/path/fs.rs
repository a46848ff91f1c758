//! Path normalization utilities.
//!
//! Provides consistent path handling across the codebase:
//! - `normalize_path` - file system paths (canonicalize + fallback)
//! - `resolve_path` - resolve relative paths against a base directory
//! - `expand_tilde` - `~/...` expansion for user-supplied directories

use std::path::{Path, PathBuf};

/// Normalize a file system path to absolute form.
///
/// Tries `canonicalize()` first (resolves symlinks, `.`, `..`).
/// Falls back to:
/// - Return as-is if already absolute
/// - Join with current directory if relative
///
/// Script identities are derived from this, so two spellings of the same
/// file map to the same key as long as the file exists.
#[inline]
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}

/// Resolve a path relative to `base` unless it is already absolute.
#[inline]
pub fn resolve_path(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Expand a leading `~` to the home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(raw) => PathBuf::from(shellexpand::tilde(raw).into_owned()),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_absolute() {
        let path = Path::new("/absolute/path/file.lua");
        let normalized = normalize_path(path);
        assert!(normalized.is_absolute());
    }

    #[test]
    fn test_normalize_path_relative() {
        let path = Path::new("relative/path/file.lua");
        let normalized = normalize_path(path);
        assert!(normalized.is_absolute());
    }

    #[test]
    fn test_normalize_path_existing_file_is_stable() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("a.lua");
        std::fs::write(&file, "return 1").unwrap();

        let dotted = dir.path().join(".").join("a.lua");
        assert_eq!(normalize_path(&file), normalize_path(&dotted));
    }

    #[test]
    fn test_resolve_path() {
        assert_eq!(
            resolve_path(Path::new("/abs/dir"), Path::new("/root")),
            PathBuf::from("/abs/dir")
        );
        assert_eq!(
            resolve_path(Path::new("scripts"), Path::new("/root")),
            PathBuf::from("/root/scripts")
        );
    }

    #[test]
    fn test_expand_tilde_passthrough() {
        assert_eq!(
            expand_tilde(Path::new("/var/backup")),
            PathBuf::from("/var/backup")
        );
        assert!(!expand_tilde(Path::new("~/backup")).starts_with("~"));
    }
}
