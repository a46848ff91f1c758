//! Stable identity of one hot-reloadable script.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::utils::hash::content_hash;
use crate::utils::path::normalize_path;

/// Key of one hot-reloadable unit, derived from its file path.
///
/// Two spellings of the same existing file (`./a.lua`, `/abs/a.lua`) produce
/// the same identity. Cloning is cheap.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScriptIdentity(Arc<Path>);

impl ScriptIdentity {
    /// Derive the identity of the script at `path`.
    pub fn from_path(path: &Path) -> Self {
        Self(Arc::from(normalize_path(path)))
    }

    /// The normalized absolute path backing this identity.
    pub fn path(&self) -> &Path {
        &self.0
    }

    /// File name for display; falls back to the full path.
    pub fn name(&self) -> String {
        self.0
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.0.display().to_string())
    }

    /// Stable storage key (blake3 of the normalized path).
    ///
    /// Safe to use as a file name on every platform.
    pub fn key(&self) -> String {
        content_hash(self.0.to_string_lossy().as_bytes())
    }
}

impl From<&Path> for ScriptIdentity {
    fn from(path: &Path) -> Self {
        Self::from_path(path)
    }
}

impl From<PathBuf> for ScriptIdentity {
    fn from(path: PathBuf) -> Self {
        Self::from_path(&path)
    }
}

impl Serialize for ScriptIdentity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

/// Persisted identities are trusted as already normalized.
impl<'de> Deserialize<'de> for ScriptIdentity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        PathBuf::deserialize(deserializer).map(|path| Self(Arc::from(path)))
    }
}

impl fmt::Display for ScriptIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}
