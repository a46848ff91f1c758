//! Durable key-value stores for backup snapshots.
//!
//! One slot per script, keyed by [`ScriptIdentity::key`]. `put` overwrites.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::BackupError;
use crate::core::{Module, ScriptIdentity};
use crate::debug;

/// Snapshot file extension
const SNAPSHOT_EXT: &str = "json";

/// What a store persists for one script. Instances are never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSnapshot {
    pub identity: ScriptIdentity,
    pub module: Module,
    pub version: u64,
    pub persisted_at: SystemTime,
}

/// Durable single-slot-per-script storage.
///
/// Calls are blocking; `BackupManager` moves them onto the blocking pool.
pub trait BackupStore: Send + Sync + 'static {
    fn put(&self, snapshot: &StoredSnapshot) -> Result<(), BackupError>;

    fn get(&self, id: &ScriptIdentity) -> Result<Option<StoredSnapshot>, BackupError>;

    /// Deleting a missing slot is not an error.
    fn delete(&self, id: &ScriptIdentity) -> Result<(), BackupError>;

    fn list(&self) -> Result<Vec<StoredSnapshot>, BackupError>;
}

// ============================================================================
// File store
// ============================================================================

/// One JSON file per script under `dir`, written via temp file and rename.
#[derive(Debug, Clone)]
pub struct FileBackupStore {
    dir: PathBuf,
}

impl FileBackupStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &ScriptIdentity) -> PathBuf {
        self.dir.join(format!("{}.{SNAPSHOT_EXT}", id.key()))
    }

    fn read(path: &Path) -> Result<Option<StoredSnapshot>, BackupError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(BackupError::io(path, e)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| BackupError::Corrupt(path.to_path_buf(), e))
    }
}

impl BackupStore for FileBackupStore {
    fn put(&self, snapshot: &StoredSnapshot) -> Result<(), BackupError> {
        fs::create_dir_all(&self.dir).map_err(|e| BackupError::io(&self.dir, e))?;

        let path = self.path_for(&snapshot.identity);
        let tmp = path.with_extension("tmp");
        let json = serde_json::to_vec_pretty(snapshot).map_err(BackupError::Encode)?;

        fs::write(&tmp, json).map_err(|e| BackupError::io(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            BackupError::io(&path, e)
        })
    }

    fn get(&self, id: &ScriptIdentity) -> Result<Option<StoredSnapshot>, BackupError> {
        Self::read(&self.path_for(id))
    }

    fn delete(&self, id: &ScriptIdentity) -> Result<(), BackupError> {
        let path = self.path_for(id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BackupError::io(&path, e)),
        }
    }

    fn list(&self) -> Result<Vec<StoredSnapshot>, BackupError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(BackupError::io(&self.dir, e)),
        };

        let mut snapshots = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != SNAPSHOT_EXT) {
                continue;
            }
            // A corrupt slot must not hide the others.
            match Self::read(&path) {
                Ok(Some(snapshot)) => snapshots.push(snapshot),
                Ok(None) => {}
                Err(e) => debug!("backup"; "skipping {}: {}", path.display(), e),
            }
        }
        snapshots.sort_by(|a, b| a.identity.cmp(&b.identity));
        Ok(snapshots)
    }
}

// ============================================================================
// Memory store
// ============================================================================

/// Process-local store, used when durable backups are disabled and in tests.
#[derive(Debug, Default)]
pub struct MemoryBackupStore {
    slots: Mutex<FxHashMap<ScriptIdentity, StoredSnapshot>>,
}

impl MemoryBackupStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BackupStore for MemoryBackupStore {
    fn put(&self, snapshot: &StoredSnapshot) -> Result<(), BackupError> {
        self.slots
            .lock()
            .insert(snapshot.identity.clone(), snapshot.clone());
        Ok(())
    }

    fn get(&self, id: &ScriptIdentity) -> Result<Option<StoredSnapshot>, BackupError> {
        Ok(self.slots.lock().get(id).cloned())
    }

    fn delete(&self, id: &ScriptIdentity) -> Result<(), BackupError> {
        self.slots.lock().remove(id);
        Ok(())
    }

    fn list(&self) -> Result<Vec<StoredSnapshot>, BackupError> {
        let mut snapshots: Vec<_> = self.slots.lock().values().cloned().collect();
        snapshots.sort_by(|a, b| a.identity.cmp(&b.identity));
        Ok(snapshots)
    }
}
