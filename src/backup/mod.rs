//! Last-known-good backups that survive a restart.
//!
//! Before every compile attempt the orchestrator snapshots the script's
//! current version here; the slot is cleared once a strictly newer version
//! is active. When the in-memory cache has nothing to roll back to (for
//! example after a restart) the snapshot is the second line of defence.
//!
//! Store I/O runs on tokio's blocking pool. Instances cannot be persisted,
//! so they live in a process-local side map and are `None` after a restart.

mod store;


use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use dashmap::DashMap;
use thiserror::Error;

use crate::core::{Instance, Module, ScriptIdentity};
use crate::debug;

pub use store::{BackupStore, FileBackupStore, MemoryBackupStore, StoredSnapshot};

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("backup I/O failed at `{path}`")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("corrupt backup `{0}`")]
    Corrupt(PathBuf, #[source] serde_json::Error),

    #[error("failed to encode backup")]
    Encode(#[source] serde_json::Error),

    #[error("backup task failed: {0}")]
    Task(String),
}

impl BackupError {
    pub fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A restored backup slot.
#[derive(Clone)]
pub struct BackupSnapshot {
    pub module: Arc<Module>,
    pub instance: Option<Instance>,
    pub version: u64,
    pub persisted_at: SystemTime,
}

impl std::fmt::Debug for BackupSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackupSnapshot")
            .field("module", &self.module)
            .field("instance", &self.instance.is_some())
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

/// Async front of a [`BackupStore`].
pub struct BackupManager {
    store: Arc<dyn BackupStore>,
    instances: DashMap<ScriptIdentity, Instance>,
}

impl BackupManager {
    pub fn new(store: Arc<dyn BackupStore>) -> Self {
        Self {
            store,
            instances: DashMap::new(),
        }
    }

    /// Overwrite the slot for `id` with the given version.
    pub async fn create_backup(
        &self,
        id: &ScriptIdentity,
        module: Arc<Module>,
        instance: Option<Instance>,
        version: u64,
    ) -> Result<(), BackupError> {
        let snapshot = StoredSnapshot {
            identity: id.clone(),
            module: Module::clone(&module),
            version,
            persisted_at: SystemTime::now(),
        };
        self.blocking(move |store| store.put(&snapshot)).await?;

        match instance {
            Some(instance) => self.instances.insert(id.clone(), instance),
            None => self.instances.remove(id).map(|(_, i)| i),
        };
        debug!("backup"; "saved {} v{}", id.name(), version);
        Ok(())
    }

    /// Read the slot for `id`.
    pub async fn restore_backup(
        &self,
        id: &ScriptIdentity,
    ) -> Result<Option<BackupSnapshot>, BackupError> {
        let key = id.clone();
        let stored = self.blocking(move |store| store.get(&key)).await?;
        Ok(stored.map(|s| self.snapshot_from(s)))
    }

    /// Drop the slot for `id`.
    pub async fn clear_backup(&self, id: &ScriptIdentity) -> Result<(), BackupError> {
        let key = id.clone();
        self.blocking(move |store| store.delete(&key)).await?;
        self.instances.remove(id);
        debug!("backup"; "cleared {}", id.name());
        Ok(())
    }

    /// Every persisted slot, for startup recovery.
    pub async fn list(&self) -> Result<Vec<(ScriptIdentity, BackupSnapshot)>, BackupError> {
        let stored = self.blocking(|store| store.list()).await?;
        Ok(stored
            .into_iter()
            .map(|s| (s.identity.clone(), self.snapshot_from(s)))
            .collect())
    }

    fn snapshot_from(&self, stored: StoredSnapshot) -> BackupSnapshot {
        BackupSnapshot {
            instance: self.instances.get(&stored.identity).map(|i| Arc::clone(&i)),
            module: Arc::new(stored.module),
            version: stored.version,
            persisted_at: stored.persisted_at,
        }
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, BackupError>
    where
        F: FnOnce(&dyn BackupStore) -> Result<T, BackupError> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(store.as_ref()))
            .await
            .map_err(|e| BackupError::Task(e.to_string()))?
    }
}
