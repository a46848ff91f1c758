//! Hot reload orchestration.
//!
//! # Architecture
//!
//! ```text
//! ChangeWatcher ──► forwarder ──► Debouncer ──► actor ──► process(id) per change
//!   (notify)       (mark state)   (per file)    (spawn)       │
//!                                                             ▼
//!             backup ─► compile (blocking pool) ─┬─► install ─► clear backup
//!                                                └─► rollback: cache ─► backup ─► unavailable
//! ```
//!
//! One orchestrator owns one [`VersionedCache`] and one [`BackupManager`].
//! At most one reload per script is in flight; a change that settles while
//! its script compiles triggers exactly one more reload afterwards.
//!
//! # Modules
//!
//! - `compile` - pipeline execution on the blocking pool
//! - `error` - `ReloadError`
//! - `events` - broadcast events
//! - `flow` - one reload attempt, start to finish
//! - `notification` - notification sinks
//! - `rollback` - two-tier recovery
//! - `state` - per-script state and in-flight registry
//! - `stats` - counters and timings

mod compile;
mod error;
mod events;
mod flow;
mod notification;
mod rollback;
mod state;
mod stats;


use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::backup::{BackupManager, BackupStore, FileBackupStore, MemoryBackupStore};
use crate::cache::{DEFAULT_RETAIN, VersionEntry, VersionedCache};
use crate::config::ReloadConfig;
use crate::core::{Instance, Module, ScriptIdentity};
use crate::debounce::{DebounceSettings, Debouncer};
use crate::pipeline::{CommandPipeline, CompilationPipeline, SourcePipeline};
use crate::utils::glob::Glob;
use crate::watch::{ChangeWatcher, NotifyWatcher, WatchEvent};
use crate::{debug, log};

pub use error::ReloadError;
pub use events::{ReloadEvent, RollbackTier};
pub use notification::{LogSink, Notification, NotificationKind, NotificationSink, RecordingSink};
pub use state::ReloadState;
pub use stats::{HotReloadStatistics, ScriptStatistics};

use events::EVENT_CAPACITY;
use state::Registry;
use stats::StatsRecorder;

/// Builds a live instance from a freshly compiled module.
pub trait Instantiator: Send + Sync + 'static {
    fn instantiate(&self, id: &ScriptIdentity, module: &Module) -> anyhow::Result<Instance>;
}

impl<F> Instantiator for F
where
    F: Fn(&ScriptIdentity, &Module) -> anyhow::Result<Instance> + Send + Sync + 'static,
{
    fn instantiate(&self, id: &ScriptIdentity, module: &Module) -> anyhow::Result<Instance> {
        self(id, module)
    }
}

/// Runtime knobs of the orchestrator.
#[derive(Debug, Clone)]
pub struct ReloadSettings {
    /// File-name pattern of watched scripts.
    pub pattern: Glob,
    pub debounce: DebounceSettings,
    /// `None` waits for the pipeline indefinitely.
    pub compile_timeout: Option<Duration>,
    /// Versions kept per script in the cache.
    pub retain: usize,
    /// Let success and info notifications disappear on their own.
    pub auto_dismiss: bool,
}

impl Default for ReloadSettings {
    fn default() -> Self {
        Self {
            pattern: Glob::default(),
            debounce: DebounceSettings::default(),
            compile_timeout: None,
            retain: DEFAULT_RETAIN,
            auto_dismiss: true,
        }
    }
}

/// Result of one processed change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// The new module is active at `version`.
    Installed { version: u64 },
    /// The attempt failed and `version` stays (or became) active.
    RolledBack {
        version: u64,
        tier: RollbackTier,
        emergency: bool,
    },
    /// The attempt failed and no previous version exists.
    RollbackUnavailable { emergency: bool },
    /// A reload for this script was in flight; it reruns once it finishes.
    Deferred,
}

/// State shared by the orchestrator and its tasks.
pub(crate) struct Shared {
    pipeline: Arc<dyn CompilationPipeline>,
    cache: VersionedCache,
    backups: BackupManager,
    registry: Registry,
    stats: StatsRecorder,
    events: broadcast::Sender<ReloadEvent>,
    sink: Arc<dyn NotificationSink>,
    instantiator: Option<Arc<dyn Instantiator>>,
    settings: ReloadSettings,
}

impl Shared {
    fn emit(&self, event: ReloadEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn notify(&self, kind: NotificationKind, message: &str, details: Option<&str>) {
        let auto_dismiss = self.settings.auto_dismiss
            && matches!(kind, NotificationKind::Success | NotificationKind::Info);
        self.sink.show(kind, message, details, auto_dismiss);
    }

    fn instantiate(
        &self,
        id: &ScriptIdentity,
        module: &Module,
    ) -> Result<Option<Instance>, ReloadError> {
        let Some(instantiator) = &self.instantiator else {
            return Ok(None);
        };
        instantiator
            .instantiate(id, module)
            .map(Some)
            .map_err(|e| ReloadError::unexpected(id, format!("instantiation failed: {e:#}")))
    }
}

struct WatchTasks {
    dir: PathBuf,
    debouncer: Arc<Debouncer>,
    forwarder: JoinHandle<()>,
    actor: JoinHandle<()>,
}

/// Assembles a [`HotReloadOrchestrator`].
pub struct OrchestratorBuilder {
    pipeline: Arc<dyn CompilationPipeline>,
    settings: ReloadSettings,
    store: Option<Arc<dyn BackupStore>>,
    sink: Option<Arc<dyn NotificationSink>>,
    instantiator: Option<Arc<dyn Instantiator>>,
    watcher: Option<Box<dyn ChangeWatcher>>,
}

impl OrchestratorBuilder {
    pub fn with_settings(mut self, settings: ReloadSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Durable backup store. Defaults to an in-memory store.
    pub fn with_backup_store(mut self, store: Arc<dyn BackupStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Notification sink. Defaults to [`LogSink`].
    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_instantiator(mut self, instantiator: Arc<dyn Instantiator>) -> Self {
        self.instantiator = Some(instantiator);
        self
    }

    /// Change watcher. Defaults to [`NotifyWatcher`].
    pub fn with_watcher(mut self, watcher: Box<dyn ChangeWatcher>) -> Self {
        self.watcher = Some(watcher);
        self
    }

    pub fn build(self) -> HotReloadOrchestrator {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryBackupStore::new()));
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let shared = Shared {
            pipeline: self.pipeline,
            cache: VersionedCache::new(self.settings.retain),
            backups: BackupManager::new(store),
            registry: Registry::default(),
            stats: StatsRecorder::default(),
            events,
            sink: self.sink.unwrap_or_else(|| Arc::new(LogSink)),
            instantiator: self.instantiator,
            settings: self.settings,
        };

        HotReloadOrchestrator {
            shared: Arc::new(shared),
            watcher: Mutex::new(
                self.watcher
                    .unwrap_or_else(|| Box::new(NotifyWatcher::new())),
            ),
            watching: Mutex::new(None),
        }
    }
}

/// Watches scripts, recompiles them on change and swaps them in atomically.
pub struct HotReloadOrchestrator {
    shared: Arc<Shared>,
    watcher: Mutex<Box<dyn ChangeWatcher>>,
    watching: Mutex<Option<WatchTasks>>,
}

impl HotReloadOrchestrator {
    pub fn builder(pipeline: Arc<dyn CompilationPipeline>) -> OrchestratorBuilder {
        OrchestratorBuilder {
            pipeline,
            settings: ReloadSettings::default(),
            store: None,
            sink: None,
            instantiator: None,
            watcher: None,
        }
    }

    pub fn new(pipeline: Arc<dyn CompilationPipeline>, settings: ReloadSettings) -> Self {
        Self::builder(pipeline).with_settings(settings).build()
    }

    /// Orchestrator for a `scriptswap.toml`: command or source pipeline,
    /// file or memory backups, terminal notifications, OS watcher.
    pub fn from_config(config: &ReloadConfig) -> Result<Self, ReloadError> {
        let settings = config.settings()?;

        let pipeline: Arc<dyn CompilationPipeline> = if config.compile.command.is_empty() {
            Arc::new(SourcePipeline)
        } else {
            Arc::new(CommandPipeline::new(config.compile.command.clone()).with_cwd(config.root()))
        };

        let store: Arc<dyn BackupStore> = if config.backup.enabled {
            Arc::new(FileBackupStore::new(config.backup_dir()))
        } else {
            Arc::new(MemoryBackupStore::new())
        };

        Ok(Self::builder(pipeline)
            .with_settings(settings)
            .with_backup_store(store)
            .build())
    }

    // ========================================================================
    // watching
    // ========================================================================

    /// Start watching `dir` recursively. Replaces any previous watch.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_watching(&self, dir: &Path) -> Result<(), ReloadError> {
        self.stop_watching();

        let shared = &self.shared;
        let (watch_tx, watch_rx) = mpsc::unbounded_channel();
        self.watcher
            .lock()
            .start(dir, &shared.settings.pattern, watch_tx)?;

        let (settled_tx, settled_rx) = mpsc::unbounded_channel();
        let debouncer = Arc::new(Debouncer::new(
            shared.settings.debounce,
            settled_tx,
            shared.stats.debounced_counter(),
        ));

        let forwarder = tokio::spawn(forward(
            Arc::clone(shared),
            Arc::clone(&debouncer),
            watch_rx,
        ));
        let actor = tokio::spawn(run_actor(Arc::clone(shared), settled_rx));

        log!("watch"; "watching {} ({})", dir.display(), shared.settings.pattern.as_str());
        *self.watching.lock() = Some(WatchTasks {
            dir: dir.to_path_buf(),
            debouncer,
            forwarder,
            actor,
        });
        Ok(())
    }

    /// Stop watching. Pending debounce timers are cancelled; reloads already
    /// compiling run to completion.
    pub fn stop_watching(&self) {
        self.watcher.lock().stop();
        let Some(tasks) = self.watching.lock().take() else {
            return;
        };
        tasks.debouncer.shutdown();
        tasks.forwarder.abort();
        tasks.actor.abort();
        debug!("watch"; "stopped watching {}", tasks.dir.display());
    }

    pub fn is_watching(&self) -> bool {
        self.watching.lock().is_some()
    }

    // ========================================================================
    // operations
    // ========================================================================

    /// Reload the script at `path` now, bypassing the watcher.
    pub async fn reload(&self, path: &Path) -> ReloadOutcome {
        flow::process(Arc::clone(&self.shared), ScriptIdentity::from_path(path)).await
    }

    /// Step `id` back to its previous retained version.
    pub fn revert(&self, id: &ScriptIdentity) -> Result<u64, ReloadError> {
        rollback::revert(&self.shared, id)
    }

    /// Install every durable backup whose script has no version yet.
    ///
    /// Returns how many scripts were restored.
    pub async fn restore_from_backups(&self) -> Result<usize, ReloadError> {
        rollback::restore_all(&self.shared).await
    }

    // ========================================================================
    // queries
    // ========================================================================

    pub fn current_module(&self, id: &ScriptIdentity) -> Option<Arc<Module>> {
        self.shared.cache.get_current(id).map(|e| Arc::clone(&e.module))
    }

    pub fn current_version(&self, id: &ScriptIdentity) -> Option<u64> {
        self.shared.cache.get_version(id)
    }

    pub fn current_instance(&self, id: &ScriptIdentity) -> Option<Instance> {
        self.shared.cache.get_current(id).and_then(|e| e.instance.clone())
    }

    /// The full current entry (module, instance, version).
    pub fn current_entry(&self, id: &ScriptIdentity) -> Option<Arc<VersionEntry>> {
        self.shared.cache.get_current(id)
    }

    pub fn state(&self, id: &ScriptIdentity) -> ReloadState {
        self.shared.registry.state(id)
    }

    /// Every script seen so far, sorted by path.
    pub fn identities(&self) -> Vec<ScriptIdentity> {
        self.shared.registry.identities()
    }

    pub fn statistics(&self) -> HotReloadStatistics {
        self.shared.stats.snapshot()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
        self.shared.events.subscribe()
    }

    pub fn settings(&self) -> &ReloadSettings {
        &self.shared.settings
    }
}

impl Drop for HotReloadOrchestrator {
    fn drop(&mut self) {
        self.stop_watching();
    }
}

/// Watch events -> debouncer, errors -> notifications.
async fn forward(
    shared: Arc<Shared>,
    debouncer: Arc<Debouncer>,
    mut rx: mpsc::UnboundedReceiver<WatchEvent>,
) {
    while let Some(event) = rx.recv().await {
        match event {
            WatchEvent::Changed(path) => {
                shared
                    .registry
                    .mark_debouncing(&ScriptIdentity::from_path(&path));
                debouncer.on_change(path);
            }
            WatchEvent::Error { error, critical } => {
                let err = ReloadError::Watcher {
                    message: error,
                    critical,
                };
                log!("watch"; "{}", err);
                if critical {
                    shared.notify(
                        NotificationKind::Error,
                        "file watching failed; active versions stay loaded",
                        Some(&err.to_string()),
                    );
                } else {
                    shared.notify(NotificationKind::Warning, &err.to_string(), None);
                }
            }
        }
    }
}

/// Settled paths -> one reload task each.
async fn run_actor(shared: Arc<Shared>, mut settled_rx: mpsc::UnboundedReceiver<PathBuf>) {
    while let Some(path) = settled_rx.recv().await {
        let id = ScriptIdentity::from_path(&path);
        tokio::spawn(flow::process(Arc::clone(&shared), id));
    }
}
