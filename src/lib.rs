//! scriptswap - live script hot reload.
//!
//! Watches script files, recompiles them through a [`CompilationPipeline`]
//! when they settle after an edit, and atomically swaps the new module in.
//! A failed compile never takes a script down: the previous version stays
//! active, from the in-memory [`VersionedCache`] or, after a restart, from a
//! durable backup.
//!
//! ```ignore
//! let orchestrator = HotReloadOrchestrator::builder(Arc::new(SourcePipeline))
//!     .with_backup_store(Arc::new(FileBackupStore::new(".scriptswap/backup")))
//!     .build();
//! orchestrator.restore_from_backups().await?;
//! orchestrator.start_watching(Path::new("scripts"))?;
//! ```
//!
//! [`CompilationPipeline`]: pipeline::CompilationPipeline
//! [`VersionedCache`]: cache::VersionedCache

pub mod backup;
pub mod cache;
pub mod cli;
pub mod config;
pub mod core;
pub mod debounce;
pub mod logger;
pub mod pipeline;
pub mod reload;
pub mod utils;
pub mod watch;

pub use reload::{
    HotReloadOrchestrator, HotReloadStatistics, OrchestratorBuilder, ReloadError, ReloadEvent,
    ReloadOutcome, ReloadSettings, ReloadState,
};
