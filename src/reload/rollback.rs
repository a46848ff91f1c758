//! Recovery after a failed reload.
//!
//! Tier 1 re-pins the version that was current before the attempt, straight
//! from the in-memory cache. Tier 2 reinstalls the durable backup at its
//! recorded version; it is what saves a script whose history was lost, for
//! example across a restart. Neither rollback ever recompiles.

use std::sync::Arc;

use super::error::{ReloadError, error_chain};
use super::{NotificationKind, ReloadEvent, ReloadOutcome, ReloadState, RollbackTier, Shared};
use crate::core::{Module, ScriptIdentity};
use crate::utils::plural::plural_count;
use crate::{debug, log};

struct Restored {
    version: u64,
    module: Arc<Module>,
    tier: RollbackTier,
}

/// Roll `id` back after a failed attempt and report the outcome.
///
/// `previous` is the version that was current when the attempt started.
pub(super) async fn recover(
    shared: &Shared,
    id: &ScriptIdentity,
    previous: Option<u64>,
    details: &str,
    emergency: bool,
) -> ReloadOutcome {
    if emergency {
        shared.stats.record_emergency(id);
    }

    let restored = match restore(shared, id, previous).await {
        Ok(restored) => restored,
        Err(err) => {
            shared.stats.record_unavailable();
            shared.registry.set_state(id, ReloadState::Failed);
            log!("rollback"; "{}", err);
            shared.notify(
                NotificationKind::Error,
                &format!("{}: reload failed and no backup exists", id.name()),
                Some(details),
            );
            return ReloadOutcome::RollbackUnavailable { emergency };
        }
    };

    shared.stats.record_rollback(id);
    shared.registry.set_state(id, ReloadState::ActiveRestored);
    shared.emit(ReloadEvent::RolledBack {
        identity: id.clone(),
        module: restored.module,
        version: restored.version,
        tier: restored.tier,
        emergency,
    });

    let (kind, message) = if emergency {
        (
            NotificationKind::Error,
            format!(
                "{}: emergency rollback, v{} restored from {}",
                id.name(),
                restored.version,
                restored.tier.label()
            ),
        )
    } else {
        (
            NotificationKind::Warning,
            format!(
                "{}: compile failed, v{} remains active",
                id.name(),
                restored.version
            ),
        )
    };
    shared.notify(kind, &message, Some(details));

    ReloadOutcome::RolledBack {
        version: restored.version,
        tier: restored.tier,
        emergency,
    }
}

async fn restore(
    shared: &Shared,
    id: &ScriptIdentity,
    previous: Option<u64>,
) -> Result<Restored, ReloadError> {
    if let Some(version) = previous
        && let Some(entry) = shared.cache.rollback_to(id, version)
    {
        debug!("rollback"; "{} pinned v{} from cache", id.name(), version);
        return Ok(Restored {
            version: entry.version,
            module: Arc::clone(&entry.module),
            tier: RollbackTier::Cache,
        });
    }

    let snapshot = match shared.backups.restore_backup(id).await {
        Ok(Some(snapshot)) => snapshot,
        Ok(None) => return Err(ReloadError::RollbackUnavailable(id.clone())),
        Err(e) => {
            log!("backup"; "cannot read backup for {}: {}", id.name(), error_chain(&e));
            return Err(ReloadError::RollbackUnavailable(id.clone()));
        }
    };

    let instance = match snapshot.instance.clone() {
        Some(instance) => Some(instance),
        None => shared.instantiate(id, &snapshot.module).unwrap_or_else(|e| {
            log!("rollback"; "{}", e);
            None
        }),
    };
    let version = shared.cache.update_version(
        id,
        Arc::clone(&snapshot.module),
        instance,
        Some(snapshot.version),
    );
    debug!("rollback"; "{} reinstalled v{} from backup", id.name(), version);

    Ok(Restored {
        version,
        module: snapshot.module,
        tier: RollbackTier::Backup,
    })
}

/// Operator rollback: step `id` back one retained version.
pub(super) fn revert(shared: &Shared, id: &ScriptIdentity) -> Result<u64, ReloadError> {
    if !shared.cache.rollback(id) {
        return Err(ReloadError::RollbackUnavailable(id.clone()));
    }
    let entry = shared
        .cache
        .get_current(id)
        .ok_or_else(|| ReloadError::RollbackUnavailable(id.clone()))?;

    shared.stats.record_rollback(id);
    shared.registry.set_state(id, ReloadState::ActiveRestored);
    shared.emit(ReloadEvent::RolledBack {
        identity: id.clone(),
        module: Arc::clone(&entry.module),
        version: entry.version,
        tier: RollbackTier::Cache,
        emergency: false,
    });
    shared.notify(
        NotificationKind::Warning,
        &format!("{}: reverted to v{}", id.name(), entry.version),
        None,
    );
    Ok(entry.version)
}

/// Install each durable backup whose script has no version in the cache.
pub(super) async fn restore_all(shared: &Shared) -> Result<usize, ReloadError> {
    let mut restored = 0;

    for (id, snapshot) in shared.backups.list().await? {
        if shared.cache.get_version(&id).is_some() {
            continue;
        }
        let instance = match snapshot.instance {
            Some(instance) => Some(instance),
            None => match shared.instantiate(&id, &snapshot.module) {
                Ok(instance) => instance,
                Err(e) => {
                    log!("backup"; "skipping {}: {}", id.name(), e);
                    continue;
                }
            },
        };
        shared
            .cache
            .update_version(&id, snapshot.module, instance, Some(snapshot.version));
        shared.registry.set_state(&id, ReloadState::ActiveRestored);
        debug!("backup"; "restored {} v{}", id.name(), snapshot.version);
        restored += 1;
    }

    if restored > 0 {
        shared.notify(
            NotificationKind::Info,
            &format!("restored {} from backup", plural_count(restored, "script")),
            None,
        );
    }
    Ok(restored)
}
