//! One reload, from settled change to installed module or rollback.

use std::sync::Arc;
use std::time::Instant;

use super::compile::run_pipeline;
use super::error::{ReloadError, error_chain};
use super::rollback::recover;
use super::state::StrayCompile;
use super::{NotificationKind, ReloadEvent, ReloadOutcome, ReloadState, Shared};
use crate::cache::VersionEntry;
use crate::core::ScriptIdentity;
use crate::pipeline::CompilationResult;
use crate::{debug, log};

/// Reload `id`, or defer if a reload for it is already in flight.
///
/// Deferred changes coalesce: however many arrive during one compile, the
/// script is reloaded exactly once more afterwards.
pub(super) async fn process(shared: Arc<Shared>, id: ScriptIdentity) -> ReloadOutcome {
    if !shared.registry.begin(&id) {
        debug!("reload"; "{} is compiling, queued one more pass", id.name());
        return ReloadOutcome::Deferred;
    }

    loop {
        let outcome = reload_once(&shared, &id).await;
        if let Some(stray) = shared.registry.take_stray(&id) {
            tokio::spawn(release_after_stray(shared, id, stray));
            return outcome;
        }
        if !shared.registry.finish(&id) {
            return outcome;
        }
        debug!("reload"; "{} changed during compile, reloading again", id.name());
    }
}

/// Hold the claim on `id` until a timed-out compile exits, then run the
/// queued rerun, if any.
async fn release_after_stray(shared: Arc<Shared>, id: ScriptIdentity, mut stray: StrayCompile) {
    loop {
        let _ = stray.await;
        debug!("reload"; "timed-out compile of {} exited", id.name());
        loop {
            if !shared.registry.finish(&id) {
                return;
            }
            reload_once(&shared, &id).await;
            if let Some(next) = shared.registry.take_stray(&id) {
                stray = next;
                break;
            }
        }
    }
}

async fn reload_once(shared: &Shared, id: &ScriptIdentity) -> ReloadOutcome {
    let started = Instant::now();
    shared.registry.set_state(id, ReloadState::Compiling);
    shared.stats.record_attempt(id);

    let previous = shared.cache.get_current(id);

    let failure = match attempt(shared, id, previous.as_ref()).await {
        Ok(version) => {
            shared.stats.record_success(id, started.elapsed());
            return ReloadOutcome::Installed { version };
        }
        Err(failure) => failure,
    };
    shared.stats.record_failure(id, started.elapsed());

    let emergency = failure.error.is_emergency();
    if emergency {
        log!("error"; "{}", error_chain(&failure.error));
        // Compile failures publish their own result; synthesize one here.
        shared.emit(ReloadEvent::Failed {
            identity: id.clone(),
            result: Arc::new(CompilationResult::failed_with_errors(vec![
                failure.error.to_string(),
            ])),
        });
    }

    shared.registry.set_state(id, ReloadState::RollingBack);
    let details = failure
        .details
        .unwrap_or_else(|| error_chain(&failure.error));
    recover(
        shared,
        id,
        previous.map(|entry| entry.version),
        &details,
        emergency,
    )
    .await
}

struct Failure {
    error: ReloadError,
    /// Diagnostics summary for the notification.
    details: Option<String>,
}

impl From<ReloadError> for Failure {
    fn from(error: ReloadError) -> Self {
        Self {
            error,
            details: None,
        }
    }
}

/// Backup, compile, install. Returns the installed version.
async fn attempt(
    shared: &Shared,
    id: &ScriptIdentity,
    previous: Option<&Arc<VersionEntry>>,
) -> Result<u64, Failure> {
    if let Some(entry) = previous {
        shared
            .backups
            .create_backup(
                id,
                Arc::clone(&entry.module),
                entry.instance.clone(),
                entry.version,
            )
            .await
            .map_err(ReloadError::from)?;
    }

    let compile_started = Instant::now();
    let result = run_pipeline(
        Arc::clone(&shared.pipeline),
        &shared.registry,
        id,
        shared.settings.compile_timeout,
    )
    .await;
    shared.stats.record_compile_time(id, compile_started.elapsed());
    let mut result = result?;

    let Some(module) = result.module.take().filter(|_| result.success) else {
        if result.success {
            result
                .errors
                .push("pipeline reported success without a module".to_string());
            result.success = false;
        }
        let errors = result.error_count();
        let details = result.summary();
        shared.emit(ReloadEvent::Failed {
            identity: id.clone(),
            result: Arc::new(result),
        });
        return Err(Failure {
            error: ReloadError::Compilation(id.clone(), errors),
            details: Some(details),
        });
    };

    let module = Arc::new(module);
    let instance = shared.instantiate(id, &module)?;
    let version = shared
        .cache
        .update_version(id, Arc::clone(&module), instance, None);

    // Anything older than `version` is now redundant.
    if let Err(e) = shared.backups.clear_backup(id).await {
        log!("backup"; "failed to clear backup for {}: {}", id.name(), error_chain(&e));
    }

    shared.registry.set_state(id, ReloadState::Active);
    shared.emit(ReloadEvent::Succeeded {
        identity: id.clone(),
        module,
        version,
    });

    let warnings: Vec<String> = result.warnings().map(ToString::to_string).collect();
    let details = (!warnings.is_empty()).then(|| warnings.join("\n"));
    shared.notify(
        NotificationKind::Success,
        &format!("reloaded {} (v{})", id.name(), version),
        details.as_deref(),
    );
    debug!("reload"; "{} v{} in {:?}", id.name(), version, compile_started.elapsed());

    Ok(version)
}
