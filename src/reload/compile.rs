//! Run a pipeline off the async runtime.
//!
//! The compile happens on tokio's blocking pool; no lock is held while it
//! runs. A pipeline panic is caught by the join handle and reported as an
//! unexpected failure. A timeout is an ordinary compile failure; the blocking
//! task cannot be cancelled, so it is parked in the registry and the script
//! stays claimed until it exits.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use super::error::{ReloadError, error_chain};
use super::state::Registry;
use crate::core::ScriptIdentity;
use crate::pipeline::{CompilationPipeline, CompilationResult};

pub(super) async fn run_pipeline(
    pipeline: Arc<dyn CompilationPipeline>,
    registry: &Registry,
    id: &ScriptIdentity,
    timeout: Option<Duration>,
) -> Result<CompilationResult, ReloadError> {
    let path = id.path().to_path_buf();
    let mut task = tokio::task::spawn_blocking(move || pipeline.compile(&path));

    let joined = match timeout {
        Some(limit) => match tokio::time::timeout(limit, &mut task).await {
            Ok(joined) => joined,
            Err(_) => {
                registry.park_stray(id, task);
                return Ok(CompilationResult::failed_with_errors(vec![format!(
                    "compilation timed out after {}ms",
                    limit.as_millis()
                )]));
            }
        },
        None => task.await,
    };

    match joined {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(err)) => Err(ReloadError::unexpected(id, error_chain(&err))),
        Err(join) if join.is_panic() => Err(ReloadError::unexpected(
            id,
            format!("pipeline panicked: {}", panic_message(join.into_panic())),
        )),
        Err(join) => Err(ReloadError::unexpected(id, join.to_string())),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
