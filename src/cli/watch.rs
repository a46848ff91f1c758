//! `watch` command: initial compile, then hot reload until Ctrl+C.
//!
//! Order matters: durable backups are restored first, every matching script
//! is then compiled once, and only then does the watcher start. A script that
//! fails its initial compile but has a backup comes up on the backup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use crossbeam::channel::{Receiver, TryRecvError};
use jwalk::WalkDir;

use crate::config::ReloadConfig;
use crate::core::{is_shutdown, register_shutdown};
use crate::reload::{HotReloadOrchestrator, ReloadOutcome};
use crate::utils::glob::Glob;
use crate::utils::plural::plural_count;
use crate::watch::is_temp_file;
use crate::{debug, log};

/// Poll interval of the shutdown channel.
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

pub fn watch_scripts(config: &ReloadConfig) -> Result<()> {
    let dir = config.watch_dir();
    if !dir.is_dir() {
        bail!("watched directory `{}` does not exist", dir.display());
    }

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    let (shutdown_tx, shutdown_rx) = crossbeam::channel::bounded(1);
    register_shutdown(shutdown_tx);

    rt.block_on(async {
        let orchestrator = HotReloadOrchestrator::from_config(config)?;

        let restored = orchestrator.restore_from_backups().await?;
        debug!("backup"; "{} restored at startup", plural_count(restored, "script"));

        let scripts = collect_scripts(&dir, &orchestrator.settings().pattern);
        initial_compile(&orchestrator, &scripts).await;

        orchestrator.start_watching(&dir)?;
        wait_for_shutdown(&shutdown_rx).await;
        orchestrator.stop_watching();

        let stats = orchestrator.statistics();
        log!(
            "watch";
            "{}, {} failed, {} rolled back ({:.0}% success)",
            plural_count(stats.total_reloads as usize, "reload"),
            stats.failed_reloads,
            stats.rollbacks_performed,
            stats.success_rate() * 100.0
        );
        Ok::<_, anyhow::Error>(())
    })
}

/// Matching scripts under `dir`, sorted for a stable initial order.
fn collect_scripts(dir: &Path, pattern: &Glob) -> Vec<PathBuf> {
    let mut scripts: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path())
        .filter(|path| !is_temp_file(path) && pattern.matches(path))
        .collect();
    scripts.sort();
    scripts
}

async fn initial_compile(orchestrator: &HotReloadOrchestrator, scripts: &[PathBuf]) {
    let mut failed = 0;
    for path in scripts {
        if !matches!(
            orchestrator.reload(path).await,
            ReloadOutcome::Installed { .. }
        ) {
            failed += 1;
        }
    }

    if failed == 0 {
        log!("watch"; "compiled {}", plural_count(scripts.len(), "script"));
    } else {
        log!("watch"; "compiled {}, {} failed", plural_count(scripts.len(), "script"), failed);
    }
}

async fn wait_for_shutdown(shutdown_rx: &Receiver<()>) {
    loop {
        match shutdown_rx.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => return,
            Err(TryRecvError::Empty) if is_shutdown() => return,
            Err(TryRecvError::Empty) => tokio::time::sleep(SHUTDOWN_POLL).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_collect_scripts_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("npc")).unwrap();
        for name in ["b.lua", "a.lua", "npc/c.lua", "notes.txt", ".a.lua.swp", "a.lua~"] {
            fs::write(dir.path().join(name), "").unwrap();
        }

        let scripts = collect_scripts(dir.path(), &Glob::new("*.lua").unwrap());
        let names: Vec<_> = scripts
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("a.lua"),
                PathBuf::from("b.lua"),
                PathBuf::from("npc/c.lua"),
            ]
        );
    }
}
