//! `backups` and `clear-backup` commands.

use std::path::Path;
use std::time::SystemTime;

use anyhow::{Context, Result};
use owo_colors::OwoColorize;

use crate::backup::{BackupStore, FileBackupStore, StoredSnapshot};
use crate::config::ReloadConfig;
use crate::core::ScriptIdentity;
use crate::log;
use crate::utils::plural::plural_count;

/// Print every persisted snapshot.
pub fn list_backups(config: &ReloadConfig) -> Result<()> {
    if !config.backup.enabled {
        log!("backup"; "durable backups are disabled in {}", config.config_path.display());
        return Ok(());
    }

    let store = FileBackupStore::new(config.backup_dir());
    let snapshots = store
        .list()
        .with_context(|| format!("failed to read backups in {}", store.dir().display()))?;

    if snapshots.is_empty() {
        log!("backup"; "no backups in {}", store.dir().display());
        return Ok(());
    }

    let now = SystemTime::now();
    for snapshot in &snapshots {
        println!("{}", format_snapshot(snapshot, config.root(), now));
    }
    log!("backup"; "{} in {}", plural_count(snapshots.len(), "backup"), store.dir().display());
    Ok(())
}

/// Delete the snapshot of the script at `path`.
pub fn clear_backup(config: &ReloadConfig, path: &Path) -> Result<()> {
    let store = FileBackupStore::new(config.backup_dir());
    let id = ScriptIdentity::from_path(path);

    if store.get(&id)?.is_none() {
        log!("backup"; "no backup for {}", id.path().display());
        return Ok(());
    }
    store.delete(&id)?;
    log!("backup"; "cleared backup for {}", id.path().display());
    Ok(())
}

fn format_snapshot(snapshot: &StoredSnapshot, root: &Path, now: SystemTime) -> String {
    let path = snapshot.identity.path();
    let shown = path.strip_prefix(root).unwrap_or(path);
    let age = now
        .duration_since(snapshot.persisted_at)
        .unwrap_or_default()
        .as_secs();

    format!(
        "{} {} {} {}",
        shown.display(),
        format!("v{}", snapshot.version).cyan(),
        snapshot.module.fingerprint().dimmed(),
        format!("({})", format_age(age)).dimmed()
    )
}

fn format_age(secs: u64) -> String {
    match secs {
        0..60 => format!("{secs}s ago"),
        60..3600 => format!("{}m ago", secs / 60),
        3600..86400 => format!("{}h ago", secs / 3600),
        _ => format!("{}d ago", secs / 86400),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Module;
    use crate::utils::exec::strip_ansi;
    use std::time::Duration;

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(5), "5s ago");
        assert_eq!(format_age(125), "2m ago");
        assert_eq!(format_age(7200), "2h ago");
        assert_eq!(format_age(200_000), "2d ago");
    }

    #[test]
    fn test_format_snapshot_relative_to_root() {
        let now = SystemTime::now();
        let snapshot = StoredSnapshot {
            identity: ScriptIdentity::from_path(Path::new("/game/scripts/npc.lua")),
            module: Module::new(b"return 1".to_vec()),
            version: 3,
            persisted_at: now - Duration::from_secs(90),
        };

        let line = format_snapshot(&snapshot, Path::new("/game"), now);
        let line = strip_ansi(&line);
        assert!(line.starts_with("scripts/npc.lua v3 "));
        assert!(line.ends_with("(1m ago)"));
    }

    #[test]
    fn test_clear_backup() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = ReloadConfig::default();
        config.root = dir.path().to_path_buf();
        let script = dir.path().join("npc.lua");
        std::fs::write(&script, "return 1").unwrap();

        let store = FileBackupStore::new(config.backup_dir());
        let id = ScriptIdentity::from_path(&script);
        store
            .put(&StoredSnapshot {
                identity: id.clone(),
                module: Module::new(b"return 1".to_vec()),
                version: 1,
                persisted_at: SystemTime::now(),
            })
            .unwrap();

        clear_backup(&config, &script).unwrap();
        assert!(store.get(&id).unwrap().is_none());
    }
}
