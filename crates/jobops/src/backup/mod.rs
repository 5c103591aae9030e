//! Database backups.
//!
//! Snapshots are produced with `VACUUM INTO`, which writes a compact,
//! consistent copy without blocking readers. Auto snapshots are named
//! per day and overwritten on re-runs; manual snapshots carry a time
//! suffix so they never collide.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::db::Database;
use crate::error::BackupError;
use crate::scheduler::ScheduledTask;

/// Creates and prunes database snapshots in a target directory.
pub struct BackupManager {
    db: Database,
    dir: PathBuf,
    retain: usize,
}

impl BackupManager {
    pub fn new(db: Database, dir: PathBuf, retain: usize) -> Self {
        Self { db, dir, retain }
    }

    /// Creates the daily auto snapshot, overwriting today's if present.
    pub fn create_auto_backup(&self) -> Result<PathBuf, BackupError> {
        self.create_backup(&auto_backup_name(Utc::now().date_naive()))
    }

    /// Creates a user-triggered snapshot with a unique time-suffixed name.
    pub fn create_manual_backup(&self) -> Result<PathBuf, BackupError> {
        self.create_backup(&manual_backup_name(Utc::now()))
    }

    fn create_backup(&self, file_name: &str) -> Result<PathBuf, BackupError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| BackupError::CreateDirectory {
            path: self.dir.clone(),
            source: e,
        })?;

        let target = self.dir.join(file_name);
        // VACUUM INTO refuses to overwrite an existing file.
        if target.exists() {
            std::fs::remove_file(&target).map_err(|e| BackupError::RemoveFile {
                path: target.clone(),
                source: e,
            })?;
        }

        let target_str = target.to_string_lossy().into_owned();
        self.db.with_conn(|conn| {
            conn.execute("VACUUM INTO ?1", [target_str.as_str()])?;
            Ok(())
        })?;

        log::info!("Created backup {}", target.display());
        Ok(target)
    }

    /// Deletes the oldest auto snapshots beyond the retention count.
    /// Manual snapshots are never touched. Returns how many files were
    /// removed.
    pub fn cleanup_old_backups(&self) -> Result<usize, BackupError> {
        if !self.dir.exists() {
            return Ok(0);
        }

        let entries = std::fs::read_dir(&self.dir).map_err(|e| BackupError::ReadDirectory {
            path: self.dir.clone(),
            source: e,
        })?;

        let mut autos: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with("auto-") && n.ends_with(".db"))
                    .unwrap_or(false)
            })
            .collect();

        if autos.len() <= self.retain {
            return Ok(0);
        }

        // Date-named files sort chronologically by name.
        autos.sort();
        let excess = autos.len() - self.retain;
        let mut removed = 0;
        for path in autos.into_iter().take(excess) {
            std::fs::remove_file(&path).map_err(|e| BackupError::RemoveFile {
                path: path.clone(),
                source: e,
            })?;
            log::info!("Pruned old backup {}", path.display());
            removed += 1;
        }
        Ok(removed)
    }
}

fn auto_backup_name(date: NaiveDate) -> String {
    format!("auto-{}.db", date.format("%Y-%m-%d"))
}

fn manual_backup_name(now: DateTime<Utc>) -> String {
    format!("manual-{}.db", now.format("%Y-%m-%d-%H%M%S"))
}

/// The daily scheduled backup job: snapshot, then prune.
pub struct BackupTask {
    manager: Arc<BackupManager>,
}

impl BackupTask {
    pub fn new(manager: Arc<BackupManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl ScheduledTask for BackupTask {
    fn name(&self) -> &str {
        "daily-backup"
    }

    async fn run(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.manager.create_auto_backup()?;
        let removed = self.manager.cleanup_old_backups()?;
        if removed > 0 {
            log::info!("Backup retention removed {} old snapshot(s)", removed);
        }
        Ok(())
    }
}
