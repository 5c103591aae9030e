use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application settings, loaded from a JSON file with `JOBOPS_*`
/// environment overrides applied on top.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Database file location. Falls back to the canonical path under
    /// the home directory when absent.
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    #[serde(default)]
    pub backup: BackupSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// UTC hour (0-23) for the daily auto backup.
    #[serde(default = "default_backup_hour")]
    pub hour: u32,

    /// Snapshot directory. Defaults to a `backups` directory next to
    /// the database file.
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// How many auto snapshots to keep.
    #[serde(default = "default_retain")]
    pub retain: usize,
}

fn default_true() -> bool {
    true
}

fn default_backup_hour() -> u32 {
    3
}

fn default_retain() -> usize {
    7
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            hour: default_backup_hour(),
            dir: None,
            retain: default_retain(),
        }
    }
}
