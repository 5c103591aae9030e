use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JobopsError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Tracking error: {0}")]
    Tracking(#[from] crate::tracking::TrackingError),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] crate::scheduler::SchedulerError),

    #[error("Backup error: {0}")]
    Backup(#[from] BackupError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read settings file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse settings JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Settings validation failed: {message}")]
    Validation { message: String },
}

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Failed to create backup directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read backup directory '{path}': {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove backup file '{path}': {source}")]
    RemoveFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Backup database error: {0}")]
    Database(#[from] crate::db::DatabaseError),
}

pub type Result<T> = std::result::Result<T, JobopsError>;
