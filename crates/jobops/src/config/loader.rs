//! Settings loading.
//!
//! Precedence: built-in defaults < JSON file < `JOBOPS_*` environment
//! variables. A missing file is not an error; unparseable env values
//! are logged and ignored rather than failing startup.

use std::path::{Path, PathBuf};

use crate::config::schema::Settings;
use crate::error::ConfigError;

pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings, ConfigError> {
    let path = path.as_ref();

    let mut settings = if path.exists() {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content)?
    } else {
        log::info!(
            "Settings file {} not found, using defaults",
            path.display()
        );
        Settings::default()
    };

    apply_env_overrides(&mut settings);
    validate(&settings)?;
    Ok(settings)
}

pub fn load_settings_from_str(content: &str) -> Result<Settings, ConfigError> {
    let mut settings: Settings = serde_json::from_str(content)?;
    apply_env_overrides(&mut settings);
    validate(&settings)?;
    Ok(settings)
}

fn apply_env_overrides(settings: &mut Settings) {
    if let Some(path) = env_str("JOBOPS_DATABASE_PATH") {
        settings.database_path = Some(PathBuf::from(path));
    }
    if let Some(enabled) = env_bool("JOBOPS_BACKUP_ENABLED") {
        settings.backup.enabled = enabled;
    }
    if let Some(hour) = env_u32("JOBOPS_BACKUP_HOUR") {
        settings.backup.hour = hour;
    }
    if let Some(dir) = env_str("JOBOPS_BACKUP_DIR") {
        settings.backup.dir = Some(PathBuf::from(dir));
    }
    if let Some(retain) = env_u32("JOBOPS_BACKUP_RETAIN") {
        settings.backup.retain = retain as usize;
    }
}

fn validate(settings: &Settings) -> Result<(), ConfigError> {
    if settings.backup.hour > 23 {
        return Err(ConfigError::Validation {
            message: format!(
                "backup.hour must be 0-23, got {}",
                settings.backup.hour
            ),
        });
    }
    Ok(())
}

fn env_str(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_u32(name: &str) -> Option<u32> {
    let raw = env_str(name)?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            log::warn!("Ignoring {}: '{}' is not a valid integer", name, raw);
            None
        }
    }
}

fn env_bool(name: &str) -> Option<bool> {
    let raw = env_str(name)?;
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            log::warn!("Ignoring {}: '{}' is not a valid boolean", name, raw);
            None
        }
    }
}
