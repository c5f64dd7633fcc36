//! Process configuration for the record store.
//!
//! # Responsibility
//! - Resolve the database file, log directory and log level.
//!
//! # Invariants
//! - Explicit values win over environment variables, which win over
//!   platform defaults.
//! - Resolution has no side effects; directories are created when the store
//!   or logger is opened.

use crate::logging::default_log_level;
use directories::ProjectDirs;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const DB_PATH_ENV: &str = "CARENOTE_DB_PATH";
pub const LOG_DIR_ENV: &str = "CARENOTE_LOG_DIR";
pub const LOG_LEVEL_ENV: &str = "CARENOTE_LOG_LEVEL";

const APP_NAME: &str = "carenote";
const DB_FILE_NAME: &str = "carenote.db";
const LOG_DIR_NAME: &str = "logs";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No platform data directory and no explicit path was given.
    NoDataDir,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoDataDir => write!(
                f,
                "could not determine a data directory; set {DB_PATH_ENV} and {LOG_DIR_ENV}"
            ),
        }
    }
}

impl Error for ConfigError {}

/// Resolved store configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CareConfig {
    pub db_path: PathBuf,
    pub log_dir: PathBuf,
    pub log_level: String,
}

/// Caller-supplied values that take precedence over the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub db_path: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub log_level: Option<String>,
}

impl CareConfig {
    /// Resolves configuration from overrides and process environment.
    pub fn resolve(overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        Self::resolve_with(overrides, |key| std::env::var(key).ok())
    }

    /// Resolves configuration using `lookup` for environment values.
    pub fn resolve_with(
        overrides: ConfigOverrides,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let env_path = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from)
        };

        let db_path = overrides.db_path.or_else(|| env_path(DB_PATH_ENV));
        let log_dir = overrides.log_dir.or_else(|| env_path(LOG_DIR_ENV));

        let (db_path, log_dir) = match (db_path, log_dir) {
            (Some(db_path), Some(log_dir)) => (db_path, log_dir),
            (db_path, log_dir) => {
                let data_dir = default_data_dir().ok_or(ConfigError::NoDataDir)?;
                (
                    db_path.unwrap_or_else(|| data_dir.join(DB_FILE_NAME)),
                    log_dir.unwrap_or_else(|| data_dir.join(LOG_DIR_NAME)),
                )
            }
        };

        let log_level = overrides
            .log_level
            .or_else(|| lookup(LOG_LEVEL_ENV))
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| default_log_level().to_string());

        Ok(Self {
            db_path,
            log_dir,
            log_level,
        })
    }
}

fn default_data_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.data_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::{CareConfig, ConfigOverrides, DB_PATH_ENV, LOG_DIR_ENV, LOG_LEVEL_ENV};
    use std::path::PathBuf;

    #[test]
    fn overrides_take_precedence_over_environment() {
        let overrides = ConfigOverrides {
            db_path: Some(PathBuf::from("/tmp/override.db")),
            log_dir: Some(PathBuf::from("/tmp/override-logs")),
            log_level: Some("warn".to_string()),
        };
        let config = CareConfig::resolve_with(overrides, |key| match key {
            DB_PATH_ENV => Some("/tmp/env.db".to_string()),
            LOG_LEVEL_ENV => Some("trace".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.db_path, PathBuf::from("/tmp/override.db"));
        assert_eq!(config.log_dir, PathBuf::from("/tmp/override-logs"));
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn environment_fills_missing_values() {
        let config = CareConfig::resolve_with(ConfigOverrides::default(), |key| match key {
            DB_PATH_ENV => Some("/srv/carenote/data.db".to_string()),
            LOG_DIR_ENV => Some("/srv/carenote/logs".to_string()),
            LOG_LEVEL_ENV => Some("error".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.db_path, PathBuf::from("/srv/carenote/data.db"));
        assert_eq!(config.log_dir, PathBuf::from("/srv/carenote/logs"));
        assert_eq!(config.log_level, "error");
    }

    #[test]
    fn blank_environment_values_are_ignored() {
        let overrides = ConfigOverrides {
            db_path: Some(PathBuf::from("/tmp/a.db")),
            log_dir: Some(PathBuf::from("/tmp/logs")),
            log_level: None,
        };
        let config = CareConfig::resolve_with(overrides, |key| match key {
            LOG_LEVEL_ENV => Some("  ".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.log_level, crate::logging::default_log_level());
    }
}
