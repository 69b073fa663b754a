//! Environment-driven configuration.
//!
//! # Responsibility
//! - Resolve store and logging settings from `PARALLEL_CALENDAR_*` variables.
//! - Reject malformed values up front instead of falling back silently.

use crate::db::DEFAULT_BUSY_TIMEOUT;
use crate::logging::{default_log_level, normalize_level};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const ENV_DB_PATH: &str = "PARALLEL_CALENDAR_DB_PATH";
pub const ENV_POOL_SIZE: &str = "PARALLEL_CALENDAR_POOL_SIZE";
pub const ENV_BUSY_TIMEOUT_MS: &str = "PARALLEL_CALENDAR_BUSY_TIMEOUT_MS";
pub const ENV_LOG_LEVEL: &str = "PARALLEL_CALENDAR_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "PARALLEL_CALENDAR_LOG_DIR";

const DEFAULT_DB_FILE_NAME: &str = "parallel_calendar.sqlite3";
const DEFAULT_POOL_SIZE: u32 = 8;
const POOL_SIZE_MAX: u32 = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value `{value}` for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Settings consumed by process bootstrap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub pool_size: u32,
    pub busy_timeout: Duration,
    pub log_level: &'static str,
    /// Rolling log directory; logging stays off when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_FILE_NAME),
            pool_size: DEFAULT_POOL_SIZE,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            log_level: default_log_level(),
            log_dir: None,
        }
    }
}

impl CoreConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through an arbitrary key lookup.
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let mut config = Self::default();

        if let Some(path) = read(ENV_DB_PATH) {
            // Every pooled connection would open its own empty database.
            if path == ":memory:" || path.starts_with("file::memory:") {
                return Err(invalid(ENV_DB_PATH, &path, "must name a database file"));
            }
            config.db_path = PathBuf::from(path);
        }

        if let Some(raw) = read(ENV_POOL_SIZE) {
            let size = raw.parse::<u32>().map_err(|err| invalid(ENV_POOL_SIZE, &raw, err))?;
            if !(1..=POOL_SIZE_MAX).contains(&size) {
                return Err(invalid(
                    ENV_POOL_SIZE,
                    &raw,
                    format!("expected 1..={POOL_SIZE_MAX}"),
                ));
            }
            config.pool_size = size;
        }

        if let Some(raw) = read(ENV_BUSY_TIMEOUT_MS) {
            let millis = raw
                .parse::<u64>()
                .map_err(|err| invalid(ENV_BUSY_TIMEOUT_MS, &raw, err))?;
            if millis == 0 {
                return Err(invalid(ENV_BUSY_TIMEOUT_MS, &raw, "must be positive"));
            }
            config.busy_timeout = Duration::from_millis(millis);
        }

        if let Some(raw) = read(ENV_LOG_LEVEL) {
            config.log_level =
                normalize_level(&raw).map_err(|reason| invalid(ENV_LOG_LEVEL, &raw, reason))?;
        }

        if let Some(raw) = read(ENV_LOG_DIR) {
            if !Path::new(&raw).is_absolute() {
                return Err(invalid(ENV_LOG_DIR, &raw, "must be an absolute path"));
            }
            config.log_dir = Some(PathBuf::from(raw));
        }

        Ok(config)
    }
}

fn invalid(key: &'static str, value: &str, reason: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ConfigError, CoreConfig, ENV_BUSY_TIMEOUT_MS, ENV_DB_PATH, ENV_LOG_DIR, ENV_POOL_SIZE,
    };
    use std::collections::HashMap;
    use std::time::Duration;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = CoreConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, CoreConfig::default());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = CoreConfig::from_lookup(lookup(&[
            ("PARALLEL_CALENDAR_DB_PATH", "/tmp/cal.sqlite3"),
            (ENV_POOL_SIZE, "4"),
            (ENV_BUSY_TIMEOUT_MS, "250"),
            ("PARALLEL_CALENDAR_LOG_LEVEL", " WARNING "),
        ]))
        .unwrap();
        assert_eq!(config.db_path.to_str(), Some("/tmp/cal.sqlite3"));
        assert_eq!(config.pool_size, 4);
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn out_of_range_pool_size_is_rejected() {
        let err = CoreConfig::from_lookup(lookup(&[(ENV_POOL_SIZE, "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == ENV_POOL_SIZE));
    }

    #[test]
    fn zero_busy_timeout_is_rejected() {
        let err = CoreConfig::from_lookup(lookup(&[(ENV_BUSY_TIMEOUT_MS, "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == ENV_BUSY_TIMEOUT_MS));
    }

    #[test]
    fn in_memory_db_path_is_rejected() {
        for path in [":memory:", "file::memory:?cache=shared"] {
            let err = CoreConfig::from_lookup(lookup(&[(ENV_DB_PATH, path)])).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == ENV_DB_PATH));
        }
    }

    #[test]
    fn relative_log_dir_is_rejected() {
        let err = CoreConfig::from_lookup(lookup(&[(ENV_LOG_DIR, "logs")])).unwrap_err();
        assert!(err.to_string().contains("absolute"));
    }
}
