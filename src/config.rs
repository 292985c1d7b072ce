//! Runtime configuration for the monitor binary.
//!
//! Settings come from an optional TOML file with environment variables taking
//! precedence for the database URL, so deployments can keep timing knobs in a
//! checked-in file and credentials in the environment.

use std::time::Duration;
use std::{env, fs, path::Path};

use serde::Deserialize;
use thiserror::Error;

use crate::monitoring::scheduler::MonitorPolicy;

pub const DEFAULT_TICK_SECONDS: u64 = 300;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("DATABASE_URL must be set, either in the environment or in the config file")]
    MissingDatabaseUrl,
}

#[derive(Deserialize, Debug, Clone, Default)]
struct ConfigFile {
    database_url: Option<String>,
    tick_seconds: Option<u64>,
    probe_timeout_seconds: Option<u64>,
    attempt_timeout_seconds: Option<u64>,
    max_attempts: Option<u32>,
    retry_backoff_seconds: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub database_url: String,
    pub tick_seconds: u64,
    pub probe_timeout_seconds: u64,
    pub attempt_timeout_seconds: u64,
    pub max_attempts: u32,
    pub retry_backoff_seconds: u64,
}

impl MonitorConfig {
    /// Loads configuration from `config_path` (when given and present),
    /// overlaying `DATABASE_URL` from the environment.
    pub fn load(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let file = match config_path {
            Some(path_str) => {
                let path = Path::new(path_str);
                let contents = fs::read_to_string(path).map_err(|e| ConfigError::Read {
                    path: path_str.to_string(),
                    source: e,
                })?;
                toml::from_str::<ConfigFile>(&contents).map_err(|e| ConfigError::Parse {
                    path: path_str.to_string(),
                    source: e,
                })?
            }
            None => ConfigFile::default(),
        };

        let defaults = MonitorPolicy::default();
        let database_url = env::var("DATABASE_URL")
            .ok()
            .or(file.database_url)
            .ok_or(ConfigError::MissingDatabaseUrl)?;

        Ok(Self {
            database_url,
            tick_seconds: file.tick_seconds.unwrap_or(DEFAULT_TICK_SECONDS),
            probe_timeout_seconds: file
                .probe_timeout_seconds
                .unwrap_or(defaults.probe_timeout.as_secs()),
            attempt_timeout_seconds: file
                .attempt_timeout_seconds
                .unwrap_or(defaults.attempt_timeout.as_secs()),
            max_attempts: file.max_attempts.unwrap_or(defaults.max_attempts),
            retry_backoff_seconds: file
                .retry_backoff_seconds
                .unwrap_or(defaults.retry_backoff.as_secs()),
        })
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_secs(self.tick_seconds)
    }

    pub fn monitor_policy(&self) -> MonitorPolicy {
        MonitorPolicy {
            probe_timeout: Duration::from_secs(self.probe_timeout_seconds),
            attempt_timeout: Duration::from_secs(self.attempt_timeout_seconds),
            max_attempts: self.max_attempts,
            retry_backoff: Duration::from_secs(self.retry_backoff_seconds),
        }
    }
}
