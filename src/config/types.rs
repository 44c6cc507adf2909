//! Configuration file types
//!
//! Mirrors the layout of `config.toml`. Only `data_path` and `log` are
//! required; the other sections fall back to defaults.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::storage::{expand_tilde, ConfigError};
use crate::sftp::RetryConfig;
use crate::ssh::HostKeyPolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub data_path: DataPathConfig,

    pub log: LogConfig,

    #[serde(default)]
    pub transfer: TransferConfig,

    #[serde(default)]
    pub ssh: SshOptions,
}

/// Source and destination of the download
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPathConfig {
    pub remote_path: String,
    pub local_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub log_dir: PathBuf,

    /// Filter directive, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Rotated files kept besides the current one
    #[serde(default = "default_backup_count")]
    pub backup_count: usize,

    /// Log files are named `<file_name>.<YYYY-MM-DD>.log`
    #[serde(default = "default_log_file_name")]
    pub file_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    #[serde(default = "default_retries")]
    pub retries: usize,

    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: f64,

    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Cap for a single delay; unbounded when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_delay_secs: Option<f64>,

    #[serde(default)]
    pub jitter: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SshOptions {
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_banner_timeout")]
    pub banner_timeout_secs: u64,

    #[serde(default)]
    pub host_key_policy: HostKeyPolicy,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub known_hosts_path: Option<PathBuf>,
}

impl TransferConfig {
    pub fn retry_config(&self) -> Result<RetryConfig, ConfigError> {
        let initial = seconds("transfer.retry_delay_secs", self.retry_delay_secs)?;
        let max = self
            .max_delay_secs
            .map(|secs| seconds("transfer.max_delay_secs", secs))
            .transpose()?;

        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(ConfigError::Invalid(format!(
                "transfer.backoff_multiplier must be >= 1.0, got {}",
                self.backoff_multiplier
            )));
        }

        Ok(RetryConfig::new(self.retries)
            .with_backoff(initial, self.backoff_multiplier, max)
            .with_jitter(self.jitter))
    }
}

impl SshOptions {
    pub fn known_hosts_path(&self) -> Option<PathBuf> {
        self.known_hosts_path.as_deref().map(expand_tilde)
    }
}

fn seconds(field: &str, secs: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(secs).map_err(|_| {
        ConfigError::Invalid(format!("{} must be a non-negative number of seconds, got {}", field, secs))
    })
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_backup_count() -> usize {
    7
}

fn default_log_file_name() -> String {
    env!("CARGO_PKG_NAME").to_string()
}

fn default_retries() -> usize {
    3
}

fn default_retry_delay_secs() -> f64 {
    5.0
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_banner_timeout() -> u64 {
    30
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            retries: default_retries(),
            retry_delay_secs: default_retry_delay_secs(),
            backoff_multiplier: default_backoff_multiplier(),
            max_delay_secs: None,
            jitter: false,
        }
    }
}

impl Default for SshOptions {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            banner_timeout_secs: default_banner_timeout(),
            host_key_policy: HostKeyPolicy::default(),
            known_hosts_path: None,
        }
    }
}
