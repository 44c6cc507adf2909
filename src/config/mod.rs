//! Configuration Management Module
//!
//! Loads the TOML configuration file and the server credentials
//! (process environment, optionally seeded from a `.env` file).

pub mod credentials;
pub mod storage;
pub mod types;

pub use credentials::Credentials;
pub use storage::{
    load_config, load_env_file, ConfigError, DEFAULT_CONFIG_PATH, DEFAULT_ENV_FILE,
};
pub use types::{AppConfig, DataPathConfig, LogConfig, SshOptions, TransferConfig};
