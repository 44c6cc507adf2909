//! Server credentials from the environment
//!
//! Variables use either the `SERVER_` or the `SV_` prefix:
//! `*_IP` (or `*_HOST`), `*_PORT`, `*_USERNAME` (or `*_USER`), `*_PASSWORD`.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use zeroize::Zeroizing;

use super::storage::{load_env_file, ConfigError};
use super::types::SshOptions;
use crate::ssh::SshConfig;

const PREFIXES: [&str; 2] = ["SERVER_", "SV_"];

pub struct Credentials {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Zeroizing<String>,
}

impl Credentials {
    /// Read credentials from `env_file` (if it exists) and the process
    /// environment; process variables take precedence
    pub fn load(env_file: &Path) -> Result<Self, ConfigError> {
        let file_vars = load_env_file(env_file)?;
        Self::from_lookup(|key| std::env::var(key).ok().or_else(|| file_vars.get(key).cloned()))
    }

    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let find = |names: &[&str]| -> Option<String> {
            PREFIXES.iter().find_map(|prefix| {
                names
                    .iter()
                    .find_map(|name| lookup(&format!("{}{}", prefix, name)))
            })
        };

        let host = find(&["IP", "HOST"])
            .ok_or_else(|| ConfigError::MissingVar("SERVER_IP".to_string()))?;
        let username = find(&["USERNAME", "USER"])
            .ok_or_else(|| ConfigError::MissingVar("SERVER_USERNAME".to_string()))?;
        let password = find(&["PASSWORD"])
            .ok_or_else(|| ConfigError::MissingVar("SERVER_PASSWORD".to_string()))?;

        let port = match find(&["PORT"]) {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| {
                ConfigError::Invalid(format!("SERVER_PORT must be a port number, got {:?}", raw))
            })?,
            None => 22,
        };

        Ok(Self {
            host,
            port,
            username,
            password: Zeroizing::new(password),
        })
    }

    /// Combine with the `[ssh]` section into a connection config
    pub fn into_ssh_config(self, options: &SshOptions) -> SshConfig {
        SshConfig {
            host: self.host,
            port: self.port,
            username: self.username,
            password: self.password,
            connect_timeout_secs: options.connect_timeout_secs,
            banner_timeout_secs: options.banner_timeout_secs,
            host_key_policy: options.host_key_policy,
            known_hosts_path: options.known_hosts_path(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ssh::HostKeyPolicy;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_server_prefix() {
        let creds = Credentials::from_vars(&vars(&[
            ("SERVER_IP", "10.0.0.5"),
            ("SERVER_PORT", "2222"),
            ("SERVER_USERNAME", "deploy"),
            ("SERVER_PASSWORD", "secret"),
        ]))
        .unwrap();

        assert_eq!(creds.host, "10.0.0.5");
        assert_eq!(creds.port, 2222);
        assert_eq!(creds.username, "deploy");
        assert_eq!(creds.password.as_str(), "secret");
        assert!(!format!("{:?}", creds).contains("secret"));
    }

    #[test]
    fn test_sv_prefix_and_default_port() {
        let creds = Credentials::from_vars(&vars(&[
            ("SV_HOST", "files.example.com"),
            ("SV_USER", "ops"),
            ("SV_PASSWORD", "pw"),
        ]))
        .unwrap();

        assert_eq!(creds.host, "files.example.com");
        assert_eq!(creds.port, 22);
        assert_eq!(creds.username, "ops");
    }

    #[test]
    fn test_missing_and_invalid_values() {
        let err = Credentials::from_vars(&vars(&[("SERVER_IP", "10.0.0.5")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(name) if name == "SERVER_USERNAME"));

        let err = Credentials::from_vars(&vars(&[
            ("SERVER_IP", "10.0.0.5"),
            ("SERVER_PORT", "ssh"),
            ("SERVER_USERNAME", "deploy"),
            ("SERVER_PASSWORD", "secret"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_into_ssh_config() {
        let creds = Credentials::from_vars(&vars(&[
            ("SERVER_IP", "10.0.0.5"),
            ("SERVER_USERNAME", "deploy"),
            ("SERVER_PASSWORD", "secret"),
        ]))
        .unwrap();
        let options = SshOptions {
            connect_timeout_secs: 4,
            host_key_policy: HostKeyPolicy::TrustOnFirstUse,
            ..Default::default()
        };

        let config = creds.into_ssh_config(&options);
        assert_eq!(config.address(), "10.0.0.5:22");
        assert_eq!(config.connect_timeout_secs, 4);
        assert_eq!(config.banner_timeout_secs, 30);
        assert_eq!(config.host_key_policy, HostKeyPolicy::TrustOnFirstUse);
    }
}
