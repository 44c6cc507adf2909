//! SSH Configuration

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// SSH connection configuration
#[derive(Clone)]
pub struct SshConfig {
    /// Remote host address
    pub host: String,

    /// SSH port (default: 22)
    pub port: u16,

    /// Username for authentication
    pub username: String,

    /// Password for authentication, wiped from memory on drop
    pub password: Zeroizing<String>,

    /// TCP connect timeout in seconds
    pub connect_timeout_secs: u64,

    /// Timeout in seconds for the server banner and key exchange
    pub banner_timeout_secs: u64,

    /// What to do with server host keys
    pub host_key_policy: HostKeyPolicy,

    /// known_hosts file, `~/.ssh/known_hosts` when unset
    pub known_hosts_path: Option<PathBuf>,
}

/// Host key trust policy.
///
/// Every policy rejects a key that differs from the one recorded in
/// known_hosts; they only differ in how they treat hosts seen for the first
/// time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostKeyPolicy {
    /// Accept unknown hosts and record their key in known_hosts.
    ///
    /// Open to a man-in-the-middle on the very first connection.
    TrustOnFirstUse,

    /// Accept only hosts already present in known_hosts.
    #[default]
    StrictKnownHosts,

    /// Refuse every server key, known or not.
    Reject,
}

impl SshConfig {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password: Zeroizing::new(password.into()),
            ..Default::default()
        }
    }

    /// `host:port`, as used in log lines and socket resolution
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 22,
            username: String::new(),
            password: Zeroizing::new(String::new()),
            connect_timeout_secs: 10,
            banner_timeout_secs: 30,
            host_key_policy: HostKeyPolicy::default(),
            known_hosts_path: None,
        }
    }
}

impl fmt::Debug for SshConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SshConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("banner_timeout_secs", &self.banner_timeout_secs)
            .field("host_key_policy", &self.host_key_policy)
            .field("known_hosts_path", &self.known_hosts_path)
            .finish()
    }
}
