//! Known hosts management for SSH host key verification
//!
//! Lookups and appends go through russh's OpenSSH `known_hosts` support,
//! which also matches hashed (`|1|salt|hash`) host entries. A
//! [`HostKeyPolicy`] is then applied to the outcome of the lookup.

use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use russh::keys::known_hosts::{
    check_known_hosts_path, known_host_keys_path, learn_known_hosts_path,
};
use russh::keys::{PublicKey, PublicKeyBase64};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use super::config::HostKeyPolicy;
use super::error::SshError;

/// Result of host key verification
#[derive(Debug, Clone, PartialEq)]
pub enum HostKeyVerification {
    /// Key matches known_hosts entry
    Verified,
    /// Host not in known_hosts (first connection)
    Unknown { fingerprint: String },
    /// Key changed from known_hosts entry (potential MITM)
    Changed {
        expected_fingerprint: String,
        actual_fingerprint: String,
    },
}

/// What to do with a server key once policy has been applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostKeyDecision {
    Accept,
    /// Accept and append the key to known_hosts
    AcceptAndRecord,
    Reject,
}

impl HostKeyPolicy {
    pub fn decide(&self, verification: &HostKeyVerification) -> HostKeyDecision {
        match (self, verification) {
            (HostKeyPolicy::Reject, _) => HostKeyDecision::Reject,
            (_, HostKeyVerification::Changed { .. }) => HostKeyDecision::Reject,
            (_, HostKeyVerification::Verified) => HostKeyDecision::Accept,
            (HostKeyPolicy::TrustOnFirstUse, HostKeyVerification::Unknown { .. }) => {
                HostKeyDecision::AcceptAndRecord
            }
            (HostKeyPolicy::StrictKnownHosts, HostKeyVerification::Unknown { .. }) => {
                HostKeyDecision::Reject
            }
        }
    }
}

/// One known_hosts file
pub struct KnownHostsStore {
    path: PathBuf,
}

impl KnownHostsStore {
    /// Use the user's `~/.ssh/known_hosts`
    pub fn from_default_location() -> Self {
        let path = dirs::home_dir()
            .map(|h| h.join(".ssh").join("known_hosts"))
            .unwrap_or_else(|| PathBuf::from("~/.ssh/known_hosts"));
        Self::with_path(path)
    }

    pub fn with_path(path: PathBuf) -> Self {
        if !path.exists() {
            debug!("No known_hosts file at {}", path.display());
        }
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Compute SHA256 fingerprint of public key
    pub fn fingerprint(key: &PublicKey) -> String {
        let hash = Sha256::digest(key.public_key_bytes());
        format!("SHA256:{}", BASE64.encode(hash).trim_end_matches('='))
    }

    /// Verify a host's public key
    ///
    /// An unreadable or malformed known_hosts file is an error, never
    /// an unknown host.
    pub fn verify(
        &self,
        host: &str,
        port: u16,
        key: &PublicKey,
    ) -> Result<HostKeyVerification, SshError> {
        let host = host.to_lowercase();
        let fingerprint = Self::fingerprint(key);

        match check_known_hosts_path(&host, port, key, &self.path) {
            Ok(true) => {
                debug!("Host key verified for {}:{}", host, port);
                Ok(HostKeyVerification::Verified)
            }
            Ok(false) => {
                debug!("Unknown host: {}:{}", host, port);
                Ok(HostKeyVerification::Unknown { fingerprint })
            }
            Err(russh::keys::Error::KeyChanged { line }) => {
                let expected_fingerprint = known_host_keys_path(&host, port, &self.path)
                    .ok()
                    .and_then(|keys| keys.into_iter().find(|(l, _)| *l == line))
                    .map(|(_, recorded)| Self::fingerprint(&recorded))
                    .unwrap_or_else(|| "unknown".to_string());
                warn!(
                    "HOST KEY CHANGED for {}:{} ({} line {})! Expected {}, got {}",
                    host,
                    port,
                    self.path.display(),
                    line,
                    expected_fingerprint,
                    fingerprint
                );
                Ok(HostKeyVerification::Changed {
                    expected_fingerprint,
                    actual_fingerprint: fingerprint,
                })
            }
            Err(e) => Err(SshError::HostKeyRejected(format!(
                "cannot check {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    /// Append a host key to known_hosts
    pub fn add_host(&self, host: &str, port: u16, key: &PublicKey) -> Result<(), SshError> {
        let host = host.to_lowercase();
        learn_known_hosts_path(&host, port, key, &self.path).map_err(|e| {
            SshError::IoError(std::io::Error::other(format!(
                "Failed to write {}: {}",
                self.path.display(),
                e
            )))
        })?;

        info!(
            "Added host key for {}:{} (type: {}) to {}",
            host,
            port,
            key.algorithm().as_str(),
            self.path.display()
        );
        Ok(())
    }

    /// Look the key up and apply `policy`, recording it when the policy says so
    pub fn check(
        &self,
        policy: HostKeyPolicy,
        host: &str,
        port: u16,
        key: &PublicKey,
    ) -> Result<(), SshError> {
        let verification = self.verify(host, port, key).inspect_err(|e| {
            warn!("Rejecting host key: {}", e);
        })?;

        match policy.decide(&verification) {
            HostKeyDecision::Accept => {
                info!("Host key verified for {}:{}", host, port);
                Ok(())
            }
            HostKeyDecision::AcceptAndRecord => {
                info!(
                    "Trusting new host key for {}:{} on first use ({})",
                    host,
                    port,
                    Self::fingerprint(key)
                );
                if let Err(e) = self.add_host(host, port, key) {
                    warn!("Failed to save host key: {}", e);
                }
                Ok(())
            }
            HostKeyDecision::Reject => {
                let reason = match verification {
                    HostKeyVerification::Changed {
                        expected_fingerprint,
                        actual_fingerprint,
                    } => format!(
                        "key for {}:{} has changed (expected {}, got {}); \
                         this could indicate a man-in-the-middle attack",
                        host, port, expected_fingerprint, actual_fingerprint
                    ),
                    HostKeyVerification::Unknown { fingerprint } => format!(
                        "unknown host {}:{} ({}) under {:?} policy",
                        host, port, fingerprint, policy
                    ),
                    HostKeyVerification::Verified => {
                        format!("{}:{} refused under {:?} policy", host, port, policy)
                    }
                };
                warn!("Rejecting host key: {}", reason);
                Err(SshError::HostKeyRejected(reason))
            }
        }
    }
}
