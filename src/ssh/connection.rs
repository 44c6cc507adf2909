//! Connection lifecycle
//!
//! A [`Connection`] owns at most one SSH transport to one host. It connects
//! lazily and idempotently, checks the transport before every use and
//! reconnects when the transport died underneath it.
//!
//! The network is reached through the [`Connector`] and [`Transport`] traits,
//! implemented over russh in [`super::client`].

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use super::client::RusshConnector;
use super::config::SshConfig;
use super::error::SshError;
use crate::sftp::{FileChannel, SftpError};

/// Output of a remote command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: u32,
}

/// Opens authenticated transports
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, config: &SshConfig) -> Result<Box<dyn Transport>, SshError>;
}

/// One authenticated SSH session
#[async_trait]
pub trait Transport: Send {
    /// Whether the underlying session is still up
    fn is_active(&self) -> bool;

    /// Open an SFTP sub-channel over this session
    async fn open_file_channel(&mut self) -> Result<Box<dyn FileChannel>, SftpError>;

    /// Run `command` on a fresh session channel and collect its output
    async fn exec(&mut self, command: &str) -> Result<CommandOutput, SshError>;

    /// Close the session
    async fn close(&mut self) -> Result<(), SshError>;
}

/// SSH connection to a single host
pub struct Connection {
    config: SshConfig,
    connector: Arc<dyn Connector>,
    transport: Option<Box<dyn Transport>>,
    connected: bool,
}

impl Connection {
    /// Unconnected connection that will use russh
    pub fn new(config: SshConfig) -> Self {
        Self::with_connector(config, Arc::new(RusshConnector))
    }

    pub fn with_connector(config: SshConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            config,
            connector,
            transport: None,
            connected: false,
        }
    }

    pub fn config(&self) -> &SshConfig {
        &self.config
    }

    /// Liveness flag; may be stale until [`Connection::ensure_connected`] runs
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Connect and authenticate. No-op when already connected.
    pub async fn connect(&mut self) -> Result<(), SshError> {
        if self.connected {
            return Ok(());
        }

        match self.connector.connect(&self.config).await {
            Ok(transport) => {
                self.transport = Some(transport);
                self.connected = true;
                info!("SSH connection established to {}", self.config.address());
                Ok(())
            }
            Err(SshError::AuthenticationFailed(reason)) => {
                error!(
                    "Authentication failed for {}@{}, check username and password",
                    self.config.username,
                    self.config.address()
                );
                Err(SshError::AuthenticationFailed(reason))
            }
            Err(e) => {
                error!("Connection to {} failed: {}", self.config.address(), e);
                Err(match e {
                    SshError::HostKeyRejected(_) | SshError::ConnectionFailed(_) => e,
                    other => SshError::ConnectionFailed(other.to_string()),
                })
            }
        }
    }

    /// Close the transport. No-op when not connected, never fails.
    pub async fn disconnect(&mut self) {
        if !self.connected {
            return;
        }

        if let Some(mut transport) = self.transport.take() {
            if let Err(e) = transport.close().await {
                debug!("Error while closing SSH transport (ignored): {}", e);
            }
        }
        self.connected = false;
        info!("SSH connection to {} closed", self.config.address());
    }

    /// Make sure a live transport exists, reconnecting if it went away
    pub async fn ensure_connected(&mut self) -> Result<(), SshError> {
        let alive = self.connected
            && self
                .transport
                .as_ref()
                .map(|t| t.is_active())
                .unwrap_or(false);

        if alive {
            return Ok(());
        }

        if self.connected {
            warn!(
                "SSH connection to {} was lost, reconnecting...",
                self.config.address()
            );
        } else {
            warn!(
                "SSH connection to {} is not open, connecting...",
                self.config.address()
            );
        }

        // Drop the dead transport so a Connection never holds two
        self.transport = None;
        self.connected = false;
        self.connect().await
    }

    /// Open an SFTP sub-channel on the current transport
    pub(crate) async fn open_file_channel(&mut self) -> Result<Box<dyn FileChannel>, SftpError> {
        let transport = self.transport.as_mut().ok_or(SshError::Disconnected)?;
        transport.open_file_channel().await
    }

    /// Run a command on the remote host
    pub async fn exec(&mut self, command: &str) -> Result<CommandOutput, SshError> {
        self.ensure_connected().await?;
        let transport = self.transport.as_mut().ok_or(SshError::Disconnected)?;

        debug!("Executing remote command: {}", command);
        let output = transport.exec(command).await?;
        debug!("Remote command exited with {}", output.exit_code);
        Ok(output)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        // Dropping the transport tears the session down; disconnect() is the
        // graceful path
        if self.transport.is_some() {
            debug!(
                "Dropping live SSH connection to {} without disconnect()",
                self.config.address()
            );
        }
    }
}
