//! SSH Client implementation using russh

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::client::{self, Handle};
use russh::keys::PublicKey;
use russh::ChannelMsg;
use tokio::net::TcpStream;
use tracing::{debug, info};

use super::config::{HostKeyPolicy, SshConfig};
use super::connection::{CommandOutput, Connector, Transport};
use super::error::SshError;
use super::known_hosts::KnownHostsStore;
use crate::sftp::{FileChannel, SftpChannel, SftpError};

/// SSH extended data stream carrying stderr
const SSH_EXTENDED_DATA_STDERR: u32 = 1;

/// [`Connector`] that dials TCP and speaks SSH through russh
pub struct RusshConnector;

#[async_trait]
impl Connector for RusshConnector {
    async fn connect(&self, config: &SshConfig) -> Result<Box<dyn Transport>, SshError> {
        let addr = config.address();
        info!("Connecting to SSH server at {}", addr);

        let connect_timeout = Duration::from_secs(config.connect_timeout_secs);
        let banner_timeout = Duration::from_secs(config.banner_timeout_secs);

        let stream = tokio::time::timeout(connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| {
                SshError::Timeout(format!(
                    "TCP connect to {} timed out after {:?}",
                    addr, connect_timeout
                ))
            })?
            .map_err(|e| SshError::ConnectionFailed(format!("Failed to connect to {}: {}", addr, e)))?;

        let ssh_config = client::Config {
            inactivity_timeout: None,
            keepalive_interval: Some(Duration::from_secs(30)),
            keepalive_max: 3,
            ..Default::default()
        };

        let known_hosts = match &config.known_hosts_path {
            Some(path) => KnownHostsStore::with_path(path.clone()),
            None => KnownHostsStore::from_default_location(),
        };
        let handler = ClientHandler::new(
            config.host.clone(),
            config.port,
            config.host_key_policy,
            Arc::new(known_hosts),
        );

        // Banner exchange, key exchange and host key check
        let mut handle = tokio::time::timeout(
            banner_timeout,
            client::connect_stream(Arc::new(ssh_config), stream, handler),
        )
        .await
        .map_err(|_| {
            SshError::Timeout(format!(
                "SSH handshake with {} timed out after {:?}",
                addr, banner_timeout
            ))
        })??;

        debug!("SSH handshake completed");

        let authenticated = tokio::time::timeout(
            connect_timeout,
            handle.authenticate_password(config.username.as_str(), config.password.as_str()),
        )
        .await
        .map_err(|_| SshError::Timeout("Password authentication timed out".to_string()))?
        .map_err(|e| SshError::ProtocolError(format!("Authentication exchange failed: {}", e)))?;

        if !authenticated.success() {
            return Err(SshError::AuthenticationFailed(
                "Authentication rejected by server".to_string(),
            ));
        }

        info!("SSH authentication successful");

        Ok(Box::new(RusshTransport { handle }))
    }
}

/// Live russh session
pub struct RusshTransport {
    handle: Handle<ClientHandler>,
}

#[async_trait]
impl Transport for RusshTransport {
    fn is_active(&self) -> bool {
        !self.handle.is_closed()
    }

    async fn open_file_channel(&mut self) -> Result<Box<dyn FileChannel>, SftpError> {
        let channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| SshError::ChannelError(e.to_string()))?;

        Ok(Box::new(SftpChannel::open(channel).await?))
    }

    async fn exec(&mut self, command: &str) -> Result<CommandOutput, SshError> {
        let mut channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| SshError::ChannelError(format!("Failed to open exec channel: {}", e)))?;

        channel
            .exec(true, command)
            .await
            .map_err(|e| SshError::ChannelError(format!("Failed to exec command: {}", e)))?;

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut exit_code: Option<u32> = None;

        // Exit status may arrive after EOF, so drain until the channel closes
        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { data } => stdout.extend_from_slice(&data),
                ChannelMsg::ExtendedData { data, ext } if ext == SSH_EXTENDED_DATA_STDERR => {
                    stderr.extend_from_slice(&data)
                }
                ChannelMsg::ExitStatus { exit_status } => exit_code = Some(exit_status),
                ChannelMsg::Close => break,
                _ => {}
            }
        }

        let exit_code = exit_code.ok_or_else(|| {
            SshError::ChannelError("Remote command ended without an exit status".to_string())
        })?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            exit_code,
        })
    }

    async fn close(&mut self) -> Result<(), SshError> {
        self.handle
            .disconnect(russh::Disconnect::ByApplication, "Session closed", "en")
            .await?;
        Ok(())
    }
}

/// Client handler for russh callbacks
///
/// Only host key verification is handled; the client never accepts
/// server-initiated channels.
pub struct ClientHandler {
    host: String,
    port: u16,
    policy: HostKeyPolicy,
    known_hosts: Arc<KnownHostsStore>,
}

impl ClientHandler {
    pub fn new(
        host: String,
        port: u16,
        policy: HostKeyPolicy,
        known_hosts: Arc<KnownHostsStore>,
    ) -> Self {
        Self {
            host,
            port,
            policy,
            known_hosts,
        }
    }
}

impl client::Handler for ClientHandler {
    type Error = SshError;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        self.known_hosts
            .check(self.policy, &self.host, self.port, server_public_key)?;
        Ok(true)
    }
}
