//! SFTP Error types

use thiserror::Error;

use crate::ssh::SshError;

#[derive(Error, Debug)]
pub enum SftpError {
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("SFTP subsystem not available: {0}")]
    SubsystemNotAvailable(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("SFTP protocol error: {0}")]
    ProtocolError(String),

    #[error("Channel error: {0}")]
    ChannelError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Transfer error: {0}")]
    TransferError(String),

    #[error(transparent)]
    Ssh(#[from] SshError),

    #[error("Unexpected error: {0}")]
    Unexpected(String),

    #[error("Failed to download file, last error: {cause}\nRemote path: {remote_path}\nLocal path: {local_path}")]
    TransferFailed {
        remote_path: String,
        local_path: String,
        cause: String,
    },
}

impl From<russh_sftp::client::error::Error> for SftpError {
    fn from(err: russh_sftp::client::error::Error) -> Self {
        SftpError::ProtocolError(err.to_string())
    }
}
