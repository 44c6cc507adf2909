//! SFTP sub-channel
//!
//! One [`SftpChannel`] is opened per transfer attempt over an existing SSH
//! session and closed when the attempt ends.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use russh::client::Msg;
use russh::Channel;
use russh_sftp::client::error::Error as SftpErrorInner;
use russh_sftp::client::SftpSession as RusshSftpSession;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info, warn};

use super::error::SftpError;
use super::progress::ProgressCallback;

/// SFTP I/O timeout to prevent zombie transfers on SSH disconnect
const SFTP_IO_TIMEOUT: Duration = Duration::from_secs(300);

/// 64 KB chunks
const CHUNK_SIZE: usize = 65536;

/// A file-transfer sub-channel
#[async_trait]
pub trait FileChannel: Send {
    /// Copy `remote_path` into `local_path`, reporting progress per chunk.
    /// Returns the number of bytes written.
    async fn download(
        &mut self,
        remote_path: &str,
        local_path: &Path,
        progress: ProgressCallback<'_>,
    ) -> Result<u64, SftpError>;

    /// Close the sub-channel; closing twice is a no-op
    async fn close(&mut self) -> Result<(), SftpError>;
}

/// SFTP subsystem over a russh session channel
pub struct SftpChannel {
    sftp: RusshSftpSession,
    closed: bool,
}

impl SftpChannel {
    /// Request the SFTP subsystem on a freshly opened session channel
    pub async fn open(channel: Channel<Msg>) -> Result<Self, SftpError> {
        channel.request_subsystem(true, "sftp").await.map_err(|e| {
            SftpError::SubsystemNotAvailable(format!("Failed to request SFTP subsystem: {}", e))
        })?;

        let sftp = RusshSftpSession::new(channel.into_stream())
            .await
            .map_err(|e| SftpError::SubsystemNotAvailable(e.to_string()))?;

        debug!("SFTP subsystem opened");

        Ok(Self {
            sftp,
            closed: false,
        })
    }
}

#[async_trait]
impl FileChannel for SftpChannel {
    async fn download(
        &mut self,
        remote_path: &str,
        local_path: &Path,
        progress: ProgressCallback<'_>,
    ) -> Result<u64, SftpError> {
        let metadata = self
            .sftp
            .metadata(remote_path)
            .await
            .map_err(|e| map_sftp_error(e, remote_path))?;
        let total_bytes = metadata.size.unwrap_or(0);

        let mut remote_file = self
            .sftp
            .open(remote_path)
            .await
            .map_err(|e| map_sftp_error(e, remote_path))?;

        let mut local_file = tokio::fs::File::create(local_path).await?;

        info!(
            "Downloading {} ({} bytes) to {}",
            remote_path,
            total_bytes,
            local_path.display()
        );

        let mut buffer = vec![0u8; CHUNK_SIZE];
        let mut transferred: u64 = 0;

        loop {
            let bytes_read =
                match tokio::time::timeout(SFTP_IO_TIMEOUT, remote_file.read(&mut buffer)).await {
                    Ok(Ok(n)) => n,
                    Ok(Err(e)) => return Err(SftpError::ProtocolError(e.to_string())),
                    Err(_) => {
                        warn!(
                            "SFTP download read timeout after {:?} at {} bytes",
                            SFTP_IO_TIMEOUT, transferred
                        );
                        return Err(SftpError::TransferError(format!(
                            "Read timeout after {:?} - SSH connection may be dead",
                            SFTP_IO_TIMEOUT
                        )));
                    }
                };

            if bytes_read == 0 {
                break; // EOF
            }

            match tokio::time::timeout(SFTP_IO_TIMEOUT, local_file.write_all(&buffer[..bytes_read]))
                .await
            {
                Ok(Ok(())) => {}
                Ok(Err(e)) => return Err(SftpError::IoError(e)),
                Err(_) => {
                    warn!("SFTP download write timeout after {:?}", SFTP_IO_TIMEOUT);
                    return Err(SftpError::TransferError(format!(
                        "Local write timeout after {:?}",
                        SFTP_IO_TIMEOUT
                    )));
                }
            }

            transferred += bytes_read as u64;
            progress(transferred, total_bytes);
        }

        local_file.flush().await?;

        if total_bytes == 0 {
            progress(0, 0);
        }

        Ok(transferred)
    }

    async fn close(&mut self) -> Result<(), SftpError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.sftp.close().await?;
        debug!("SFTP subsystem closed");
        Ok(())
    }
}

/// Map SFTP errors to our error type
fn map_sftp_error(err: SftpErrorInner, path: &str) -> SftpError {
    let err_str = err.to_string();
    if err_str.contains("No such file") || err_str.contains("not found") {
        SftpError::FileNotFound(path.to_string())
    } else if err_str.contains("Permission denied") {
        SftpError::PermissionDenied(path.to_string())
    } else {
        SftpError::ProtocolError(err_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_sftp_error() {
        let err = map_sftp_error(SftpErrorInner::UnexpectedBehavior("No such file".into()), "/a/b");
        assert!(matches!(err, SftpError::FileNotFound(p) if p == "/a/b"));

        let err = map_sftp_error(SftpErrorInner::UnexpectedBehavior("Permission denied".into()), "/a/b");
        assert!(matches!(err, SftpError::PermissionDenied(_)));

        let err = map_sftp_error(SftpErrorInner::Timeout, "/a/b");
        assert!(matches!(err, SftpError::ProtocolError(_)));
    }
}
