//! Resilient single-file download
//!
//! [`Connection::download_file`] validates the request, prepares the local
//! directory and then runs the retry loop: every attempt makes sure the
//! connection is alive, opens its own SFTP sub-channel, streams the file and
//! closes the sub-channel again before the outcome is examined.

use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use super::error::SftpError;
use super::path_utils::{local_parent_dir, validate_file_paths};
use super::progress::{console_progress, ProgressCallback};
use super::retry::{calculate_backoff, AttemptOutcome, RetryConfig};
use crate::ssh::Connection;

/// What to download and how hard to try
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub remote_path: String,
    pub local_path: PathBuf,
    pub retry: RetryConfig,
}

impl TransferRequest {
    pub fn new(remote_path: impl Into<String>, local_path: impl Into<PathBuf>) -> Self {
        Self {
            remote_path: remote_path.into(),
            local_path: local_path.into(),
            retry: RetryConfig::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

impl Connection {
    /// Download one remote file, retrying transient failures.
    ///
    /// Without a `progress` callback, progress is rendered on the console.
    /// Returns the number of bytes written on success.
    pub async fn download_file(
        &mut self,
        request: &TransferRequest,
        progress: Option<ProgressCallback<'_>>,
    ) -> Result<u64, SftpError> {
        if let Err(e) = validate_file_paths(&request.remote_path, &request.local_path) {
            error!("Refusing download: {}", e);
            return Err(e);
        }

        let local_dir = local_parent_dir(&request.local_path);
        if let Err(e) = tokio::fs::create_dir_all(&local_dir).await {
            error!(
                "Failed to create local directory {}: {}",
                local_dir.display(),
                e
            );
            return Err(e.into());
        }

        let mut console = console_progress;
        let progress: ProgressCallback<'_> = match progress {
            Some(callback) => callback,
            None => &mut console,
        };

        let retry = &request.retry;
        let total_attempts = retry.total_attempts();
        let mut last_error: Option<SftpError> = None;

        for attempt in 0..total_attempts {
            let result = self
                .download_attempt(&request.remote_path, &request.local_path, &mut *progress)
                .await;

            match AttemptOutcome::classify(result) {
                AttemptOutcome::Success(bytes) => {
                    info!(
                        "File downloaded: {} -> {} ({} bytes)",
                        request.remote_path,
                        request.local_path.display(),
                        bytes
                    );
                    return Ok(bytes);
                }
                AttemptOutcome::Transient(e) => {
                    warn!(
                        "Download failed (attempt {}/{}): {}",
                        attempt + 1,
                        total_attempts,
                        e
                    );
                    last_error = Some(e);

                    if attempt < retry.max_retries {
                        let delay = calculate_backoff(attempt, retry);
                        info!("Retrying in {:?}...", delay);
                        tokio::time::sleep(delay).await;
                    }
                }
                AttemptOutcome::Fatal(e) => {
                    error!(
                        "Unexpected error during download (attempt {}/{}): {:?}",
                        attempt + 1,
                        total_attempts,
                        e
                    );
                    last_error = Some(e);
                    break;
                }
            }
        }

        let err = SftpError::TransferFailed {
            remote_path: request.remote_path.clone(),
            local_path: request.local_path.display().to_string(),
            cause: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no attempt was made".to_string()),
        };
        error!("{}", err);
        Err(err)
    }

    /// One attempt; the sub-channel is closed whatever the outcome
    async fn download_attempt(
        &mut self,
        remote_path: &str,
        local_path: &Path,
        progress: ProgressCallback<'_>,
    ) -> Result<u64, SftpError> {
        self.ensure_connected().await?;

        let mut channel = self.open_file_channel().await?;
        let result = channel.download(remote_path, local_path, progress).await;

        if let Err(e) = channel.close().await {
            warn!("Failed to close SFTP channel: {}", e);
        }

        result
    }
}
