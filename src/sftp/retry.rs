//! SFTP Transfer Retry Logic
//!
//! Exponential backoff and the retryable/fatal split for failed attempts.

use std::time::Duration;

use rand::Rng;

use crate::sftp::error::SftpError;

/// Retry configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Retries after the first attempt (`max_retries + 1` attempts in total)
    pub max_retries: usize,

    /// Delay before the first retry
    pub initial_backoff: Duration,

    /// Backoff multiplier for each retry
    pub backoff_multiplier: f64,

    /// Upper bound for a single delay; unbounded when `None`
    pub max_backoff: Option<Duration>,

    /// Randomize each delay within `[delay / 2, delay]`
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            max_backoff: None,
            jitter: false,
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration
    pub fn new(max_retries: usize) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Set custom backoff parameters
    pub fn with_backoff(mut self, initial: Duration, multiplier: f64, max: Option<Duration>) -> Self {
        self.initial_backoff = initial;
        self.backoff_multiplier = multiplier;
        self.max_backoff = max;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Total number of attempts this budget allows
    pub fn total_attempts(&self) -> usize {
        self.max_retries + 1
    }
}

/// Calculate backoff delay for a given retry attempt (exponential backoff)
///
/// `attempt` is zero-based: the delay after the first failure is
/// `calculate_backoff(0, ..)`.
pub fn calculate_backoff(attempt: usize, config: &RetryConfig) -> Duration {
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    let secs = config.initial_backoff.as_secs_f64() * config.backoff_multiplier.powi(exponent);
    let delay = Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX);

    let delay = match config.max_backoff {
        Some(max) => delay.min(max),
        None => delay,
    };

    if config.jitter {
        apply_jitter(delay)
    } else {
        delay
    }
}

fn apply_jitter(delay: Duration) -> Duration {
    let factor: f64 = rand::thread_rng().gen_range(0.5..=1.0);
    delay.mul_f64(factor)
}

/// Check if an error is retryable
///
/// SFTP status errors, SSH protocol and connection errors and local I/O
/// errors are retried. Authentication and host key failures, path errors and
/// anything unexpected are not.
pub fn is_retryable_error(error: &SftpError) -> bool {
    match error {
        SftpError::IoError(_)
        | SftpError::ChannelError(_)
        | SftpError::ProtocolError(_)
        | SftpError::SubsystemNotAvailable(_)
        | SftpError::FileNotFound(_)
        | SftpError::PermissionDenied(_)
        | SftpError::TransferError(_) => true,
        SftpError::Ssh(e) => e.is_transient(),
        SftpError::InvalidPath(_) | SftpError::Unexpected(_) | SftpError::TransferFailed { .. } => {
            false
        }
    }
}

/// Result of one transfer attempt
#[derive(Debug)]
pub enum AttemptOutcome {
    /// Transfer finished, carrying the byte count
    Success(u64),
    /// Failed, worth another attempt
    Transient(SftpError),
    /// Failed, further attempts would fail the same way
    Fatal(SftpError),
}

impl AttemptOutcome {
    pub fn classify(result: Result<u64, SftpError>) -> Self {
        match result {
            Ok(bytes) => AttemptOutcome::Success(bytes),
            Err(e) if is_retryable_error(&e) => AttemptOutcome::Transient(e),
            Err(e) => AttemptOutcome::Fatal(e),
        }
    }
}
