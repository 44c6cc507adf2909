//! SFTP download module
//!
//! Single-file download over an SSH [`Connection`](crate::ssh::Connection),
//! with retry, backoff and progress reporting.

pub mod error;
pub mod path_utils;
pub mod progress;
pub mod retry;
pub mod session;
pub mod transfer;

pub use error::SftpError;
pub use progress::{console_progress, ProgressCallback, ProgressEvent};
pub use retry::{calculate_backoff, is_retryable_error, AttemptOutcome, RetryConfig};
pub use session::{FileChannel, SftpChannel};
pub use transfer::TransferRequest;
