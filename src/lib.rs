//! oxidefetch - resilient single-file SFTP download
//!
//! Built on russh and russh-sftp. [`ssh::Connection`] owns the SSH session
//! and reconnects when it is lost; [`ssh::Connection::download_file`] fetches
//! one remote file with exponential-backoff retries and progress reporting.

pub mod cli;
pub mod config;
pub mod logging;
pub mod sftp;
pub mod ssh;

#[cfg(test)]
mod testing;
