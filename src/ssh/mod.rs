//! SSH module - handles the connection to the remote host
//!
//! This module provides the SSH functionality using the russh library.
//!
//! # Features
//! - Password authentication with connect and banner timeouts
//! - Host key verification via ~/.ssh/known_hosts under an explicit policy
//! - Lazy liveness check and reconnection (see `connection`)
//! - Remote command execution

mod client;
mod config;
pub mod connection;
mod error;
pub mod known_hosts;

pub use client::{ClientHandler, RusshConnector, RusshTransport};
pub use config::{HostKeyPolicy, SshConfig};
pub use connection::{CommandOutput, Connection, Connector, Transport};
pub use error::SshError;
pub use known_hosts::{HostKeyDecision, HostKeyVerification, KnownHostsStore};
