//! Command line interface

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::config::{DEFAULT_CONFIG_PATH, DEFAULT_ENV_FILE};

/// Download a file from a remote host over SFTP
#[derive(Parser, Debug)]
#[command(name = "oxidefetch")]
#[command(version)]
#[command(about = "Download a single file over SSH/SFTP with retries", long_about = None)]
pub struct Cli {
    /// Configuration file
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Dotenv file holding the SERVER_* / SV_* credentials
    #[arg(long, value_name = "FILE", default_value = DEFAULT_ENV_FILE)]
    pub env_file: PathBuf,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download the configured file (default)
    Download(DownloadArgs),

    /// Run a command on the remote host
    Exec {
        /// Command line passed to the remote shell
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
}

#[derive(Args, Debug, Default)]
pub struct DownloadArgs {
    /// Remote file, overrides data_path.remote_path
    #[arg(long, value_name = "PATH")]
    pub remote: Option<String>,

    /// Local destination, overrides data_path.local_path
    #[arg(long, value_name = "PATH")]
    pub local: Option<PathBuf>,

    /// Retries after the first attempt, overrides transfer.retries
    #[arg(long, value_name = "N")]
    pub retries: Option<usize>,
}

impl Cli {
    /// The subcommand to run; `download` without overrides when omitted
    pub fn take_command(&mut self) -> Command {
        self.command
            .take()
            .unwrap_or_else(|| Command::Download(DownloadArgs::default()))
    }
}
