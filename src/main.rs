//! oxidefetch binary
//!
//! Reads `config.toml` and the `SERVER_*` credentials, connects once and
//! either downloads the configured file or runs a remote command. The
//! connection is always closed before the process exits.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use oxidefetch::cli::{Cli, Command, DownloadArgs};
use oxidefetch::config::{load_config, AppConfig, Credentials};
use oxidefetch::logging::init_logging;
use oxidefetch::sftp::TransferRequest;
use oxidefetch::ssh::Connection;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let mut cli = Cli::parse();
    let command = cli.take_command();

    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    init_logging(&config.log, cli.verbose).context("Failed to initialize logging")?;

    let credentials = Credentials::load(&cli.env_file).context("Failed to load credentials")?;
    let ssh_config = credentials.into_ssh_config(&config.ssh);

    let mut connection = Connection::new(ssh_config);
    let result = run(&mut connection, &config, command).await;
    connection.disconnect().await;

    if let Err(e) = &result {
        error!("{:#}", e);
    }
    result
}

async fn run(connection: &mut Connection, config: &AppConfig, command: Command) -> Result<ExitCode> {
    connection.connect().await?;

    match command {
        Command::Download(args) => {
            let request = transfer_request(config, args)?;
            connection.download_file(&request, None).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Exec { command } => {
            let command = command.join(" ");
            let output = connection.exec(&command).await?;

            print!("{}", output.stdout);
            eprint!("{}", output.stderr);
            info!("Command {:?} exited with {}", command, output.exit_code);

            Ok(ExitCode::from(u8::try_from(output.exit_code).unwrap_or(u8::MAX)))
        }
    }
}

fn transfer_request(config: &AppConfig, args: DownloadArgs) -> Result<TransferRequest> {
    let mut transfer = config.transfer.clone();
    if let Some(retries) = args.retries {
        transfer.retries = retries;
    }
    let retry = transfer.retry_config()?;

    let remote = args
        .remote
        .unwrap_or_else(|| config.data_path.remote_path.clone());
    let local = args
        .local
        .unwrap_or_else(|| config.data_path.local_path.clone());

    Ok(TransferRequest::new(remote, local).with_retry(retry))
}
