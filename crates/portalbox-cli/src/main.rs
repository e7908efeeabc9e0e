use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use portalbox_cli::{Cli, Command, commands, logging};

/// Grace period for background tasks once the command returns. The stdin
/// reader blocks a thread and would otherwise hold the process open.
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(250);

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = cli.load_config()?;
    match &cli.command {
        Command::Run(args) | Command::Register(args) => args.apply(&mut config)?,
        Command::CheckConfig => {}
    }
    logging::init(&config.logging)?;
    if !cli.config.exists() {
        tracing::warn!(path = %cli.config.display(), "No configuration file; using defaults");
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let result = runtime.block_on(async {
        match cli.command {
            Command::Run(_) => commands::run(config).await,
            Command::Register(_) => commands::register(config).await,
            Command::CheckConfig => commands::check_config(&config),
        }
    });

    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);
    result
}
