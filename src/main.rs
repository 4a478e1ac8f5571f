//! devserve binary.
//!
//! Parses the command line, resolves configuration, and runs the server
//! until Ctrl+C or SIGTERM.

use std::process::ExitCode;

use clap::Parser;

use devserve::config::{self, CliArgs, Environment};
use devserve::lifecycle::signals::spawn_signal_handler;
use devserve::{observability, ServerError};

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    observability::init(!args.no_color);

    tracing::info!("devserve v{} starting", env!("CARGO_PKG_VERSION"));

    match run(args).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Fatal error");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: CliArgs) -> Result<(), ServerError> {
    let config = config::resolve(args, Environment::capture())?;

    tracing::debug!(config = ?config, "Configuration loaded");

    let server = devserve::launch(config).await?;
    spawn_signal_handler(server.shutdown_handle());
    server.wait().await
}
