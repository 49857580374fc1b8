use anyhow::Result;
use clap::Parser;

use kassist::cli::commands::{
    handle_config, handle_ingest, handle_query, handle_serve, handle_status,
};
use kassist::cli::output::get_formatter;
use kassist::cli::{Cli, Commands};
use kassist::logging::init_logging;
use kassist::models::{Config, OutputFormat, ResolvedConfig};
use kassist::server::shutdown_signal;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let resolved = Config::load(cli.config.as_deref())?;

    if let Some(path) = init_logging(&resolved.config.logging, cli.verbose)? {
        tracing::debug!(path = %path.display(), "file logging enabled");
    }

    let format = cli.format.unwrap_or(resolved.config.output.default_format);

    if let Err(e) = run_command(cli.command, &resolved, format, cli.verbose).await {
        tracing::debug!(error = ?e, "command failed");
        eprint!("{}", get_formatter(format).format_error(&format!("{e:#}")));
        std::process::exit(1);
    }

    Ok(())
}

async fn run_command(
    command: Commands,
    resolved: &ResolvedConfig,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    let config = &resolved.config;
    match command {
        // The server installs its own graceful shutdown.
        Commands::Serve(args) => handle_serve(args, config).await,
        Commands::Ingest(args) => interruptible(handle_ingest(args, config, format, verbose)).await,
        Commands::Query(args) => interruptible(handle_query(args, config, format, verbose)).await,
        Commands::Status => interruptible(handle_status(resolved, format, verbose)).await,
        Commands::Config(cmd) => interruptible(handle_config(cmd, resolved, format, verbose)).await,
    }
}

/// Run a one-shot command until it finishes or Ctrl+C arrives.
async fn interruptible(task: impl Future<Output = Result<()>>) -> Result<()> {
    tokio::select! {
        result = task => result,
        _ = shutdown_signal() => {
            eprintln!("\nReceived shutdown signal, cleaning up...");
            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
            Ok(())
        }
    }
}
