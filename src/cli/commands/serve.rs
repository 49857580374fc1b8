use anyhow::{Context, Result};
use clap::Args;
use std::time::Duration;

use super::build_rag_service;
use crate::models::Config;
use crate::server::{AppState, run_server, shutdown_signal};

#[derive(Debug, Args)]
pub struct ServeArgs {
    #[arg(long, short = 'b', help = "Address to listen on (e.g. 127.0.0.1:8000)")]
    pub bind: Option<String>,
}

pub async fn handle_serve(args: ServeArgs, config: &Config) -> Result<()> {
    let bind = args.bind.unwrap_or_else(|| config.server.bind.clone());

    let rag = build_rag_service(config)?;
    let state = AppState::new(rag, config.retrieval.top_k as usize)
        .with_request_timeout(Duration::from_secs(config.server.request_timeout_secs));

    eprintln!("Listening on http://{bind}");

    run_server(&bind, state, shutdown_signal())
        .await
        .with_context(|| format!("server on {bind} failed"))
}
