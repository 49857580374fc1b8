use anyhow::{Context, Result};
use clap::Args;
use std::time::Instant;

use super::build_rag_service;
use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat, QueryResponse};

#[derive(Debug, Args)]
pub struct QueryArgs {
    #[arg(required = true, help = "Question to answer")]
    pub question: String,

    #[arg(long, short = 'k', help = "Number of passages to retrieve")]
    pub top_k: Option<u32>,

    #[arg(long, help = "Similarity a passage must exceed to be used (-1.0 to 1.0)")]
    pub min_score: Option<f32>,
}

pub async fn handle_query(
    args: QueryArgs,
    config: &Config,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    let question = args.question.trim();
    if question.is_empty() {
        anyhow::bail!("question cannot be empty");
    }

    let top_k = args.top_k.unwrap_or(config.retrieval.top_k);
    if top_k == 0 {
        anyhow::bail!("top-k must be at least 1");
    }

    let min_score = args.min_score.unwrap_or(config.retrieval.min_score);
    if !(-1.0..=1.0).contains(&min_score) {
        anyhow::bail!("min-score must be between -1.0 and 1.0");
    }

    let formatter = get_formatter(format);
    let rag = build_rag_service(config)?.with_min_score(min_score);

    if verbose {
        eprintln!("Question: \"{question}\"");
        eprintln!("  Top-k: {top_k}");
        eprintln!("  Min score: {min_score:.3}");
        eprintln!("  Indexed chunks: {}", rag.index().len());
    }

    let start = Instant::now();
    let result = rag
        .query(question, top_k as usize)
        .await
        .context("query failed")?;
    let duration_ms = start.elapsed().as_millis() as u64;

    if verbose {
        eprintln!("  Total: {duration_ms}ms");
        eprintln!();
    }

    let response = QueryResponse::new(question, result, duration_ms);
    print!("{}", formatter.format_answer(&response));

    Ok(())
}
