//! Ingest command implementation.

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat};
use crate::services::{
    EmbeddingProvider, HttpEmbeddingClient, TextChunker, VectorIndex, ingest_documents_with_progress,
};
use crate::sources::{DocumentSource, LocalSource};

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// Folder with .txt, .md and .pdf files (defaults to indexing.data_dir)
    pub folder: Option<PathBuf>,

    /// File patterns to exclude (can be specified multiple times)
    #[arg(long, short = 'e')]
    pub exclude: Vec<String>,

    /// Show what would be ingested without embedding anything
    #[arg(long)]
    pub dry_run: bool,

    /// Add to the existing index instead of replacing it
    #[arg(long)]
    pub append: bool,
}

pub async fn handle_ingest(
    args: IngestArgs,
    config: &Config,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    let formatter = get_formatter(format);
    let folder = args
        .folder
        .unwrap_or_else(|| config.indexing.data_dir.clone());

    let mut exclude = config.indexing.exclude_patterns.clone();
    exclude.extend(args.exclude);

    let source = LocalSource::new(folder.clone(), &exclude, config.indexing.max_file_size);
    let documents = source
        .load()
        .with_context(|| format!("failed to load documents from {}", folder.display()))?;

    if documents.is_empty() {
        println!("{}", formatter.format_message("No documents found to ingest."));
        return Ok(());
    }

    if verbose {
        eprintln!("Found {} documents in {}", documents.len(), folder.display());
    }

    if args.dry_run {
        println!(
            "{}",
            formatter.format_message(&format!(
                "Dry run: Would ingest {} documents",
                documents.len()
            ))
        );
        for document in &documents {
            println!("  {} ({} chars)", document.source, document.content.chars().count());
        }
        return Ok(());
    }

    let chunker = TextChunker::from_config(&config.chunking)?;
    let embedder = HttpEmbeddingClient::new(&config.embedding)
        .context("failed to create embedding client")?;

    let index_dir = &config.storage.index_dir;
    let index = if args.append && VectorIndex::exists(index_dir) {
        VectorIndex::load(index_dir)
            .with_context(|| format!("failed to load index from {}", index_dir.display()))?
    } else {
        VectorIndex::new(embedder.dimension())?
    };

    if index.dim() != embedder.dimension() {
        anyhow::bail!(
            "existing index has dimension {} but embedding.dimension is {}; ingest without --append to rebuild",
            index.dim(),
            embedder.dimension()
        );
    }

    let pb = if format == OutputFormat::Text {
        ProgressBar::new(documents.len() as u64)
    } else {
        ProgressBar::hidden()
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            )?
            .progress_chars("#>-"),
    );

    let result = ingest_documents_with_progress(
        &documents,
        &chunker,
        &embedder,
        &index,
        config.embedding.batch_size as usize,
        |_| pb.inc(1),
    )
    .await;
    pb.finish_and_clear();
    let stats = result.context("ingest failed")?;

    index
        .save(index_dir)
        .with_context(|| format!("failed to save index to {}", index_dir.display()))?;

    print!("{}", formatter.format_ingest_stats(&stats));
    if format == OutputFormat::Text {
        println!(
            "Index:     {} ({} chunks)",
            index_dir.display(),
            index.len()
        );
    }

    Ok(())
}
