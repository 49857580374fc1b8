//! Command-line interface for the knowledge assistant.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::models::OutputFormat;

/// Ask questions about your own documents, answered from the passages that
/// match them best.
#[derive(Debug, Parser)]
#[command(name = "kassist")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(
        long,
        short = 'c',
        global = true,
        env = "KASSIST_CONFIG",
        help = "Path to a config file (defaults to .kassist/config.toml, then the user config dir)"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        short = 'f',
        global = true,
        help = "Output format: text, json, or markdown"
    )]
    pub format: Option<OutputFormat>,

    #[arg(long, short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Load documents from a folder and build the index
    Ingest(commands::IngestArgs),

    /// Answer a question from the indexed documents
    Query(commands::QueryArgs),

    /// Serve the HTTP API
    Serve(commands::ServeArgs),

    /// Show index and model status
    Status,

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::ConfigCommand),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_query_with_global_flags() {
        let cli = Cli::try_parse_from([
            "kassist",
            "query",
            "What is Rust?",
            "--top-k",
            "3",
            "--format",
            "json",
            "-v",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert_eq!(cli.format, Some(OutputFormat::Json));
        match cli.command {
            Commands::Query(args) => {
                assert_eq!(args.question, "What is Rust?");
                assert_eq!(args.top_k, Some(3));
                assert_eq!(args.min_score, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_ingest_excludes() {
        let cli = Cli::try_parse_from([
            "kassist", "ingest", "docs", "-e", "**/drafts/**", "-e", "*.tmp.md", "--dry-run",
        ])
        .unwrap();

        match cli.command {
            Commands::Ingest(args) => {
                assert_eq!(args.folder, Some(PathBuf::from("docs")));
                assert_eq!(args.exclude.len(), 2);
                assert!(args.dry_run);
                assert!(!args.append);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_query_requires_question() {
        assert!(Cli::try_parse_from(["kassist", "query"]).is_err());
    }
}
