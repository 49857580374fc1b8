use anyhow::{Context, Result};
use clap::Subcommand;

use crate::cli::output::{Formatter, get_formatter};
use crate::models::{Config, OutputFormat, ResolvedConfig};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    #[command(about = "Initialize configuration file")]
    Init {
        #[arg(
            long,
            short = 'g',
            help = "Create global config instead of project config"
        )]
        global: bool,
        #[arg(long, help = "Force overwrite existing config")]
        force: bool,
    },
    #[command(about = "Show current configuration")]
    Show,
    #[command(about = "Show configuration file paths")]
    Path,
}

pub async fn handle_config(
    cmd: ConfigCommand,
    resolved: &ResolvedConfig,
    format: OutputFormat,
    _verbose: bool,
) -> Result<()> {
    let formatter = get_formatter(format);

    match cmd {
        ConfigCommand::Init { global, force } => handle_init(global, force, formatter.as_ref()),
        ConfigCommand::Show => handle_show(resolved, format),
        ConfigCommand::Path => handle_path(resolved),
    }
}

fn handle_init(global: bool, force: bool, formatter: &dyn Formatter) -> Result<()> {
    let config_path = if global {
        Config::global_path().ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?
    } else {
        Config::project_path()
            .ok_or_else(|| anyhow::anyhow!("could not determine project directory"))?
    };

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config already exists at: {}\nUse --force to overwrite.",
            config_path.display()
        );
    }

    Config::default()
        .save(&config_path)
        .with_context(|| format!("failed to write {}", config_path.display()))?;

    println!(
        "{}",
        formatter.format_message(&format!("Created config at: {}", config_path.display()))
    );
    Ok(())
}

/// Copy of the config with API keys replaced for display.
fn redacted(config: &Config) -> Config {
    let mut config = config.clone();
    let mask = |key: &mut Option<String>| {
        if key.is_some() {
            *key = Some("********".to_string());
        }
    };
    mask(&mut config.embedding.api_key);
    mask(&mut config.llm.api_key);
    config
}

fn handle_show(resolved: &ResolvedConfig, format: OutputFormat) -> Result<()> {
    let config = redacted(&resolved.config);

    if format == OutputFormat::Json {
        let output = serde_json::json!({
            "config": config,
            "path": resolved.path,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    match resolved.path {
        Some(ref path) => println!("# Config: {}", path.display()),
        None => println!("# No config file found, showing defaults"),
    }
    println!();
    print!("{}", toml::to_string_pretty(&config)?);

    Ok(())
}

fn handle_path(resolved: &ResolvedConfig) -> Result<()> {
    println!("Configuration paths:");
    println!();

    match resolved.path {
        Some(ref path) => println!("Active config: {}", path.display()),
        None => println!("Active config: (none, using defaults)"),
    }

    if let Some(path) = Config::project_path() {
        let state = if path.exists() { "exists" } else { "not found" };
        println!("Project config: {} ({})", path.display(), state);
    }
    if let Some(path) = Config::global_path() {
        let state = if path.exists() { "exists" } else { "not found" };
        println!("Global config: {} ({})", path.display(), state);
    }

    if let Ok(cwd) = std::env::current_dir() {
        let env_path = cwd.join(".env");
        let state = if env_path.exists() { "exists" } else { "not found" };
        println!(".env file: {} ({})", env_path.display(), state);
    }

    Ok(())
}
