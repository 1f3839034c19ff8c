//! Configuration file CLI commands.
//!
//! Provides `config show`, `config init` and `config path`.

use std::path::Path;

use clap::Subcommand;
use splitfetch::config::{config_file_path, ConfigFile};

use crate::error::CliError;
use crate::ui::format_size;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show the configuration file path
    Path,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Show => run_show(),
        ConfigCommands::Init { force } => run_init(&config_file_path()?, force),
        ConfigCommands::Path => run_path(),
    }
}

fn run_show() -> Result<(), CliError> {
    let config = ConfigFile::load()?;
    for line in render(&config) {
        println!("{}", line);
    }
    Ok(())
}

fn run_init(path: &Path, force: bool) -> Result<(), CliError> {
    if path.exists() && !force {
        return Err(CliError::Config(format!(
            "{} already exists. Use --force to overwrite it.",
            path.display()
        )));
    }

    ConfigFile::default().save_to(path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn run_path() -> Result<(), CliError> {
    println!("{}", config_file_path()?.display());
    Ok(())
}

fn render(config: &ConfigFile) -> Vec<String> {
    let d = &config.download;
    let unset = |v: &Option<String>| v.clone().unwrap_or_else(|| "(not set)".to_string());

    vec![
        "[download]".to_string(),
        format!("  max_threads          = {}", d.max_threads),
        format!("  chunk_size           = {}", format_size(d.chunk_size)),
        format!("  max_retries          = {}", d.max_retries),
        format!("  timeout              = {}s", d.timeout_secs),
        format!("  probe_timeout        = {}s", d.probe_timeout_secs),
        format!("  small_file_threshold = {}", format_size(d.small_file_threshold)),
        format!("  max_chunks           = {}", d.max_chunks),
        format!("  chunked              = {}", d.chunked),
        format!("  auto_cleanup         = {}", d.auto_cleanup),
        String::new(),
        "[network]".to_string(),
        format!("  user_agent = {}", unset(&config.network.user_agent)),
        format!("  proxy      = {}", unset(&config.network.proxy)),
        String::new(),
        "[logging]".to_string(),
        format!("  level = {}", unset(&config.logging.level)),
        format!(
            "  file  = {}",
            config
                .logging
                .file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(not set)".to_string())
        ),
    ]
}
