//! splitfetch CLI - parallel ranged HTTP downloads.
//!
//! Thin front end over the `splitfetch` library: argument parsing, logging
//! setup, progress rendering and exit codes.

mod commands;
mod error;
mod ui;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use console::style;
use splitfetch::config::ConfigFile;
use splitfetch::{init_logging, LogSettings, LoggingGuard};

use commands::config::ConfigCommands;
use commands::get::GetArgs;
use commands::probe::ProbeArgs;
use error::CliError;

/// Level used when neither flags nor the config file set one.
const QUIET_LOG_LEVEL: &str = "warn";

#[derive(Debug, Parser)]
#[command(name = "splitfetch")]
#[command(version, about = "Parallel ranged HTTP downloads with per-chunk retry", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Download a URL
    Get(GetArgs),

    /// Check range support and size without downloading
    Probe(ProbeArgs),

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();

    let guard = match setup_logging(&cli) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("{} {}", style("warning:").yellow().bold(), e);
            None
        }
    };

    let result = match cli.command {
        Commands::Get(args) => commands::get::run(args),
        Commands::Probe(args) => commands::probe::run(args),
        Commands::Config { command } => commands::config::run(command),
    };

    if let Err(e) = result {
        eprintln!("{} {}", style("error:").red().bold(), e);
        // Flush the file writer before exiting
        drop(guard);
        process::exit(1);
    }
}

/// Install logging from flags, falling back to the config file.
fn setup_logging(cli: &Cli) -> Result<LoggingGuard, CliError> {
    // An unreadable config file is reported by the command itself
    let logging = ConfigFile::load().map(|c| c.logging).unwrap_or_default();

    let level = match cli.verbose {
        0 => logging
            .level
            .unwrap_or_else(|| QUIET_LOG_LEVEL.to_string()),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    };

    let mut settings = LogSettings::default()
        .with_level(level)
        .with_ansi(console::colors_enabled_stderr());
    if let Some(file) = cli.log_file.clone().or(logging.file) {
        settings = settings.with_file(file);
    }

    Ok(init_logging(&settings)?)
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
    fn test_parse_get_with_flags() {
        let cli = Cli::try_parse_from([
            "splitfetch",
            "-vv",
            "get",
            "https://example.com/file.bin",
            "-o",
            "out.bin",
            "--threads",
            "4",
            "--no-chunk",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Get(args) => {
                assert_eq!(args.url, "https://example.com/file.bin");
                assert_eq!(args.output, Some(PathBuf::from("out.bin")));
                assert_eq!(args.transfer.threads, Some(4));
                assert!(args.transfer.no_chunk);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_config_init() {
        let cli = Cli::try_parse_from(["splitfetch", "config", "init", "--force"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                command: ConfigCommands::Init { force: true }
            }
        ));
    }
}
