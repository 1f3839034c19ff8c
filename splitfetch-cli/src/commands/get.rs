//! `splitfetch get`: download a URL.

use std::path::PathBuf;

use clap::Args;
use console::style;
use splitfetch::transfer::DEFAULT_REPORT_INTERVAL;
use splitfetch::{DirectUrl, ResourceLocator, TransferEngine, TransferError};
use tracing::debug;

use super::common::{load_config, resolve_output, resolve_transfer_config, TransferArgs};
use crate::error::CliError;
use crate::ui::{format_duration, format_rate, format_size, TransferProgress};

/// Arguments for `get`.
#[derive(Debug, Args)]
pub struct GetArgs {
    /// URL to download
    pub url: String,

    /// Output file or directory (defaults to the URL's file name)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Expected SHA-256 of the downloaded file
    #[arg(long)]
    pub sha256: Option<String>,

    /// Do not draw a progress bar
    #[arg(long)]
    pub no_progress: bool,

    #[command(flatten)]
    pub transfer: TransferArgs,
}

/// Run the `get` command.
pub fn run(args: GetArgs) -> Result<(), CliError> {
    let config = load_config()?;
    let transfer_config = resolve_transfer_config(&args.transfer, &config);
    debug!(config = ?transfer_config, "Resolved transfer configuration");

    let mut source = DirectUrl.locate(&args.url).map_err(CliError::from)?;
    if let Some(digest) = args.sha256 {
        source = source.with_sha256(digest);
    }
    let output = resolve_output(args.output.as_deref(), &source.display_name)?;

    let progress = if args.no_progress || !console::Term::stderr().is_term() {
        TransferProgress::hidden()
    } else {
        TransferProgress::new(&source.display_name)
    };

    let engine = TransferEngine::new(transfer_config)?
        .with_progress(progress.callback(), DEFAULT_REPORT_INTERVAL);

    let result = engine.transfer_source(&source, &output);
    progress.finish();

    match result {
        Ok(outcome) => {
            let secs = outcome.elapsed_seconds();
            let rate = if secs > 0.0 {
                outcome.bytes_written as f64 / secs
            } else {
                0.0
            };
            println!(
                "{} {} ({}) in {} at {} [{}]",
                style("Saved").green().bold(),
                output.display(),
                format_size(outcome.bytes_written),
                format_duration(outcome.elapsed),
                format_rate(rate),
                outcome.mode
            );
            Ok(())
        }
        Err(TransferError::Aborted { failures }) => {
            for failure in &failures {
                eprintln!("  {} {}", style("x").red(), failure);
            }
            Err(CliError::Transfer(TransferError::Aborted { failures }))
        }
        Err(e) => Err(e.into()),
    }
}
