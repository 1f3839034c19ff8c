//! `splitfetch probe`: report range support and size without downloading.

use std::time::Duration;

use clap::Args;
use console::style;
use splitfetch::transfer::{chunk_count, ProbeOutcome};
use splitfetch::{TransferConfig, TransferEngine};

use super::common::{load_config, resolve_transfer_config, TransferArgs};
use crate::error::CliError;
use crate::ui::format_size;

/// Arguments for `probe`.
#[derive(Debug, Args)]
pub struct ProbeArgs {
    /// URL to probe
    pub url: String,

    /// Per-request probe timeout in seconds
    #[arg(long)]
    pub probe_timeout: Option<u64>,

    #[command(flatten)]
    pub transfer: TransferArgs,
}

/// Run the `probe` command.
pub fn run(args: ProbeArgs) -> Result<(), CliError> {
    let config = load_config()?;
    let mut transfer_config = resolve_transfer_config(&args.transfer, &config);
    if let Some(secs) = args.probe_timeout {
        transfer_config.probe_timeout = Duration::from_secs(secs);
    }

    let engine = TransferEngine::new(transfer_config)?;
    let outcome = engine.probe(&args.url);

    for line in describe(&outcome, engine.config()) {
        println!("{}", line);
    }
    Ok(())
}

/// Report lines for a probe result.
fn describe(outcome: &ProbeOutcome, config: &TransferConfig) -> Vec<String> {
    let ranges = if outcome.supports_ranges {
        style("yes").green().to_string()
    } else {
        style("no").yellow().to_string()
    };
    let size = outcome
        .total_size
        .map(|s| format!("{} ({} bytes)", format_size(s), s))
        .unwrap_or_else(|| "unknown".to_string());

    let plan = match outcome.total_size {
        Some(total) if outcome.supports_ranges && config.chunked => {
            format!("{} chunk(s)", chunk_count(total, &config.plan_policy()))
        }
        _ => "single stream".to_string(),
    };

    vec![
        format!("Range requests: {}", ranges),
        format!("Size:           {}", size),
        format!("Plan:           {}", plan),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_rangeable() {
        console::set_colors_enabled(false);
        let outcome = ProbeOutcome {
            supports_ranges: true,
            total_size: Some(100 * 1024 * 1024),
        };

        let lines = describe(&outcome, &TransferConfig::default());

        assert_eq!(lines[0], "Range requests: yes");
        assert_eq!(lines[1], "Size:           100.00 MB (104857600 bytes)");
        assert_eq!(lines[2], "Plan:           8 chunk(s)");
    }

    #[test]
    fn test_describe_unsupported() {
        console::set_colors_enabled(false);
        let outcome = ProbeOutcome {
            supports_ranges: false,
            total_size: None,
        };

        let lines = describe(&outcome, &TransferConfig::default());

        assert_eq!(lines[0], "Range requests: no");
        assert_eq!(lines[1], "Size:           unknown");
        assert_eq!(lines[2], "Plan:           single stream");
    }
}
