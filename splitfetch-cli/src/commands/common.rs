//! Common arguments and helpers shared across CLI commands.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Args;
use splitfetch::config::ConfigFile;
use splitfetch::TransferConfig;

use crate::error::CliError;

const MB: u64 = 1024 * 1024;

/// Transfer tuning flags. Unset flags fall back to the config file.
#[derive(Debug, Clone, Default, Args)]
pub struct TransferArgs {
    /// Maximum number of chunks fetched in parallel
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// Preferred chunk size in megabytes
    #[arg(long = "chunk-size-mb")]
    pub chunk_size_mb: Option<u64>,

    /// Retries per chunk after the first attempt
    #[arg(short = 'r', long)]
    pub retries: Option<u32>,

    /// Seconds a request may go without receiving data
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Fetch with one plain request instead of parallel ranges
    #[arg(long)]
    pub no_chunk: bool,

    /// Leave chunk files in place when a transfer fails
    #[arg(long)]
    pub keep_chunks: bool,

    /// User-Agent header to send
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Proxy URL for all requests
    #[arg(long)]
    pub proxy: Option<String>,
}

/// Load the config file from its default location.
pub fn load_config() -> Result<ConfigFile, CliError> {
    Ok(ConfigFile::load()?)
}

/// Build the engine configuration: CLI flags, then config file, then defaults.
pub fn resolve_transfer_config(args: &TransferArgs, config: &ConfigFile) -> TransferConfig {
    let mut transfer = config.to_transfer_config();

    if let Some(threads) = args.threads {
        transfer.max_threads = threads;
    }
    if let Some(mb) = args.chunk_size_mb {
        transfer.preferred_chunk_bytes = mb.saturating_mul(MB);
    }
    if let Some(retries) = args.retries {
        transfer.max_retries = retries;
    }
    if let Some(secs) = args.timeout {
        transfer.request_timeout = Duration::from_secs(secs);
    }
    if args.no_chunk {
        transfer.chunked = false;
    }
    if args.keep_chunks {
        transfer.cleanup_on_failure = false;
    }
    if let Some(ref agent) = args.user_agent {
        transfer.user_agent = Some(agent.clone());
    }
    if let Some(ref proxy) = args.proxy {
        transfer.proxy = Some(proxy.clone());
    }

    transfer
}

/// Where to write a download.
///
/// No path means `display_name` in the current directory; an existing
/// directory means `display_name` inside it.
pub fn resolve_output(output: Option<&Path>, display_name: &str) -> Result<PathBuf, CliError> {
    let path = match output {
        None => PathBuf::from(display_name),
        Some(dir) if dir.is_dir() => dir.join(display_name),
        Some(path) => path.to_path_buf(),
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.is_dir() {
            return Err(CliError::Output(format!(
                "directory does not exist: {}",
                parent.display()
            )));
        }
    }

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_flags_override_file() {
        let file = ConfigFile::parse("[download]\nmax_threads = 2\nmax_retries = 7\n").unwrap();
        let args = TransferArgs {
            threads: Some(6),
            chunk_size_mb: Some(4),
            no_chunk: true,
            keep_chunks: true,
            ..TransferArgs::default()
        };

        let config = resolve_transfer_config(&args, &file);

        assert_eq!(config.max_threads, 6);
        assert_eq!(config.max_retries, 7);
        assert_eq!(config.preferred_chunk_bytes, 4 * MB);
        assert!(!config.chunked);
        assert!(!config.cleanup_on_failure);
    }

    #[test]
    fn test_no_flags_keeps_file_values() {
        let file = ConfigFile::parse("[network]\nuser_agent = agent/1.0\n").unwrap();
        let config = resolve_transfer_config(&TransferArgs::default(), &file);

        assert_eq!(config.user_agent.as_deref(), Some("agent/1.0"));
        assert_eq!(config.max_threads, TransferConfig::default().max_threads);
    }

    #[test]
    fn test_output_defaults_to_display_name() {
        let path = resolve_output(None, "video.mp4").unwrap();
        assert_eq!(path, PathBuf::from("video.mp4"));
    }

    #[test]
    fn test_output_directory_gets_display_name() {
        let temp = TempDir::new().unwrap();
        let path = resolve_output(Some(temp.path()), "video.mp4").unwrap();
        assert_eq!(path, temp.path().join("video.mp4"));
    }

    #[test]
    fn test_output_in_missing_directory_is_rejected() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("nope").join("file.bin");

        let err = resolve_output(Some(&target), "ignored").unwrap_err();
        assert!(matches!(err, CliError::Output(_)));
    }
}
