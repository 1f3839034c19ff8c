//! Configuration for ranged transfers.
//!
//! [`TransferConfig`] holds every engine setting. [`ConfigFile`] loads the
//! same settings from an INI file so the CLI can layer its flags on top.

mod file;

use std::time::Duration;

pub use file::{
    config_file_path, parse_size, ConfigFile, DownloadSection, LoggingSection, NetworkSection,
};

use crate::error::{TransferError, TransferResult};
use crate::transfer::{PlanPolicy, RetryPolicy};

/// Default maximum number of concurrent chunk workers.
pub const DEFAULT_MAX_THREADS: usize = 8;

/// Default preferred chunk size (2 MiB).
pub const DEFAULT_CHUNK_BYTES: u64 = 2 * 1024 * 1024;

/// Default retry budget per chunk.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default stall timeout for chunk and stream downloads.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default per-request timeout for probing requests.
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 10;

/// Resources smaller than this are fetched as a single chunk (10 MiB).
pub const DEFAULT_SMALL_FILE_THRESHOLD: u64 = 10 * 1024 * 1024;

/// Upper bound on chunks per transfer.
pub const DEFAULT_HARD_CAP_CHUNKS: usize = 16;

/// Prefix of the per-transfer temporary directory.
pub const DEFAULT_TEMP_DIR_PREFIX: &str = "temp_chunks_";

/// Settings for one [`TransferEngine`](crate::TransferEngine).
#[derive(Debug, Clone, PartialEq)]
pub struct TransferConfig {
    /// Maximum number of chunks fetched in parallel.
    pub max_threads: usize,

    /// Preferred size of each chunk in bytes.
    pub preferred_chunk_bytes: u64,

    /// Retries allowed per chunk after the first attempt.
    pub max_retries: u32,

    /// Stall timeout for chunk and stream requests: bounds connecting and
    /// each read, never the transfer as a whole.
    pub request_timeout: Duration,

    /// Timeout for each probing request.
    pub probe_timeout: Duration,

    /// Resources below this size are fetched as one chunk.
    pub small_file_threshold_bytes: u64,

    /// Hard upper bound on the number of chunks.
    pub hard_cap_chunks: usize,

    /// When false, probing is skipped and the resource is streamed in one GET.
    pub chunked: bool,

    /// First retry delay; doubles on every subsequent retry.
    pub backoff_base: Duration,

    /// Ceiling for the retry delay.
    pub backoff_cap: Duration,

    /// Fraction of a chunk that may be missing and still count as complete.
    ///
    /// Anything above zero lets a short chunk corrupt the merged output, so
    /// the default is zero.
    pub shortfall_tolerance: f64,

    /// User-Agent header sent with every request.
    pub user_agent: Option<String>,

    /// Proxy URL for all requests.
    pub proxy: Option<String>,

    /// Prefix of the temporary chunk directory created next to the output.
    pub temp_dir_prefix: String,

    /// Delete chunk artifacts when a ranged transfer fails. When false they
    /// stay in the temporary directory.
    pub cleanup_on_failure: bool,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            max_threads: DEFAULT_MAX_THREADS,
            preferred_chunk_bytes: DEFAULT_CHUNK_BYTES,
            max_retries: DEFAULT_MAX_RETRIES,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            probe_timeout: Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS),
            small_file_threshold_bytes: DEFAULT_SMALL_FILE_THRESHOLD,
            hard_cap_chunks: DEFAULT_HARD_CAP_CHUNKS,
            chunked: true,
            backoff_base: Duration::from_secs(1),
            backoff_cap: Duration::from_secs(10),
            shortfall_tolerance: 0.0,
            user_agent: None,
            proxy: None,
            temp_dir_prefix: DEFAULT_TEMP_DIR_PREFIX.to_string(),
            cleanup_on_failure: true,
        }
    }
}

impl TransferConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of parallel chunks.
    pub fn with_max_threads(mut self, max_threads: usize) -> Self {
        self.max_threads = max_threads;
        self
    }

    /// Set the preferred chunk size in bytes.
    pub fn with_preferred_chunk_bytes(mut self, bytes: u64) -> Self {
        self.preferred_chunk_bytes = bytes;
        self
    }

    /// Set the per-chunk retry budget.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the stall timeout for transfer requests.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the probe timeout.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Set the single-chunk threshold.
    pub fn with_small_file_threshold(mut self, bytes: u64) -> Self {
        self.small_file_threshold_bytes = bytes;
        self
    }

    /// Set the hard cap on chunk count.
    pub fn with_hard_cap_chunks(mut self, cap: usize) -> Self {
        self.hard_cap_chunks = cap;
        self
    }

    /// Enable or disable chunked transfers.
    pub fn with_chunked(mut self, chunked: bool) -> Self {
        self.chunked = chunked;
        self
    }

    /// Set the retry backoff base and ceiling.
    pub fn with_backoff(mut self, base: Duration, cap: Duration) -> Self {
        self.backoff_base = base;
        self.backoff_cap = cap;
        self
    }

    /// Set the accepted shortfall fraction.
    pub fn with_shortfall_tolerance(mut self, tolerance: f64) -> Self {
        self.shortfall_tolerance = tolerance;
        self
    }

    /// Set the User-Agent header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Route requests through a proxy.
    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Keep or delete chunk artifacts of a failed transfer.
    pub fn with_cleanup_on_failure(mut self, cleanup: bool) -> Self {
        self.cleanup_on_failure = cleanup;
        self
    }

    /// Check that the settings can drive a transfer.
    pub fn validate(&self) -> TransferResult<()> {
        if self.max_threads == 0 {
            return Err(TransferError::InvalidConfig(
                "max_threads must be at least 1".to_string(),
            ));
        }
        if self.preferred_chunk_bytes == 0 {
            return Err(TransferError::InvalidConfig(
                "preferred_chunk_bytes must be at least 1".to_string(),
            ));
        }
        if self.hard_cap_chunks == 0 {
            return Err(TransferError::InvalidConfig(
                "hard_cap_chunks must be at least 1".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.shortfall_tolerance) {
            return Err(TransferError::InvalidConfig(format!(
                "shortfall_tolerance must be in [0, 1), got {}",
                self.shortfall_tolerance
            )));
        }
        if self.temp_dir_prefix.is_empty() {
            return Err(TransferError::InvalidConfig(
                "temp_dir_prefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Chunk planning inputs.
    pub fn plan_policy(&self) -> PlanPolicy {
        PlanPolicy {
            max_threads: self.max_threads,
            preferred_chunk_bytes: self.preferred_chunk_bytes,
            small_file_threshold_bytes: self.small_file_threshold_bytes,
            hard_cap_chunks: self.hard_cap_chunks,
        }
    }

    /// Retry behaviour for chunk workers.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            backoff_base: self.backoff_base,
            backoff_cap: self.backoff_cap,
            shortfall_tolerance: self.shortfall_tolerance,
        }
    }
}
