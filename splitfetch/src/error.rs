//! Error types for ranged transfers.
//!
//! Errors are layered the same way failures propagate through a transfer:
//!
//! - [`HttpError`]: a single request could not be issued or timed out.
//! - [`ChunkFetchError`]: one attempt at one chunk failed. Workers absorb
//!   these and retry; they never reach the caller directly.
//! - [`MergeError`]: an artifact could not be read or the output written.
//! - [`TransferError`]: the whole transfer failed. This is what callers see.
//!
//! Probe failures are deliberately absent: probing degrades to
//! "unsupported" or "size unknown" and logs a warning instead.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for transfer operations.
pub type TransferResult<T> = Result<T, TransferError>;

/// Errors raised by the HTTP layer for a single request.
#[derive(Debug, Error)]
pub enum HttpError {
    /// The request did not complete within its timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    /// The request failed before a response was received.
    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    /// The underlying HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),
}

/// A failed attempt at fetching one chunk.
#[derive(Debug, Error)]
pub enum ChunkFetchError {
    /// The request itself failed.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// The server answered with a status that cannot satisfy the range.
    #[error("unexpected HTTP status {status} for bytes {start}-{end}")]
    UnexpectedStatus { status: u16, start: u64, end: u64 },

    /// The chunk artifact could not be created or written.
    #[error("failed to write chunk artifact {}: {source}", path.display())]
    Artifact { path: PathBuf, source: io::Error },

    /// Reading the response body failed part way through.
    #[error("error reading response body: {0}")]
    Body(#[source] io::Error),

    /// The body ended before the requested range was complete.
    #[error("incomplete chunk: expected {expected} bytes, received {actual}")]
    Shortfall { expected: u64, actual: u64 },

    /// The server sent more bytes than were requested.
    #[error("server sent more than the {expected} bytes requested")]
    Overrun { expected: u64 },

    /// The server answered with a different range than the one requested.
    #[error("requested bytes {requested_start}-{requested_end}, server sent {start}-{end}")]
    RangeMismatch {
        requested_start: u64,
        requested_end: u64,
        start: u64,
        end: u64,
    },

    /// The server reports a resource size other than the planned one.
    #[error("planned for {planned} bytes but the server reports {reported}")]
    TotalMismatch { planned: u64, reported: u64 },
}

impl ChunkFetchError {
    /// Whether another attempt at the same range could succeed.
    ///
    /// A size disagreement means the plan itself is wrong.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ChunkFetchError::TotalMismatch { .. })
    }
}

/// Errors raised while concatenating chunk artifacts.
#[derive(Debug, Error)]
pub enum MergeError {
    /// A chunk reported success but its artifact is gone.
    #[error("artifact for chunk {index} is missing: {}", path.display())]
    MissingArtifact { index: usize, path: PathBuf },

    /// An artifact could not be read.
    #[error("failed to read {}: {source}", path.display())]
    ReadFailed { path: PathBuf, source: io::Error },

    /// The output file could not be created or written.
    #[error("failed to write {}: {source}", path.display())]
    WriteFailed { path: PathBuf, source: io::Error },
}

/// Terminal failure of one chunk, as reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFailure {
    /// Zero-based chunk index.
    pub index: usize,
    /// Retries consumed before giving up.
    pub retries: u32,
    /// Text of the last underlying error.
    pub last_error: String,
}

impl std::fmt::Display for ChunkFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "chunk {} after {} retries: {}",
            self.index, self.retries, self.last_error
        )
    }
}

/// Errors that end a transfer.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The transfer configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A directory needed by the transfer could not be created.
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDirFailed { path: PathBuf, source: io::Error },

    /// One or more chunks exhausted their retry budget.
    #[error("transfer aborted, {} chunk(s) failed: {}", failures.len(), join_failures(failures))]
    Aborted { failures: Vec<ChunkFailure> },

    /// The produced file does not have the expected size. The file is kept.
    #[error("size mismatch for {}: expected {expected} bytes, wrote {actual}", path.display())]
    SizeMismatch {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    /// The resource does not end where the approximate size said it would.
    #[error("approximate size {planned} for {url} is wrong: {detail}")]
    ApproximateSizeWrong {
        url: String,
        planned: u64,
        detail: String,
    },

    /// Chunk artifacts could not be merged into the output.
    #[error("merge failed: {0}")]
    Merge(#[from] MergeError),

    /// The single-stream fallback download failed.
    #[error("download of {url} failed: {reason}")]
    StreamFailed { url: String, reason: String },

    /// The produced file does not match the expected checksum. The file is kept.
    #[error("checksum mismatch for {}: expected {expected}, got {actual}", path.display())]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    /// The resource locator could not produce a fetchable URL.
    #[error("failed to locate resource: {0}")]
    Locate(String),

    /// HTTP client setup failed.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// Other file system failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl TransferError {
    /// Whether the output file is left on disk for inspection.
    pub fn retains_output(&self) -> bool {
        matches!(
            self,
            TransferError::SizeMismatch { .. } | TransferError::ChecksumMismatch { .. }
        )
    }
}

fn join_failures(failures: &[ChunkFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors raised while loading or saving the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read or parsed.
    #[error("failed to read config {}: {reason}", path.display())]
    ReadFailed { path: PathBuf, reason: String },

    /// The file could not be written.
    #[error("failed to write config {}: {source}", path.display())]
    WriteFailed { path: PathBuf, source: io::Error },

    /// A key holds a value that cannot be parsed.
    #[error("invalid value '{value}' for {section}.{key}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
    },

    /// No home directory could be determined for the default location.
    #[error("could not determine home directory")]
    NoHomeDir,
}

/// Errors raised while installing the tracing subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The filter directive could not be parsed.
    #[error("invalid log filter '{directive}': {reason}")]
    InvalidFilter { directive: String, reason: String },

    /// The log file's directory could not be created.
    #[error("failed to create log directory {}: {source}", path.display())]
    CreateDirFailed { path: PathBuf, source: io::Error },

    /// A global subscriber is already installed.
    #[error("failed to install subscriber: {0}")]
    Install(String),
}
