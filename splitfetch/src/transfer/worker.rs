//! Chunk worker: fetches one byte range into its own artifact.
//!
//! Retries are an explicit bounded loop. Every attempt re-requests the same
//! range and overwrites the artifact from scratch; a worker never resumes
//! from an offset and never touches another chunk's range.

use std::fs::File;
use std::io::{BufWriter, ErrorKind, Read, Write};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use super::http::{ByteRange, RangeClient};
use super::plan::{ChunkDescriptor, TransferTarget};
use super::progress::ProgressAggregator;
use super::workspace::ChunkWorkspace;
use crate::error::{ChunkFailure, ChunkFetchError};

/// Buffer size for streaming response bodies (64KB).
pub(crate) const BUFFER_SIZE: usize = 64 * 1024;

/// Retry and completeness rules for chunk workers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub backoff_base: Duration,
    /// Maximum delay between retries.
    pub backoff_cap: Duration,
    /// Fraction of a chunk that may be missing and still be accepted.
    pub shortfall_tolerance: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: Duration::from_secs(1),
            backoff_cap: Duration::from_secs(10),
            shortfall_tolerance: 0.0,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry + 1`: `base * 2^retry`, capped.
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.backoff_base.saturating_mul(factor).min(self.backoff_cap)
    }

    /// Whether `actual` bytes satisfy a chunk of `expected` bytes.
    pub fn accepts(&self, expected: u64, actual: u64) -> bool {
        if actual >= expected {
            return true;
        }
        self.shortfall_tolerance > 0.0
            && actual as f64 >= expected as f64 * (1.0 - self.shortfall_tolerance)
    }
}

/// Outcome of one chunk, handed from its worker to the orchestrator.
#[derive(Debug)]
pub struct ChunkResult {
    /// Chunk index.
    pub index: usize,
    /// Bytes written by the final attempt.
    pub bytes_written: u64,
    /// Last error when the retry budget ran out.
    pub error: Option<ChunkFetchError>,
    /// Retries consumed.
    pub retries: u32,
}

impl ChunkResult {
    /// True when the chunk completed.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Failure summary for reporting, if the chunk failed.
    pub fn failure(&self) -> Option<ChunkFailure> {
        self.error.as_ref().map(|e| ChunkFailure {
            index: self.index,
            retries: self.retries,
            last_error: e.to_string(),
        })
    }
}

/// Fetches chunks of one target. Cheap to clone into worker threads.
#[derive(Clone)]
pub struct ChunkWorker {
    client: Arc<dyn RangeClient>,
    target: Arc<TransferTarget>,
    workspace: Arc<ChunkWorkspace>,
    progress: Arc<ProgressAggregator>,
    policy: RetryPolicy,
}

impl ChunkWorker {
    /// Create a worker for `target`, writing artifacts into `workspace`.
    pub fn new(
        client: Arc<dyn RangeClient>,
        target: Arc<TransferTarget>,
        workspace: Arc<ChunkWorkspace>,
        progress: Arc<ProgressAggregator>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            client,
            target,
            workspace,
            progress,
            policy,
        }
    }

    /// Fetch `descriptor`, retrying until it succeeds or the budget runs out.
    pub fn fetch(&self, descriptor: &ChunkDescriptor) -> ChunkResult {
        let path = self.workspace.artifact_path(descriptor.index);
        let mut retries = 0;

        loop {
            let mut written = 0;
            match self.attempt(descriptor, &path, &mut written) {
                Ok(bytes) => {
                    debug!(
                        chunk = descriptor.index,
                        bytes,
                        retries,
                        "Chunk complete"
                    );
                    return ChunkResult {
                        index: descriptor.index,
                        bytes_written: bytes,
                        error: None,
                        retries,
                    };
                }
                Err(e) => {
                    // The range is fetched again from scratch
                    self.progress.retract(written);

                    if !e.is_retryable() || retries >= self.policy.max_retries {
                        warn!(
                            chunk = descriptor.index,
                            retries,
                            retryable = e.is_retryable(),
                            error = %e,
                            "Chunk failed"
                        );
                        return ChunkResult {
                            index: descriptor.index,
                            bytes_written: written,
                            error: Some(e),
                            retries,
                        };
                    }

                    let delay = self.policy.backoff(retries);
                    retries += 1;
                    warn!(
                        chunk = descriptor.index,
                        attempt = retries,
                        max_retries = self.policy.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Chunk attempt failed, retrying"
                    );
                    thread::sleep(delay);
                }
            }
        }
    }

    fn attempt(
        &self,
        descriptor: &ChunkDescriptor,
        path: &Path,
        written: &mut u64,
    ) -> Result<u64, ChunkFetchError> {
        let expected = descriptor.expected_len();
        // No deadline: the client's stall timeout catches a hung server
        let mut response = self
            .client
            .get(&self.target.url, Some(descriptor.range()), None)?;

        // A 200 carries the whole resource, which only fits a whole-file chunk
        let covers_all = descriptor.start == 0 && descriptor.end + 1 == self.target.total_size;
        let status = response.head.status;
        if !(response.head.is_partial() || (status == 200 && covers_all)) {
            return Err(ChunkFetchError::UnexpectedStatus {
                status,
                start: descriptor.start,
                end: descriptor.end,
            });
        }
        if let Some(reported) = response.head.parsed_content_range() {
            self.check_content_range(descriptor, reported.range, reported.total)?;
        }

        let artifact_err = |e| ChunkFetchError::Artifact {
            path: path.to_path_buf(),
            source: e,
        };
        let file = File::create(path).map_err(artifact_err)?;
        let mut writer = BufWriter::new(file);
        let mut buffer = vec![0u8; BUFFER_SIZE];

        loop {
            let bytes_read = match response.body.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(ChunkFetchError::Body(e)),
            };

            if *written + bytes_read as u64 > expected {
                return Err(ChunkFetchError::Overrun { expected });
            }

            writer.write_all(&buffer[..bytes_read]).map_err(artifact_err)?;
            *written += bytes_read as u64;
            self.progress.add(bytes_read as u64);
        }

        writer.flush().map_err(artifact_err)?;

        if *written < expected {
            if !self.policy.accepts(expected, *written) {
                return Err(ChunkFetchError::Shortfall {
                    expected,
                    actual: *written,
                });
            }
            warn!(
                chunk = descriptor.index,
                expected,
                actual = *written,
                "Accepting incomplete chunk within shortfall tolerance"
            );
        }

        Ok(*written)
    }

    fn check_content_range(
        &self,
        descriptor: &ChunkDescriptor,
        range: Option<ByteRange>,
        total: Option<u64>,
    ) -> Result<(), ChunkFetchError> {
        if let Some(reported) = total {
            if reported != self.target.total_size {
                return Err(ChunkFetchError::TotalMismatch {
                    planned: self.target.total_size,
                    reported,
                });
            }
        }
        match range {
            Some(range) if range != descriptor.range() => Err(ChunkFetchError::RangeMismatch {
                requested_start: descriptor.start,
                requested_end: descriptor.end,
                start: range.start,
                end: range.end,
            }),
            _ => Ok(()),
        }
    }
}
