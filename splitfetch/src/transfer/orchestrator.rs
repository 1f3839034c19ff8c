//! Transfer orchestration.
//!
//! [`TransferEngine`] composes probing, planning, the chunk worker pool,
//! merging and the single-stream fallback into one blocking call.

use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use super::checksum::verify_sha256;
use super::http::{ByteRange, RangeClient, ReqwestRangeClient};
use super::merge::merge_chunks;
use super::plan::{plan_chunks, TransferTarget};
use super::probe::{ProbeOutcome, RangeProbe};
use super::progress::{ProgressAggregator, ProgressCallback, ProgressReporter};
use super::single::stream_to_file;
use super::state::{ChunkLedger, PhaseTracker, TransferMode, TransferOutcome, TransferPhase};
use super::worker::ChunkWorker;
use super::workspace::ChunkWorkspace;
use crate::config::TransferConfig;
use crate::error::{ChunkFailure, TransferError, TransferResult};
use crate::locator::ResourceDescriptor;

/// Runs transfers with one configuration and HTTP client.
///
/// Each call to [`transfer`](Self::transfer) is independent: it gets its own
/// progress aggregator, temporary directory and worker pool.
pub struct TransferEngine {
    config: TransferConfig,
    client: Arc<dyn RangeClient>,
    progress: Option<(ProgressCallback, Duration)>,
}

impl std::fmt::Debug for TransferEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferEngine")
            .field("config", &self.config)
            .field("reports_progress", &self.progress.is_some())
            .finish_non_exhaustive()
    }
}

impl TransferEngine {
    /// Create an engine using the reqwest client.
    pub fn new(config: TransferConfig) -> TransferResult<Self> {
        config.validate()?;
        let client = ReqwestRangeClient::from_config(&config)?;
        Self::with_client(Arc::new(client), config)
    }

    /// Create an engine issuing requests through `client`.
    pub fn with_client(client: Arc<dyn RangeClient>, config: TransferConfig) -> TransferResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            client,
            progress: None,
        })
    }

    /// Deliver progress snapshots to `callback` every `interval`.
    pub fn with_progress(mut self, callback: ProgressCallback, interval: Duration) -> Self {
        self.progress = Some((callback, interval));
        self
    }

    /// The engine's configuration.
    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// Probe `url` for range support and size without transferring it.
    pub fn probe(&self, url: &str) -> ProbeOutcome {
        RangeProbe::new(self.client.as_ref(), self.config.probe_timeout).probe(url)
    }

    /// Download `url` to `output`.
    pub fn transfer(&self, url: &str, output: &Path) -> TransferResult<TransferOutcome> {
        self.transfer_source(&ResourceDescriptor::from_url(url), output)
    }

    /// Download a located resource to `output`.
    ///
    /// The descriptor's approximate size is used only when probing finds
    /// range support but no size; its checksum, if any, is verified once the
    /// output is complete.
    pub fn transfer_source(
        &self,
        source: &ResourceDescriptor,
        output: &Path,
    ) -> TransferResult<TransferOutcome> {
        let started = Instant::now();
        let progress = Arc::new(ProgressAggregator::new(0));
        let reporter = self.progress.as_ref().map(|(callback, interval)| {
            ProgressReporter::start(Arc::clone(&progress), Arc::clone(callback), *interval)
        });

        info!(
            url = %source.url,
            name = %source.display_name,
            output = %output.display(),
            "Starting transfer"
        );

        let mut tracker = PhaseTracker::new();
        let result = self.run(source, output, &progress, &mut tracker);

        // Final progress report before returning
        if let Some(reporter) = reporter {
            reporter.stop();
        }

        match result {
            Ok((bytes_written, mode)) => {
                let outcome = TransferOutcome {
                    bytes_written,
                    elapsed: started.elapsed(),
                    mode,
                };
                info!(
                    url = %source.url,
                    bytes = bytes_written,
                    mode = %mode,
                    elapsed_ms = outcome.elapsed.as_millis() as u64,
                    "Transfer complete"
                );
                Ok(outcome)
            }
            Err(e) => {
                let phases = tracker
                    .history()
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" -> ");
                tracker.fail(e.to_string());
                error!(url = %source.url, phases = %phases, error = %e, "Transfer failed");
                Err(e)
            }
        }
    }

    fn run(
        &self,
        source: &ResourceDescriptor,
        output: &Path,
        progress: &Arc<ProgressAggregator>,
        tracker: &mut PhaseTracker,
    ) -> TransferResult<(u64, TransferMode)> {
        tracker.advance(TransferPhase::Probing);

        let target = if self.config.chunked {
            self.resolve_target(source)
        } else {
            debug!(url = %source.url, "Chunked mode disabled");
            None
        };

        let (bytes_written, mode) = match target {
            Some(target) => self.range_transfer(target, output, progress, tracker)?,
            None => {
                tracker.advance(TransferPhase::SingleStreamTransfer);
                let written = stream_to_file(
                    self.client.as_ref(),
                    &source.url,
                    output,
                    progress,
                )?;
                (written, TransferMode::SingleStream)
            }
        };

        if let Some(ref expected) = source.sha256 {
            verify_sha256(output, expected)?;
            debug!(output = %output.display(), "Checksum verified");
        }

        tracker.advance(TransferPhase::Done);
        Ok((bytes_written, mode))
    }

    /// Probe and build a target, or `None` to fall back to a single stream.
    fn resolve_target(&self, source: &ResourceDescriptor) -> Option<TransferTarget> {
        let outcome = self.probe(&source.url);
        if !outcome.supports_ranges {
            info!(url = %source.url, "Range requests unsupported, using single stream");
            return None;
        }

        let (total_size, size_is_approximate) = match outcome.total_size {
            Some(size) => (size, false),
            None => match source.approximate_size.filter(|&size| size > 0) {
                Some(size) => {
                    warn!(
                        url = %source.url,
                        approximate_size = size,
                        "Size discovery failed, planning with approximate size"
                    );
                    (size, true)
                }
                None => {
                    info!(url = %source.url, "Size unknown, using single stream");
                    return None;
                }
            },
        };

        Some(TransferTarget {
            url: source.url.clone(),
            total_size,
            supports_ranges: true,
            size_is_approximate,
        })
    }

    /// Check that an approximately sized resource ends where the plan does.
    ///
    /// Asks for the byte just past the planned end: a server honouring
    /// ranges answers 416 when there is none.
    fn confirm_end(&self, target: &TransferTarget) -> TransferResult<()> {
        let wrong = |detail: String| TransferError::ApproximateSizeWrong {
            url: target.url.clone(),
            planned: target.total_size,
            detail,
        };
        let past_end = ByteRange::new(target.total_size, target.total_size);

        let response = self
            .client
            .get(&target.url, Some(past_end), Some(self.config.probe_timeout))
            .map_err(|e| wrong(format!("could not confirm the end: {}", e)))?;
        let head = &response.head;

        match head.status {
            416 => match head.content_range_total() {
                Some(total) if total != target.total_size => {
                    Err(wrong(format!("server reports {} bytes", total)))
                }
                _ => Ok(()),
            },
            206 => Err(wrong("resource continues past the planned end".to_string())),
            200 if head.content_length == Some(target.total_size) => Ok(()),
            status => Err(wrong(format!(
                "unexpected HTTP status {} past the planned end",
                status
            ))),
        }
    }

    /// Delete a failed transfer's artifacts, or keep them when configured to.
    fn discard(&self, workspace: &ChunkWorkspace) {
        if !self.config.cleanup_on_failure {
            info!(dir = %workspace.path().display(), "Keeping chunk artifacts of failed transfer");
            return;
        }

        let report = workspace.cleanup();
        if !report.is_clean() {
            warn!(
                dir = %workspace.path().display(),
                removed = report.removed,
                left_behind = report.failures.len(),
                "Chunk workspace only partly removed"
            );
        }
    }

    fn range_transfer(
        &self,
        target: TransferTarget,
        output: &Path,
        progress: &Arc<ProgressAggregator>,
        tracker: &mut PhaseTracker,
    ) -> TransferResult<(u64, TransferMode)> {
        let chunks = plan_chunks(target.total_size, &self.config.plan_policy());
        tracker.advance(TransferPhase::RangeTransfer {
            chunks: chunks.len(),
        });
        progress.set_total(target.total_size);

        let parent = output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let workspace = Arc::new(ChunkWorkspace::create(
            parent,
            &self.config.temp_dir_prefix,
        )?);

        info!(
            url = %target.url,
            total_size = target.total_size,
            chunks = chunks.len(),
            "Starting ranged transfer"
        );

        let target = Arc::new(target);
        let worker = ChunkWorker::new(
            Arc::clone(&self.client),
            Arc::clone(&target),
            Arc::clone(&workspace),
            Arc::clone(progress),
            self.config.retry_policy(),
        );

        // One thread per chunk; every worker runs to its own terminal outcome
        let mut ledger = ChunkLedger::new(chunks.len());
        let mut handles = Vec::with_capacity(chunks.len());
        for &chunk in &chunks {
            let worker = worker.clone();
            let spawned = thread::Builder::new()
                .name(format!("chunk-{}", chunk.index))
                .spawn(move || worker.fetch(&chunk));

            match spawned {
                Ok(handle) => handles.push((chunk.index, handle)),
                Err(e) => ledger.failures.push(ChunkFailure {
                    index: chunk.index,
                    retries: 0,
                    last_error: format!("failed to start worker: {}", e),
                }),
            }
        }

        for (index, handle) in handles {
            match handle.join() {
                Ok(result) => ledger.record(&result),
                Err(_) => ledger.record_lost(index),
            }
        }

        if !ledger.is_complete() {
            let failures = ledger.take_failures();
            warn!(
                failed = failures.len(),
                completed = ledger.completed_chunks,
                "Chunks failed, aborting transfer"
            );
            self.discard(&workspace);
            return Err(TransferError::Aborted { failures });
        }

        if target.size_is_approximate {
            if let Err(e) = self.confirm_end(&target) {
                self.discard(&workspace);
                return Err(e);
            }
        }

        tracker.advance(TransferPhase::Merging);
        let written = match merge_chunks(&workspace, output, &chunks) {
            Ok(written) => written,
            Err(e) => {
                self.discard(&workspace);
                return Err(e.into());
            }
        };

        if written != target.total_size {
            return Err(TransferError::SizeMismatch {
                path: output.to_path_buf(),
                expected: target.total_size,
                actual: written,
            });
        }

        Ok((
            written,
            TransferMode::Ranged {
                chunks: chunks.len(),
            },
        ))
    }
}

/// Download `url` to `output` with a fresh engine built from `config`.
pub fn transfer(url: &str, output: &Path, config: TransferConfig) -> TransferResult<TransferOutcome> {
    TransferEngine::new(config)?.transfer(url, output)
}
