//! Progress aggregation for a single transfer.
//!
//! Every worker shares one [`ProgressAggregator`]; each increment takes the
//! lock only for the counter update itself. A [`ProgressReporter`] thread
//! polls snapshots at the caller's cadence and hands them to a callback.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::warn;

/// Default interval between progress callbacks.
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_millis(100);

/// Callback receiving progress snapshots.
pub type ProgressCallback = Arc<dyn Fn(&ProgressSnapshot) + Send + Sync>;

/// Point-in-time view of a transfer's progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSnapshot {
    /// Bytes received so far.
    pub downloaded_bytes: u64,
    /// Expected total, or 0 when unknown.
    pub total_bytes: u64,
    /// Wall-clock time since the transfer started.
    pub elapsed: Duration,
    /// Average rate since the start, in bytes per second.
    pub rate_bytes_per_sec: f64,
    /// Estimated time to completion, when a rate and total are known.
    pub eta: Option<Duration>,
}

impl ProgressSnapshot {
    /// Completion percentage, when the total is known.
    pub fn percent(&self) -> Option<f64> {
        if self.total_bytes == 0 {
            None
        } else {
            Some(self.downloaded_bytes as f64 / self.total_bytes as f64 * 100.0)
        }
    }
}

#[derive(Debug)]
struct ProgressState {
    total_bytes: u64,
    downloaded_bytes: u64,
    started_at: Instant,
    last_display: Option<Instant>,
}

/// Thread-safe byte counter with derived rate and ETA.
///
/// Scoped to one transfer; create a fresh aggregator for every transfer.
#[derive(Debug)]
pub struct ProgressAggregator {
    state: Mutex<ProgressState>,
}

impl ProgressAggregator {
    /// Start tracking a transfer of `total_bytes` (0 if unknown).
    pub fn new(total_bytes: u64) -> Self {
        Self {
            state: Mutex::new(ProgressState {
                total_bytes,
                downloaded_bytes: 0,
                started_at: Instant::now(),
                last_display: None,
            }),
        }
    }

    /// Record `bytes` more received.
    pub fn add(&self, bytes: u64) {
        let mut state = self.state.lock();
        state.downloaded_bytes = state.downloaded_bytes.saturating_add(bytes);
    }

    /// Take back bytes from a failed attempt that will be fetched again.
    pub fn retract(&self, bytes: u64) {
        let mut state = self.state.lock();
        state.downloaded_bytes = state.downloaded_bytes.saturating_sub(bytes);
    }

    /// Set the expected total once it becomes known.
    pub fn set_total(&self, total_bytes: u64) {
        self.state.lock().total_bytes = total_bytes;
    }

    /// Bytes received so far.
    pub fn downloaded(&self) -> u64 {
        self.state.lock().downloaded_bytes
    }

    /// Current progress.
    ///
    /// The rate is the cumulative average since the start, not a recent
    /// window.
    pub fn snapshot(&self) -> ProgressSnapshot {
        let (downloaded, total, started_at) = {
            let state = self.state.lock();
            (state.downloaded_bytes, state.total_bytes, state.started_at)
        };
        compute_snapshot(downloaded, total, started_at.elapsed())
    }

    /// A snapshot if at least `interval` has passed since the last one
    /// returned by this method.
    pub fn snapshot_if_due(&self, interval: Duration) -> Option<ProgressSnapshot> {
        let now = Instant::now();
        let (downloaded, total, elapsed) = {
            let mut state = self.state.lock();
            if let Some(last) = state.last_display {
                if now.duration_since(last) < interval {
                    return None;
                }
            }
            state.last_display = Some(now);
            (
                state.downloaded_bytes,
                state.total_bytes,
                now.duration_since(state.started_at),
            )
        };
        Some(compute_snapshot(downloaded, total, elapsed))
    }
}

fn compute_snapshot(downloaded: u64, total: u64, elapsed: Duration) -> ProgressSnapshot {
    let secs = elapsed.as_secs_f64();
    let rate = if secs > 0.0 {
        downloaded as f64 / secs
    } else {
        0.0
    };

    let eta = if rate > 0.0 && total > 0 {
        let remaining = total.saturating_sub(downloaded) as f64;
        Some(Duration::from_secs_f64(remaining / rate))
    } else {
        None
    };

    ProgressSnapshot {
        downloaded_bytes: downloaded,
        total_bytes: total,
        elapsed,
        rate_bytes_per_sec: rate,
        eta,
    }
}

/// Background thread delivering periodic snapshots to a callback.
///
/// Stops and delivers one final snapshot when dropped.
pub struct ProgressReporter {
    handle: Option<JoinHandle<()>>,
    done: Arc<AtomicBool>,
}

impl ProgressReporter {
    /// Start reporting every `interval`.
    pub fn start(
        progress: Arc<ProgressAggregator>,
        callback: ProgressCallback,
        interval: Duration,
    ) -> Self {
        let done = Arc::new(AtomicBool::new(false));
        let done_clone = Arc::clone(&done);

        let spawned = thread::Builder::new()
            .name("progress-reporter".to_string())
            .spawn(move || {
                while !done_clone.load(Ordering::SeqCst) {
                    callback(&progress.snapshot());
                    thread::sleep(interval);
                }

                // Final report
                callback(&progress.snapshot());
            });

        let handle = match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(error = %e, "Failed to start progress reporter");
                None
            }
        };

        Self { handle, done }
    }

    /// Stop the reporter and wait for its final report.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.done.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle.join().ok();
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.shutdown();
    }
}
