//! Transfer state: the phase machine and the per-transfer chunk ledger.

use std::fmt;
use std::time::Duration;

use tracing::debug;

use super::worker::ChunkResult;
use crate::error::ChunkFailure;

/// Phase of a single transfer.
///
/// ```text
/// Planning -> Probing -> RangeTransfer -> Merging -> Done
///                    \-> SingleStreamTransfer ----/
/// ```
///
/// `Failed` is reachable from every non-terminal phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferPhase {
    Planning,
    Probing,
    RangeTransfer { chunks: usize },
    SingleStreamTransfer,
    Merging,
    Done,
    Failed(String),
}

impl TransferPhase {
    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferPhase::Done | TransferPhase::Failed(_))
    }

    /// Whether moving to `next` is a legal transition.
    pub fn can_transition_to(&self, next: &TransferPhase) -> bool {
        use TransferPhase::*;

        if self.is_terminal() {
            return false;
        }
        if matches!(next, Failed(_)) {
            return true;
        }

        matches!(
            (self, next),
            (Planning, Probing)
                | (Probing, RangeTransfer { .. })
                | (Probing, SingleStreamTransfer)
                | (RangeTransfer { .. }, Merging)
                | (SingleStreamTransfer, Done)
                | (Merging, Done)
        )
    }
}

impl fmt::Display for TransferPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferPhase::Planning => write!(f, "planning"),
            TransferPhase::Probing => write!(f, "probing"),
            TransferPhase::RangeTransfer { chunks } => write!(f, "range transfer ({} chunks)", chunks),
            TransferPhase::SingleStreamTransfer => write!(f, "single-stream transfer"),
            TransferPhase::Merging => write!(f, "merging"),
            TransferPhase::Done => write!(f, "done"),
            TransferPhase::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Tracks the current phase and rejects illegal transitions.
#[derive(Debug)]
pub struct PhaseTracker {
    phase: TransferPhase,
    history: Vec<TransferPhase>,
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseTracker {
    /// Start in [`TransferPhase::Planning`].
    pub fn new() -> Self {
        Self {
            phase: TransferPhase::Planning,
            history: vec![TransferPhase::Planning],
        }
    }

    /// Current phase.
    pub fn phase(&self) -> &TransferPhase {
        &self.phase
    }

    /// Every phase entered so far, in order.
    pub fn history(&self) -> &[TransferPhase] {
        &self.history
    }

    /// Move to `next`. Returns false, leaving the phase unchanged, if the
    /// transition is illegal.
    pub fn advance(&mut self, next: TransferPhase) -> bool {
        if !self.phase.can_transition_to(&next) {
            debug!(from = %self.phase, to = %next, "Ignoring illegal phase transition");
            return false;
        }
        debug!(from = %self.phase, to = %next, "Transfer phase change");
        self.history.push(next.clone());
        self.phase = next;
        true
    }

    /// Move to `Failed(reason)`.
    pub fn fail(&mut self, reason: impl Into<String>) -> bool {
        self.advance(TransferPhase::Failed(reason.into()))
    }
}

/// Outcome of every chunk in a range transfer, collected by the orchestrator.
#[derive(Debug, Clone, Default)]
pub struct ChunkLedger {
    /// Chunks in the plan.
    pub total_chunks: usize,
    /// Chunks that completed.
    pub completed_chunks: usize,
    /// Bytes written by completed chunks.
    pub bytes_written: u64,
    /// Chunks that exhausted their retries.
    pub failures: Vec<ChunkFailure>,
}

impl ChunkLedger {
    /// Ledger for a plan of `total_chunks`.
    pub fn new(total_chunks: usize) -> Self {
        Self {
            total_chunks,
            ..Self::default()
        }
    }

    /// Record one worker's terminal result.
    pub fn record(&mut self, result: &ChunkResult) {
        match result.failure() {
            Some(failure) => self.failures.push(failure),
            None => {
                self.completed_chunks += 1;
                self.bytes_written += result.bytes_written;
            }
        }
    }

    /// Record a worker that died without producing a result.
    pub fn record_lost(&mut self, index: usize) {
        self.failures.push(ChunkFailure {
            index,
            retries: 0,
            last_error: "worker thread panicked".to_string(),
        });
    }

    /// Whether every chunk completed.
    pub fn is_complete(&self) -> bool {
        self.completed_chunks == self.total_chunks && self.failures.is_empty()
    }

    /// Take the failures, ordered by chunk index.
    pub fn take_failures(&mut self) -> Vec<ChunkFailure> {
        let mut failures = std::mem::take(&mut self.failures);
        failures.sort_by_key(|f| f.index);
        failures
    }
}

/// How a transfer moved its bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    /// Parallel byte-range chunks.
    Ranged { chunks: usize },
    /// One sequential GET.
    SingleStream,
}

impl fmt::Display for TransferMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferMode::Ranged { chunks } => write!(f, "ranged, {} chunks", chunks),
            TransferMode::SingleStream => write!(f, "single stream"),
        }
    }
}

/// Result of a successful transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOutcome {
    /// Bytes in the output file.
    pub bytes_written: u64,
    /// Wall-clock duration of the transfer.
    pub elapsed: Duration,
    /// How the bytes were fetched.
    pub mode: TransferMode,
}

impl TransferOutcome {
    /// Elapsed time in seconds.
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChunkFetchError;

    #[test]
    fn test_ranged_path_transitions() {
        let mut tracker = PhaseTracker::new();

        assert!(tracker.advance(TransferPhase::Probing));
        assert!(tracker.advance(TransferPhase::RangeTransfer { chunks: 4 }));
        assert!(tracker.advance(TransferPhase::Merging));
        assert!(tracker.advance(TransferPhase::Done));
        assert_eq!(tracker.history().len(), 5);
    }

    #[test]
    fn test_single_stream_path_skips_merging() {
        let mut tracker = PhaseTracker::new();

        assert!(tracker.advance(TransferPhase::Probing));
        assert!(tracker.advance(TransferPhase::SingleStreamTransfer));
        assert!(!tracker.advance(TransferPhase::Merging));
        assert!(tracker.advance(TransferPhase::Done));
    }

    #[test]
    fn test_planning_cannot_skip_probing() {
        let mut tracker = PhaseTracker::new();
        assert!(!tracker.advance(TransferPhase::RangeTransfer { chunks: 1 }));
        assert_eq!(tracker.phase(), &TransferPhase::Planning);
    }

    #[test]
    fn test_failed_reachable_from_every_live_phase() {
        let live = [
            TransferPhase::Planning,
            TransferPhase::Probing,
            TransferPhase::RangeTransfer { chunks: 2 },
            TransferPhase::SingleStreamTransfer,
            TransferPhase::Merging,
        ];
        for phase in &live {
            assert!(phase.can_transition_to(&TransferPhase::Failed("x".to_string())));
        }
    }

    #[test]
    fn test_terminal_phases_are_final() {
        let mut tracker = PhaseTracker::new();
        tracker.fail("probe exploded");

        assert!(tracker.phase().is_terminal());
        assert!(!tracker.advance(TransferPhase::Probing));
        assert!(!tracker.fail("again"));
        assert!(!TransferPhase::Done.can_transition_to(&TransferPhase::Failed("x".into())));
    }

    #[test]
    fn test_ledger_records_results() {
        let mut ledger = ChunkLedger::new(3);
        ledger.record(&ChunkResult {
            index: 0,
            bytes_written: 100,
            error: None,
            retries: 0,
        });
        ledger.record(&ChunkResult {
            index: 2,
            bytes_written: 10,
            error: Some(ChunkFetchError::Shortfall {
                expected: 100,
                actual: 10,
            }),
            retries: 3,
        });
        ledger.record_lost(1);

        assert!(!ledger.is_complete());
        assert_eq!(ledger.failures.len(), 2);
        assert_eq!(ledger.bytes_written, 100);

        let failures = ledger.take_failures();
        assert_eq!(
            failures.iter().map(|f| f.index).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert_eq!(failures[1].retries, 3);
        assert!(ledger.failures.is_empty());
    }

    #[test]
    fn test_outcome_elapsed_seconds() {
        let outcome = TransferOutcome {
            bytes_written: 1,
            elapsed: Duration::from_millis(1500),
            mode: TransferMode::SingleStream,
        };
        assert_eq!(outcome.elapsed_seconds(), 1.5);
        assert_eq!(TransferMode::Ranged { chunks: 4 }.to_string(), "ranged, 4 chunks");
    }
}
