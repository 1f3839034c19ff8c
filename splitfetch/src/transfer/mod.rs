//! Parallel ranged HTTP transfers.
//!
//! This module provides:
//! - An HTTP seam with a reqwest implementation (`http`)
//! - Range support and size probing (`probe`)
//! - Chunk planning (`plan`)
//! - Shared progress counters and periodic reporting (`progress`)
//! - Per-chunk fetching with retry and backoff (`worker`)
//! - Ordered reassembly of chunk artifacts (`merge`)
//! - The single-stream fallback (`single`)
//! - SHA-256 verification of the output (`checksum`)
//! - Phase tracking and chunk bookkeeping (`state`)
//! - Orchestration of all of the above (`orchestrator`)
//!
//! # Architecture
//!
//! ```text
//! TransferEngine (orchestrator)
//!         │
//!         ├── RangeProbe ──► RangeClient (trait)
//!         │                      ├── ReqwestRangeClient
//!         │                      └── in-memory server (tests)
//!         │
//!         ├── plan_chunks ──► ChunkDescriptor × N
//!         │
//!         ├── ChunkWorker × N (one thread each)
//!         │       └── ProgressAggregator (shared)
//!         │
//!         ├── merge_chunks (index order)
//!         │
//!         └── stream_to_file (no ranges / unknown size)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use splitfetch::{TransferConfig, TransferEngine};
//!
//! let engine = TransferEngine::new(TransferConfig::default().with_max_threads(4))?;
//! let outcome = engine.transfer("https://example.com/big.iso", Path::new("big.iso"))?;
//! println!("{} bytes in {:.1}s", outcome.bytes_written, outcome.elapsed_seconds());
//! ```

mod checksum;
mod http;
mod merge;
mod orchestrator;
mod plan;
mod probe;
mod progress;
mod single;
mod state;
mod worker;
mod workspace;

pub use checksum::{file_sha256, verify_sha256};
pub use http::{
    parse_content_range, parse_content_range_total, ByteRange, ContentRange, HttpResponse,
    HttpResult, RangeClient, ReqwestRangeClient, ResponseHead,
};
pub use merge::merge_chunks;
pub use orchestrator::{transfer, TransferEngine};
pub use plan::{chunk_count, plan_chunks, ChunkDescriptor, PlanPolicy, TransferTarget};
pub use probe::{ProbeOutcome, RangeProbe};
pub use progress::{
    ProgressAggregator, ProgressCallback, ProgressReporter, ProgressSnapshot,
    DEFAULT_REPORT_INTERVAL,
};
pub use single::stream_to_file;
pub use state::{ChunkLedger, PhaseTracker, TransferMode, TransferOutcome, TransferPhase};
pub use worker::{ChunkResult, ChunkWorker, RetryPolicy};
pub use workspace::{ChunkWorkspace, CleanupReport};
