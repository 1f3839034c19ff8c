//! splitfetch - parallel ranged HTTP downloads.
//!
//! Given a direct URL, splitfetch checks whether the server honours byte
//! ranges, splits the resource into contiguous chunks, fetches the chunks
//! concurrently with independent retry and backoff, and reassembles them in
//! order into the output file. Servers without range support, or resources
//! of unknown size, are fetched with a single sequential GET instead.
//!
//! The entry point is [`TransferEngine`]; [`transfer`] is a one-shot
//! shortcut.

pub mod config;
pub mod error;
pub mod locator;
pub mod logging;
pub mod transfer;

pub use config::{ConfigFile, TransferConfig};
pub use error::{ChunkFailure, ConfigError, TransferError, TransferResult};
pub use locator::{DirectUrl, ResourceDescriptor, ResourceLocator};
pub use logging::{init_logging, LogSettings, LoggingGuard};
pub use transfer::{
    transfer, ProbeOutcome, ProgressCallback, ProgressSnapshot, TransferEngine, TransferMode,
    TransferOutcome,
};
