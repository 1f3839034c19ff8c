//! Terminal output for splitfetch.
//!
//! - `format` - size, rate and duration text
//! - `progress` - indicatif progress bar fed by engine snapshots

pub mod format;
pub mod progress;

pub use format::{format_duration, format_eta, format_rate, format_size};
pub use progress::TransferProgress;
