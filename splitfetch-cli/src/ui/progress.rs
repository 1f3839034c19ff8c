//! Progress bar driven by engine snapshots.

use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use splitfetch::{ProgressCallback, ProgressSnapshot};

use super::format::{format_eta, format_rate};

const BAR_TEMPLATE: &str =
    "{spinner:.green} {prefix:.bold} [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}";
const SPINNER_TEMPLATE: &str = "{spinner:.green} {prefix:.bold} {bytes} {msg}";

/// Terminal progress display for one transfer.
///
/// Rate and ETA come from the engine's snapshot; indicatif only renders.
#[derive(Clone)]
pub struct TransferProgress {
    bar: ProgressBar,
}

impl TransferProgress {
    /// Visible progress bar labelled with `name`.
    pub fn new(name: &str) -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(style(SPINNER_TEMPLATE));
        bar.set_prefix(name.to_string());
        Self { bar }
    }

    /// Progress display that draws nothing.
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Apply one snapshot.
    pub fn update(&self, snapshot: &ProgressSnapshot) {
        if snapshot.total_bytes > 0 && self.bar.length() != Some(snapshot.total_bytes) {
            self.bar.set_length(snapshot.total_bytes);
            self.bar.set_style(style(BAR_TEMPLATE));
        }
        self.bar.set_position(snapshot.downloaded_bytes);
        self.bar.set_message(format!(
            "{}  ETA {}",
            format_rate(snapshot.rate_bytes_per_sec),
            format_eta(snapshot.eta)
        ));
    }

    /// Callback to hand to the engine.
    pub fn callback(&self) -> ProgressCallback {
        let progress = self.clone();
        Arc::new(move |snapshot: &ProgressSnapshot| progress.update(snapshot))
    }

    /// Remove the bar from the terminal.
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    #[cfg(test)]
    fn position(&self) -> u64 {
        self.bar.position()
    }
}

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn snapshot(downloaded: u64, total: u64) -> ProgressSnapshot {
        ProgressSnapshot {
            downloaded_bytes: downloaded,
            total_bytes: total,
            elapsed: Duration::from_secs(1),
            rate_bytes_per_sec: downloaded as f64,
            eta: None,
        }
    }

    #[test]
    fn test_callback_updates_position() {
        let progress = TransferProgress::hidden();
        let callback = progress.callback();

        callback(&snapshot(100, 1000));
        callback(&snapshot(600, 1000));

        assert_eq!(progress.position(), 600);
    }

    #[test]
    fn test_templates_parse() {
        assert!(ProgressStyle::with_template(BAR_TEMPLATE).is_ok());
        assert!(ProgressStyle::with_template(SPINNER_TEMPLATE).is_ok());
    }
}
