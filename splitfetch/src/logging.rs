//! Tracing subscriber setup.
//!
//! Logs go to stderr and, optionally, to a file written by a background
//! thread. Timestamps use the local UTC offset when it can be determined.

use std::fs;
use std::path::{Path, PathBuf};

use time::format_description::well_known::Rfc3339;
use time::UtcOffset;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::LoggingError;

/// Level used when nothing else is configured.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// File name used when the configured log path names a directory.
const DEFAULT_LOG_FILE_NAME: &str = "splitfetch.log";

/// Where and how much to log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// A bare level (`debug`) or a full filter directive (`splitfetch=trace,reqwest=warn`).
    pub level: String,
    /// Optional log file, written in addition to stderr.
    pub file: Option<PathBuf>,
    /// Colour the stderr output.
    pub ansi: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            file: None,
            ansi: true,
        }
    }
}

impl LogSettings {
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }

    /// Filter directive for the configured level.
    ///
    /// A bare level applies to this project's crates only; dependencies stay
    /// at `warn`. Anything containing `=` or `,` is used verbatim.
    pub fn directive(&self) -> String {
        let level = self.level.trim();
        if level.contains('=') || level.contains(',') {
            level.to_string()
        } else {
            format!("warn,splitfetch={0},splitfetch_cli={0}", level)
        }
    }
}

/// Keeps the background log writer alive. Hold it until the process exits.
#[derive(Debug)]
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Install the global subscriber.
///
/// `RUST_LOG`, when set, overrides the configured level.
pub fn init_logging(settings: &LogSettings) -> Result<LoggingGuard, LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => {
            let directive = settings.directive();
            EnvFilter::try_new(&directive).map_err(|e| LoggingError::InvalidFilter {
                directive,
                reason: e.to_string(),
            })?
        }
    };

    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    let timer = OffsetTime::new(offset, Rfc3339);

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(settings.ansi)
        .with_timer(timer.clone())
        .with_target(false);

    let (file_layer, file_guard) = match settings.file {
        Some(ref path) => {
            let (dir, name) = split_log_path(path);
            fs::create_dir_all(&dir).map_err(|e| LoggingError::CreateDirFailed {
                path: dir.clone(),
                source: e,
            })?;

            let appender = tracing_appender::rolling::never(&dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_timer(timer)
                .with_thread_names(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::Install(e.to_string()))?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// Split a log path into its directory and file name.
fn split_log_path(path: &Path) -> (PathBuf, String) {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty());

    match name {
        Some(name) if !path.is_dir() => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            (dir, name)
        }
        _ => (path.to_path_buf(), DEFAULT_LOG_FILE_NAME.to_string()),
    }
}
