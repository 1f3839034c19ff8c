//! CLI error type.

use std::fmt;

use splitfetch::error::{ConfigError, LoggingError};
use splitfetch::TransferError;

/// Errors reported to the user before exiting with status 1.
#[derive(Debug)]
pub enum CliError {
    /// Configuration could not be loaded, saved or applied.
    Config(String),
    /// Logging could not be initialised.
    Logging(String),
    /// The transfer failed.
    Transfer(TransferError),
    /// The output location is unusable.
    Output(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Logging(msg) => write!(f, "Logging error: {}", msg),
            CliError::Transfer(e) => {
                write!(f, "Download failed: {}", e)?;
                if e.retains_output() {
                    write!(f, " (output kept for inspection)")?;
                }
                Ok(())
            }
            CliError::Output(msg) => write!(f, "Output error: {}", msg),
        }
    }
}

impl std::error::Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e.to_string())
    }
}

impl From<TransferError> for CliError {
    fn from(e: TransferError) -> Self {
        match e {
            TransferError::InvalidConfig(msg) => CliError::Config(msg),
            other => CliError::Transfer(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_invalid_config_maps_to_config_error() {
        let err: CliError = TransferError::InvalidConfig("max_threads must be at least 1".into()).into();
        assert_eq!(
            err.to_string(),
            "Configuration error: max_threads must be at least 1"
        );
    }

    #[test]
    fn test_retained_output_is_mentioned() {
        let err: CliError = TransferError::SizeMismatch {
            path: PathBuf::from("out.bin"),
            expected: 10,
            actual: 9,
        }
        .into();
        assert!(err.to_string().ends_with("(output kept for inspection)"));
    }
}
