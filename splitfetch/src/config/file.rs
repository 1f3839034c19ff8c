//! INI configuration file.
//!
//! The file lives at `~/.splitfetch/config.ini` by default:
//!
//! ```ini
//! [download]
//! max_threads = 8
//! chunk_size = 2MB
//! max_retries = 3
//! timeout = 30
//! probe_timeout = 10
//! small_file_threshold = 10MB
//! max_chunks = 16
//! chunked = true
//! auto_cleanup = true
//!
//! [network]
//! user_agent = Mozilla/5.0
//! proxy = http://127.0.0.1:3128
//!
//! [logging]
//! level = info
//! file = /var/log/splitfetch.log
//! ```
//!
//! Missing keys keep their defaults; a missing file yields the defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::{Ini, Properties};

use super::{
    TransferConfig, DEFAULT_CHUNK_BYTES, DEFAULT_HARD_CAP_CHUNKS, DEFAULT_MAX_RETRIES,
    DEFAULT_MAX_THREADS, DEFAULT_PROBE_TIMEOUT_SECS, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_SMALL_FILE_THRESHOLD,
};
use crate::error::ConfigError;

const KB: u64 = 1024;
const MB: u64 = 1024 * KB;
const GB: u64 = 1024 * MB;

/// `[download]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSection {
    pub max_threads: usize,
    pub chunk_size: u64,
    pub max_retries: u32,
    pub timeout_secs: u64,
    pub probe_timeout_secs: u64,
    pub small_file_threshold: u64,
    pub max_chunks: usize,
    pub chunked: bool,
    /// Delete chunk artifacts of a failed transfer.
    pub auto_cleanup: bool,
}

impl Default for DownloadSection {
    fn default() -> Self {
        Self {
            max_threads: DEFAULT_MAX_THREADS,
            chunk_size: DEFAULT_CHUNK_BYTES,
            max_retries: DEFAULT_MAX_RETRIES,
            timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
            small_file_threshold: DEFAULT_SMALL_FILE_THRESHOLD,
            max_chunks: DEFAULT_HARD_CAP_CHUNKS,
            chunked: true,
            auto_cleanup: true,
        }
    }
}

/// `[network]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkSection {
    pub user_agent: Option<String>,
    pub proxy: Option<String>,
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingSection {
    /// Default filter directive, e.g. `info` or `splitfetch=debug`.
    pub level: Option<String>,
    /// Optional log file.
    pub file: Option<PathBuf>,
}

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub download: DownloadSection,
    pub network: NetworkSection,
    pub logging: LoggingSection,
}

/// Default configuration file location.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|home| home.join(".splitfetch").join("config.ini"))
        .ok_or(ConfigError::NoHomeDir)
}

impl ConfigFile {
    /// Load from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path()?)
    }

    /// Load from `path`, falling back to defaults when it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Self::from_ini(&ini)
    }

    /// Parse from INI text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::ReadFailed {
            path: PathBuf::from("<string>"),
            reason: e.to_string(),
        })?;

        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(section) = ini.section(Some("download")) {
            let download = &mut config.download;
            if let Some(v) = parse_number(section, "download", "max_threads")? {
                download.max_threads = v;
            }
            if let Some(v) = parse_size_key(section, "download", "chunk_size")? {
                download.chunk_size = v;
            }
            if let Some(v) = parse_number(section, "download", "max_retries")? {
                download.max_retries = v;
            }
            if let Some(v) = parse_number(section, "download", "timeout")? {
                download.timeout_secs = v;
            }
            if let Some(v) = parse_number(section, "download", "probe_timeout")? {
                download.probe_timeout_secs = v;
            }
            if let Some(v) = parse_size_key(section, "download", "small_file_threshold")? {
                download.small_file_threshold = v;
            }
            if let Some(v) = parse_number(section, "download", "max_chunks")? {
                download.max_chunks = v;
            }
            if let Some(v) = parse_bool(section, "download", "chunked")? {
                download.chunked = v;
            }
            if let Some(v) = parse_bool(section, "download", "auto_cleanup")? {
                download.auto_cleanup = v;
            }
        }

        if let Some(section) = ini.section(Some("network")) {
            config.network.user_agent = non_empty(section.get("user_agent"));
            config.network.proxy = non_empty(section.get("proxy"));
        }

        if let Some(section) = ini.section(Some("logging")) {
            config.logging.level = non_empty(section.get("level"));
            config.logging.file = non_empty(section.get("file")).map(PathBuf::from);
        }

        Ok(config)
    }

    /// Write to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path()?)
    }

    /// Write to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut ini = Ini::new();
        let d = &self.download;
        ini.with_section(Some("download"))
            .set("max_threads", d.max_threads.to_string())
            .set("chunk_size", format_size_value(d.chunk_size))
            .set("max_retries", d.max_retries.to_string())
            .set("timeout", d.timeout_secs.to_string())
            .set("probe_timeout", d.probe_timeout_secs.to_string())
            .set("small_file_threshold", format_size_value(d.small_file_threshold))
            .set("max_chunks", d.max_chunks.to_string())
            .set("chunked", d.chunked.to_string())
            .set("auto_cleanup", d.auto_cleanup.to_string());
        ini.with_section(Some("network"))
            .set("user_agent", self.network.user_agent.clone().unwrap_or_default())
            .set("proxy", self.network.proxy.clone().unwrap_or_default());
        ini.with_section(Some("logging"))
            .set("level", self.logging.level.clone().unwrap_or_default())
            .set(
                "file",
                self.logging
                    .file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
            );

        ini.write_to_file(path)
            .map_err(|e| ConfigError::WriteFailed {
                path: path.to_path_buf(),
                source: e,
            })
    }

    /// Engine settings described by this file.
    pub fn to_transfer_config(&self) -> TransferConfig {
        let d = &self.download;
        TransferConfig {
            max_threads: d.max_threads,
            preferred_chunk_bytes: d.chunk_size,
            max_retries: d.max_retries,
            request_timeout: Duration::from_secs(d.timeout_secs),
            probe_timeout: Duration::from_secs(d.probe_timeout_secs),
            small_file_threshold_bytes: d.small_file_threshold,
            hard_cap_chunks: d.max_chunks,
            chunked: d.chunked,
            cleanup_on_failure: d.auto_cleanup,
            user_agent: self.network.user_agent.clone(),
            proxy: self.network.proxy.clone(),
            ..TransferConfig::default()
        }
    }
}

/// Parse a size such as `1024`, `512KB`, `2MB` or `1.5GB` into bytes.
pub fn parse_size(value: &str) -> Option<u64> {
    let trimmed = value.trim();
    let split = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);

    let number: f64 = number.parse().ok()?;
    let multiplier = match unit.trim().to_ascii_uppercase().as_str() {
        "" | "B" => 1,
        "K" | "KB" => KB,
        "M" | "MB" => MB,
        "G" | "GB" => GB,
        _ => return None,
    };

    Some((number * multiplier as f64) as u64)
}

fn format_size_value(bytes: u64) -> String {
    if bytes > 0 && bytes % GB == 0 {
        format!("{}GB", bytes / GB)
    } else if bytes > 0 && bytes % MB == 0 {
        format!("{}MB", bytes / MB)
    } else if bytes > 0 && bytes % KB == 0 {
        format!("{}KB", bytes / KB)
    } else {
        bytes.to_string()
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn invalid(section: &str, key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse_number<T: std::str::FromStr>(
    props: &Properties,
    section: &str,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match props.get(key).map(str::trim).filter(|v| !v.is_empty()) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| invalid(section, key, raw)),
        None => Ok(None),
    }
}

fn parse_size_key(
    props: &Properties,
    section: &str,
    key: &str,
) -> Result<Option<u64>, ConfigError> {
    match props.get(key).map(str::trim).filter(|v| !v.is_empty()) {
        Some(raw) => parse_size(raw)
            .map(Some)
            .ok_or_else(|| invalid(section, key, raw)),
        None => Ok(None),
    }
}

fn parse_bool(props: &Properties, section: &str, key: &str) -> Result<Option<bool>, ConfigError> {
    match props.get(key).map(str::trim).filter(|v| !v.is_empty()) {
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(Some(true)),
            "false" | "no" | "off" | "0" => Ok(Some(false)),
            _ => Err(invalid(section, key, raw)),
        },
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("1024"), Some(1024));
        assert_eq!(parse_size("512KB"), Some(512 * 1024));
        assert_eq!(parse_size("2MB"), Some(2 * 1024 * 1024));
        assert_eq!(parse_size("2 mb"), Some(2 * 1024 * 1024));
        assert_eq!(parse_size("1.5GB"), Some(1024 * 1024 * 1024 * 3 / 2));
        assert_eq!(parse_size("ten"), None);
        assert_eq!(parse_size("10XB"), None);
        assert_eq!(parse_size(""), None);
    }

    #[test]
    fn test_parse_full_file() {
        let config = ConfigFile::parse(
            "[download]\n\
             max_threads = 4\n\
             chunk_size = 1MB\n\
             max_retries = 5\n\
             timeout = 60\n\
             chunked = no\n\
             auto_cleanup = off\n\
             [network]\n\
             user_agent = test-agent\n\
             proxy =\n\
             [logging]\n\
             level = debug\n\
             file = /tmp/splitfetch.log\n",
        )
        .unwrap();

        assert_eq!(config.download.max_threads, 4);
        assert_eq!(config.download.chunk_size, 1024 * 1024);
        assert_eq!(config.download.max_retries, 5);
        assert_eq!(config.download.timeout_secs, 60);
        assert!(!config.download.chunked);
        assert!(!config.download.auto_cleanup);
        // Untouched keys keep defaults
        assert_eq!(config.download.max_chunks, DEFAULT_HARD_CAP_CHUNKS);
        assert_eq!(config.network.user_agent.as_deref(), Some("test-agent"));
        assert_eq!(config.network.proxy, None);
        assert_eq!(config.logging.level.as_deref(), Some("debug"));
        assert_eq!(
            config.logging.file,
            Some(PathBuf::from("/tmp/splitfetch.log"))
        );
    }

    #[test]
    fn test_invalid_value_is_reported() {
        let result = ConfigFile::parse("[download]\nmax_threads = many\n");
        match result {
            Err(ConfigError::InvalidValue { section, key, value }) => {
                assert_eq!(section, "download");
                assert_eq!(key, "max_threads");
                assert_eq!(value, "many");
            }
            other => panic!("Expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp = TempDir::new().unwrap();
        let config = ConfigFile::load_from(&temp.path().join("absent.ini")).unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_save_and_reload() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.ini");

        let mut config = ConfigFile::default();
        config.download.max_threads = 12;
        config.download.chunk_size = 5 * MB;
        config.network.user_agent = Some("agent/1.0".to_string());

        config.save_to(&path).unwrap();
        let reloaded = ConfigFile::load_from(&path).unwrap();

        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_to_transfer_config() {
        let mut config = ConfigFile::default();
        config.download.max_threads = 2;
        config.download.chunked = false;
        config.download.auto_cleanup = false;
        config.network.proxy = Some("http://proxy:8080".to_string());

        let transfer = config.to_transfer_config();
        assert_eq!(transfer.max_threads, 2);
        assert!(!transfer.chunked);
        assert!(!transfer.cleanup_on_failure);
        assert_eq!(transfer.proxy.as_deref(), Some("http://proxy:8080"));
        assert_eq!(transfer.shortfall_tolerance, 0.0);
    }
}
