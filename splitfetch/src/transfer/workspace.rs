//! Temporary directory holding chunk artifacts for one transfer.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{TransferError, TransferResult};

/// What a best-effort cleanup managed to do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Artifacts deleted.
    pub removed: usize,
    /// Paths that could not be deleted, with the reason.
    pub failures: Vec<(PathBuf, String)>,
}

impl CleanupReport {
    /// True when everything was removed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Directory of chunk artifacts, owned by the orchestrator for one transfer.
#[derive(Debug)]
pub struct ChunkWorkspace {
    dir: PathBuf,
}

impl ChunkWorkspace {
    /// Create `<parent>/<prefix><timestamp>-<pid>`.
    pub fn create(parent: &Path, prefix: &str) -> TransferResult<Self> {
        let name = format!(
            "{}{}-{}",
            prefix,
            chrono::Utc::now().timestamp_millis(),
            std::process::id()
        );
        let dir = parent.join(name);

        fs::create_dir_all(&dir).map_err(|e| TransferError::CreateDirFailed {
            path: dir.clone(),
            source: e,
        })?;

        debug!(dir = %dir.display(), "Created chunk workspace");
        Ok(Self { dir })
    }

    /// Wrap an existing directory.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The workspace directory.
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Artifact path for chunk `index`, named by zero-padded index.
    pub fn artifact_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("chunk_{:04}.part", index))
    }

    /// Remove the directory once it is empty.
    pub fn remove_dir(&self) -> io::Result<()> {
        match fs::remove_dir(&self.dir) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }

    /// Delete every artifact and the directory, logging anything left behind.
    ///
    /// Never fails; problems are reported in the returned [`CleanupReport`].
    pub fn cleanup(&self) -> CleanupReport {
        let mut report = CleanupReport::default();

        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return report,
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %e, "Failed to list chunk workspace");
                report.failures.push((self.dir.clone(), e.to_string()));
                return report;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            match fs::remove_file(&path) {
                Ok(()) => report.removed += 1,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to remove chunk artifact");
                    report.failures.push((path, e.to_string()));
                }
            }
        }

        if let Err(e) = self.remove_dir() {
            warn!(dir = %self.dir.display(), error = %e, "Failed to remove chunk workspace");
            report.failures.push((self.dir.clone(), e.to_string()));
        }

        debug!(
            dir = %self.dir.display(),
            removed = report.removed,
            failures = report.failures.len(),
            "Chunk workspace cleaned up"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_uses_prefix() {
        let temp = TempDir::new().unwrap();
        let workspace = ChunkWorkspace::create(temp.path(), "temp_chunks_").unwrap();

        assert!(workspace.path().is_dir());
        let name = workspace.path().file_name().unwrap().to_string_lossy();
        assert!(name.starts_with("temp_chunks_"));
    }

    #[test]
    fn test_artifact_names_are_zero_padded() {
        let workspace = ChunkWorkspace::open("/tmp/ws");
        assert_eq!(
            workspace.artifact_path(7),
            PathBuf::from("/tmp/ws/chunk_0007.part")
        );
        assert_eq!(
            workspace.artifact_path(12),
            PathBuf::from("/tmp/ws/chunk_0012.part")
        );
    }

    #[test]
    fn test_cleanup_removes_everything() {
        let temp = TempDir::new().unwrap();
        let workspace = ChunkWorkspace::create(temp.path(), "ws_").unwrap();
        for i in 0..3 {
            fs::write(workspace.artifact_path(i), b"data").unwrap();
        }

        let report = workspace.cleanup();

        assert_eq!(report.removed, 3);
        assert!(report.is_clean());
        assert!(!workspace.path().exists());
    }

    #[test]
    fn test_cleanup_of_missing_dir_is_clean() {
        let temp = TempDir::new().unwrap();
        let workspace = ChunkWorkspace::open(temp.path().join("never-created"));

        let report = workspace.cleanup();
        assert_eq!(report, CleanupReport::default());
    }
}
