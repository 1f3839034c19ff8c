//! Concatenation of chunk artifacts into the output file.

use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use tracing::{debug, warn};

use super::plan::ChunkDescriptor;
use super::worker::BUFFER_SIZE;
use super::workspace::ChunkWorkspace;
use crate::error::MergeError;

/// Write every chunk artifact into `output` in ascending index order.
///
/// Each artifact is deleted as soon as it has been copied, so the peak
/// extra disk usage stays near one chunk. The workspace directory is removed
/// afterwards on a best-effort basis. Returns the number of bytes written.
pub fn merge_chunks(
    workspace: &ChunkWorkspace,
    output: &Path,
    chunks: &[ChunkDescriptor],
) -> Result<u64, MergeError> {
    let mut ordered: Vec<&ChunkDescriptor> = chunks.iter().collect();
    ordered.sort_by_key(|c| c.index);

    let write_err = |e| MergeError::WriteFailed {
        path: output.to_path_buf(),
        source: e,
    };

    let file = File::create(output).map_err(write_err)?;
    let mut writer = BufWriter::new(file);
    let mut buffer = vec![0u8; BUFFER_SIZE];
    let mut total = 0u64;

    for chunk in ordered {
        let path = workspace.artifact_path(chunk.index);
        let mut artifact = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(MergeError::MissingArtifact {
                    index: chunk.index,
                    path,
                })
            }
            Err(e) => return Err(MergeError::ReadFailed { path, source: e }),
        };

        loop {
            let bytes_read = match artifact.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(MergeError::ReadFailed { path, source: e }),
            };
            writer.write_all(&buffer[..bytes_read]).map_err(write_err)?;
            total += bytes_read as u64;
        }
        drop(artifact);

        if let Err(e) = fs::remove_file(&path) {
            warn!(path = %path.display(), error = %e, "Failed to delete merged artifact");
        }
    }

    writer.flush().map_err(write_err)?;

    if let Err(e) = workspace.remove_dir() {
        warn!(dir = %workspace.path().display(), error = %e, "Failed to remove chunk workspace");
    }

    debug!(output = %output.display(), bytes = total, chunks = chunks.len(), "Chunks merged");
    Ok(total)
}
