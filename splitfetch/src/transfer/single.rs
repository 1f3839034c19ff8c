//! Single-stream fallback: one sequential GET of the whole resource.

use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use tracing::{debug, info, warn};

use super::http::RangeClient;
use super::progress::ProgressAggregator;
use super::worker::BUFFER_SIZE;
use crate::error::{TransferError, TransferResult};

/// Download `url` into `output` with a single unranged request.
///
/// Progress flows through the same aggregator as a chunked transfer. When
/// the response carries a `Content-Length` it becomes the progress total and
/// the body must match it; a mismatch keeps the output and reports
/// [`TransferError::SizeMismatch`]. Any other failure removes the partial
/// output.
pub fn stream_to_file(
    client: &dyn RangeClient,
    url: &str,
    output: &Path,
    progress: &ProgressAggregator,
) -> TransferResult<u64> {
    info!(url = %url, output = %output.display(), "Starting single-stream download");

    let result = stream(client, url, output, progress);
    if let Err(ref e) = result {
        if !e.retains_output() {
            match fs::remove_file(output) {
                Ok(()) => debug!(output = %output.display(), "Removed partial output"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(output = %output.display(), error = %e, "Failed to remove partial output")
                }
            }
        }
    }
    result
}

fn stream(
    client: &dyn RangeClient,
    url: &str,
    output: &Path,
    progress: &ProgressAggregator,
) -> TransferResult<u64> {
    let failed = |reason: String| TransferError::StreamFailed {
        url: url.to_string(),
        reason,
    };

    let mut response = client
        .get(url, None, None)
        .map_err(|e| failed(e.to_string()))?;

    if !response.head.is_success() {
        return Err(failed(format!("HTTP status {}", response.head.status)));
    }

    let expected = response.head.content_length;
    if let Some(length) = expected {
        progress.set_total(length);
    }

    let file = File::create(output).map_err(|e| failed(e.to_string()))?;
    let mut writer = BufWriter::new(file);
    let mut buffer = vec![0u8; BUFFER_SIZE];
    let mut written = 0u64;

    loop {
        let bytes_read = match response.body.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(failed(format!("error reading body: {}", e))),
        };
        writer
            .write_all(&buffer[..bytes_read])
            .map_err(|e| failed(e.to_string()))?;
        written += bytes_read as u64;
        progress.add(bytes_read as u64);
    }

    writer.flush().map_err(|e| failed(e.to_string()))?;

    match expected {
        Some(length) if length != written => Err(TransferError::SizeMismatch {
            path: output.to_path_buf(),
            expected: length,
            actual: written,
        }),
        _ => {
            debug!(url = %url, bytes = written, "Single-stream download complete");
            Ok(written)
        }
    }
}
