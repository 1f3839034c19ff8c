//! Range support and size discovery.
//!
//! Probing never fails: request errors are logged and degrade the outcome to
//! "ranges unsupported" or "size unknown", which sends the orchestrator down
//! the single-stream path.

use std::time::Duration;

use tracing::{debug, warn};

use super::http::{ByteRange, RangeClient};

/// Range used to test for partial-content support.
const SUPPORT_PROBE_RANGE: ByteRange = ByteRange {
    start: 0,
    end: 1023,
};

/// Smallest range used to read a `Content-Range` total.
const SIZE_PROBE_RANGE: ByteRange = ByteRange { start: 0, end: 1 };

/// What probing learned about a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeOutcome {
    /// The server honours byte-range requests.
    pub supports_ranges: bool,
    /// Authoritative size in bytes, if it could be discovered.
    pub total_size: Option<u64>,
}

impl ProbeOutcome {
    /// Whether a chunked transfer can be planned from this outcome.
    pub fn is_rangeable(&self) -> bool {
        self.supports_ranges && self.total_size.is_some()
    }
}

/// Probes a URL with metadata-only requests.
pub struct RangeProbe<'a> {
    client: &'a dyn RangeClient,
    timeout: Duration,
}

impl<'a> RangeProbe<'a> {
    /// Create a probe issuing requests through `client`.
    pub fn new(client: &'a dyn RangeClient, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Determine range support and, when supported, the total size.
    pub fn probe(&self, url: &str) -> ProbeOutcome {
        let supports_ranges = self.supports_ranges(url);
        let total_size = if supports_ranges {
            self.discover_size(url)
        } else {
            None
        };

        debug!(url = %url, supports_ranges, total_size = ?total_size, "Probe complete");
        ProbeOutcome {
            supports_ranges,
            total_size,
        }
    }

    /// Test whether the server answers a ranged HEAD with partial content.
    ///
    /// A plain 200 still counts when the response advertises ranges.
    pub fn supports_ranges(&self, url: &str) -> bool {
        match self.client.head(url, Some(SUPPORT_PROBE_RANGE), self.timeout) {
            Ok(head) if head.is_partial() => true,
            Ok(head) if head.status == 200 => head.advertises_ranges(),
            Ok(head) => {
                debug!(url = %url, status = head.status, "Range probe rejected");
                false
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Range support probe failed");
                false
            }
        }
    }

    /// Discover the total size, trying cheaper requests first.
    ///
    /// 1. `Content-Length` of a plain HEAD.
    /// 2. `Content-Range` total of a tiny ranged HEAD.
    /// 3. `Content-Range` total of a tiny ranged GET, for servers that only
    ///    send the header with a body.
    pub fn discover_size(&self, url: &str) -> Option<u64> {
        match self.client.head(url, None, self.timeout) {
            Ok(head) if head.is_success() => {
                if let Some(length) = head.content_length {
                    return Some(length);
                }
            }
            Ok(head) => debug!(url = %url, status = head.status, "Size HEAD rejected"),
            Err(e) => warn!(url = %url, error = %e, "Size HEAD failed"),
        }

        match self.client.head(url, Some(SIZE_PROBE_RANGE), self.timeout) {
            Ok(head) => {
                if let Some(total) = head.content_range_total() {
                    return Some(total);
                }
            }
            Err(e) => warn!(url = %url, error = %e, "Ranged size HEAD failed"),
        }

        match self.client.get(url, Some(SIZE_PROBE_RANGE), Some(self.timeout)) {
            // The body is dropped unread.
            Ok(response) => response.head.content_range_total(),
            Err(e) => {
                warn!(url = %url, error = %e, "Ranged size GET failed");
                None
            }
        }
    }
}
