//! HTTP client abstraction for ranged requests.
//!
//! [`RangeClient`] is the only way the engine talks to the network, which
//! lets tests substitute an in-memory server for the real reqwest client.
//!
//! Two kinds of timeout apply. Probes pass a `deadline` that bounds the
//! whole request. Body transfers pass none: the client's stall timeout
//! bounds connecting and each individual read, so a slow but live
//! transfer may take as long as it needs.

use std::io::Read;
use std::time::Duration;

use reqwest::blocking::{Client, ClientBuilder, RequestBuilder};
use reqwest::header::{HeaderName, ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE, RANGE};

use crate::config::TransferConfig;
use crate::error::HttpError;

/// Result type for HTTP operations.
pub type HttpResult<T> = Result<T, HttpError>;

/// Inclusive byte range, sent as `Range: bytes=start-end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Create a range covering `start..=end`.
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Number of bytes in the range.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Always false; a range covers at least one byte.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Value for the `Range` request header.
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

/// Status and the headers the engine cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: u16,
    pub content_length: Option<u64>,
    pub content_range: Option<String>,
    pub accept_ranges: Option<String>,
}

impl ResponseHead {
    /// 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 206 Partial Content.
    pub fn is_partial(&self) -> bool {
        self.status == 206
    }

    /// Whether an `Accept-Ranges` header advertises range support.
    pub fn advertises_ranges(&self) -> bool {
        self.accept_ranges
            .as_deref()
            .map(|v| !v.trim().eq_ignore_ascii_case("none"))
            .unwrap_or(false)
    }

    /// Total resource size from `Content-Range`, if present and known.
    pub fn content_range_total(&self) -> Option<u64> {
        self.content_range
            .as_deref()
            .and_then(parse_content_range_total)
    }

    /// The parsed `Content-Range` header, if present and well formed.
    pub fn parsed_content_range(&self) -> Option<ContentRange> {
        self.content_range.as_deref().and_then(parse_content_range)
    }
}

/// A `Content-Range: bytes <start>-<end>/<total>` value.
///
/// Either side may be `*`, leaving the corresponding field empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    pub range: Option<ByteRange>,
    pub total: Option<u64>,
}

/// A response whose body is read incrementally.
pub struct HttpResponse {
    pub head: ResponseHead,
    pub body: Box<dyn Read + Send>,
}

impl std::fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResponse")
            .field("head", &self.head)
            .finish_non_exhaustive()
    }
}

/// Trait for the HTTP operations a transfer needs.
///
/// Implementations must be shareable across worker threads.
pub trait RangeClient: Send + Sync {
    /// Issue a metadata-only (HEAD) request that must finish within `deadline`.
    fn head(&self, url: &str, range: Option<ByteRange>, deadline: Duration)
        -> HttpResult<ResponseHead>;

    /// Issue a GET request and return the body as a stream.
    ///
    /// With a `deadline` the whole exchange, body included, must finish in
    /// time. Without one only the client's stall timeout applies.
    fn get(&self, url: &str, range: Option<ByteRange>, deadline: Option<Duration>)
        -> HttpResult<HttpResponse>;
}

/// Parse a `Content-Range` value such as `bytes 0-1023/4096` or `bytes */4096`.
pub fn parse_content_range(value: &str) -> Option<ContentRange> {
    let rest = value.trim().strip_prefix("bytes")?.trim_start();
    let (span, total) = rest.split_once('/')?;

    let total = match total.trim() {
        "*" => None,
        t => Some(t.parse().ok()?),
    };
    let range = match span.trim() {
        "*" => None,
        s => {
            let (start, end) = s.split_once('-')?;
            let start: u64 = start.trim().parse().ok()?;
            let end: u64 = end.trim().parse().ok()?;
            if end < start {
                return None;
            }
            Some(ByteRange::new(start, end))
        }
    };

    Some(ContentRange { range, total })
}

/// Extract the total from a `Content-Range` value such as `bytes 0-1/12345`.
///
/// Returns `None` when the total is `*` or the value is malformed.
pub fn parse_content_range_total(value: &str) -> Option<u64> {
    parse_content_range(value)?.total
}

/// Real client built on reqwest's blocking API.
#[derive(Debug, Clone)]
pub struct ReqwestRangeClient {
    client: Client,
    stall_timeout: Duration,
}

impl ReqwestRangeClient {
    /// Create a client with default settings.
    pub fn new() -> HttpResult<Self> {
        Self::from_config(&TransferConfig::default())
    }

    /// Create a client applying the configured user agent and proxy.
    ///
    /// `request_timeout` bounds connecting and every socket read; it resets
    /// whenever bytes arrive.
    pub fn from_config(config: &TransferConfig) -> HttpResult<Self> {
        let stall_timeout = config.request_timeout;
        let inner = reqwest::ClientBuilder::new()
            .connect_timeout(stall_timeout)
            .read_timeout(stall_timeout);
        // The blocking default is a 30s total deadline per request
        let mut builder = ClientBuilder::from(inner).timeout(None);

        if let Some(ref agent) = config.user_agent {
            builder = builder.user_agent(agent.clone());
        }
        if let Some(ref proxy) = config.proxy {
            let proxy = reqwest::Proxy::all(proxy.as_str())
                .map_err(|e| HttpError::ClientBuild(format!("invalid proxy {}: {}", proxy, e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| HttpError::ClientBuild(e.to_string()))?;

        Ok(Self {
            client,
            stall_timeout,
        })
    }

    fn send(
        &self,
        mut request: RequestBuilder,
        url: &str,
        range: Option<ByteRange>,
        deadline: Option<Duration>,
    ) -> HttpResult<reqwest::blocking::Response> {
        if let Some(deadline) = deadline {
            request = request.timeout(deadline);
        }
        if let Some(range) = range {
            request = request.header(RANGE, range.header_value());
        }

        request.send().map_err(|e| {
            if e.is_timeout() {
                HttpError::Timeout {
                    url: url.to_string(),
                    timeout_secs: deadline.unwrap_or(self.stall_timeout).as_secs(),
                }
            } else {
                HttpError::Request {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })
    }
}

fn response_head(response: &reqwest::blocking::Response) -> ResponseHead {
    let header = |name: HeaderName| {
        response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    ResponseHead {
        status: response.status().as_u16(),
        content_length: header(CONTENT_LENGTH).and_then(|v| v.trim().parse().ok()),
        content_range: header(CONTENT_RANGE),
        accept_ranges: header(ACCEPT_RANGES),
    }
}

impl RangeClient for ReqwestRangeClient {
    fn head(
        &self,
        url: &str,
        range: Option<ByteRange>,
        deadline: Duration,
    ) -> HttpResult<ResponseHead> {
        let response = self.send(self.client.head(url), url, range, Some(deadline))?;
        Ok(response_head(&response))
    }

    fn get(
        &self,
        url: &str,
        range: Option<ByteRange>,
        deadline: Option<Duration>,
    ) -> HttpResult<HttpResponse> {
        let response = self.send(self.client.get(url), url, range, deadline)?;
        Ok(HttpResponse {
            head: response_head(&response),
            body: Box::new(response),
        })
    }
}


#[cfg(test)]
mod tests {
    use super::mock::{trickle_server, MemoryServer, RangeMode};
    use super::*;
    use std::time::Instant;

    const TIMEOUT: Duration = Duration::from_secs(1);

    fn client_with_stall_timeout(stall: Duration) -> ReqwestRangeClient {
        ReqwestRangeClient::from_config(&TransferConfig::default().with_request_timeout(stall))
            .unwrap()
    }

    #[test]
    fn test_byte_range_header() {
        let range = ByteRange::new(0, 1023);
        assert_eq!(range.header_value(), "bytes=0-1023");
        assert_eq!(range.len(), 1024);
    }

    #[test]
    fn test_parse_content_range_total() {
        assert_eq!(parse_content_range_total("bytes 0-1/12345"), Some(12345));
        assert_eq!(parse_content_range_total("bytes 0-1023/1048576"), Some(1048576));
        assert_eq!(parse_content_range_total("bytes */4096"), Some(4096));
        assert_eq!(parse_content_range_total("bytes 0-1/*"), None);
        assert_eq!(parse_content_range_total("garbage"), None);
    }

    #[test]
    fn test_parse_content_range_span() {
        assert_eq!(
            parse_content_range("bytes 100-199/1000"),
            Some(ContentRange {
                range: Some(ByteRange::new(100, 199)),
                total: Some(1000),
            })
        );
        assert_eq!(
            parse_content_range("bytes */1000"),
            Some(ContentRange {
                range: None,
                total: Some(1000),
            })
        );
        assert_eq!(parse_content_range("bytes 9-3/1000"), None);
        assert_eq!(parse_content_range("items 0-1/2"), None);
    }

    #[test]
    fn test_advertises_ranges() {
        let mut head = ResponseHead {
            status: 200,
            accept_ranges: Some("bytes".to_string()),
            ..ResponseHead::default()
        };
        assert!(head.advertises_ranges());

        head.accept_ranges = Some("none".to_string());
        assert!(!head.advertises_ranges());

        head.accept_ranges = None;
        assert!(!head.advertises_ranges());
    }

    #[test]
    fn test_reqwest_client_builds() {
        assert!(ReqwestRangeClient::new().is_ok());
    }

    #[test]
    fn test_slow_body_outlives_stall_timeout() {
        let stall = Duration::from_millis(500);
        let url = trickle_server(1000, 100, Duration::from_millis(150));
        let client = client_with_stall_timeout(stall);

        let started = Instant::now();
        let mut response = client.get(&url, None, None).unwrap();
        let mut body = Vec::new();
        response.body.read_to_end(&mut body).unwrap();

        assert_eq!(response.head.content_length, Some(1000));
        assert_eq!(body.len(), 1000);
        assert!(started.elapsed() > stall * 2);
    }

    #[test]
    fn test_stalled_body_fails() {
        let url = trickle_server(200, 100, Duration::from_secs(3));
        let client = client_with_stall_timeout(Duration::from_millis(300));

        let mut response = client.get(&url, None, None).unwrap();
        let mut body = Vec::new();
        assert!(response.body.read_to_end(&mut body).is_err());
        assert!(body.is_empty());
    }

    #[test]
    fn test_mock_serves_ranges() {
        let server = MemoryServer::new((0u8..100).collect());
        let mut response = server
            .get("mem://data", Some(ByteRange::new(10, 19)), None)
            .unwrap();

        assert!(response.head.is_partial());
        assert_eq!(response.head.content_range_total(), Some(100));

        let mut body = Vec::new();
        response.body.read_to_end(&mut body).unwrap();
        assert_eq!(body, (10u8..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_mock_ignores_ranges() {
        let server = MemoryServer::new(vec![7; 50]).with_mode(RangeMode::Ignore);
        let response = server
            .get("mem://data", Some(ByteRange::new(0, 9)), Some(TIMEOUT))
            .unwrap();

        assert_eq!(response.head.status, 200);
        assert_eq!(response.head.content_length, Some(50));
    }
}
