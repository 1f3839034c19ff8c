//! Resource locators.
//!
//! A locator turns an application-level reference (a page URL, an ID) into
//! a directly fetchable URL plus metadata. The engine only consumes the
//! result; [`DirectUrl`] is the trivial locator for URLs that are already
//! fetchable.

use crate::error::{TransferError, TransferResult};

/// A resolved, directly fetchable resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    /// URL to fetch.
    pub url: String,
    /// Size reported by the locator, used when probing cannot find one.
    pub approximate_size: Option<u64>,
    /// Human-readable name.
    pub display_name: String,
    /// Expected SHA-256 of the content, lowercase hex.
    pub sha256: Option<String>,
}

impl ResourceDescriptor {
    /// Descriptor for a bare URL with a name derived from its path.
    pub fn from_url(url: impl Into<String>) -> Self {
        let url = url.into();
        let display_name = display_name_for(&url);
        Self {
            url,
            approximate_size: None,
            display_name,
            sha256: None,
        }
    }

    pub fn with_approximate_size(mut self, size: u64) -> Self {
        self.approximate_size = Some(size);
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn with_sha256(mut self, digest: impl Into<String>) -> Self {
        self.sha256 = Some(digest.into());
        self
    }
}

/// Resolves references into fetchable resources.
pub trait ResourceLocator: Send + Sync {
    /// Resolve `reference`.
    fn locate(&self, reference: &str) -> TransferResult<ResourceDescriptor>;
}

/// Locator for references that are already `http(s)` URLs.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectUrl;

impl ResourceLocator for DirectUrl {
    fn locate(&self, reference: &str) -> TransferResult<ResourceDescriptor> {
        let trimmed = reference.trim();
        let lower = trimmed.to_ascii_lowercase();
        if !(lower.starts_with("http://") || lower.starts_with("https://")) {
            return Err(TransferError::Locate(format!(
                "not an http(s) URL: {}",
                reference
            )));
        }
        Ok(ResourceDescriptor::from_url(trimmed))
    }
}

/// Last non-empty path segment of `url`, without query or fragment.
///
/// Falls back to the host, then to `"download"`.
pub fn display_name_for(url: &str) -> String {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let path = without_scheme
        .split(['?', '#'])
        .next()
        .unwrap_or(without_scheme);

    let mut segments = path.split('/').filter(|s| !s.is_empty());
    let host = segments.next();

    segments
        .last()
        .or(host)
        .map(str::to_string)
        .unwrap_or_else(|| "download".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_from_path() {
        assert_eq!(
            display_name_for("https://example.com/files/video.mp4?token=abc"),
            "video.mp4"
        );
        assert_eq!(display_name_for("http://example.com/a/b/"), "b");
    }

    #[test]
    fn test_display_name_falls_back_to_host() {
        assert_eq!(display_name_for("https://example.com"), "example.com");
        assert_eq!(display_name_for("https://example.com/#top"), "example.com");
        assert_eq!(display_name_for(""), "download");
    }

    #[test]
    fn test_direct_url_accepts_http() {
        let descriptor = DirectUrl.locate(" https://example.com/data.bin ").unwrap();

        assert_eq!(descriptor.url, "https://example.com/data.bin");
        assert_eq!(descriptor.display_name, "data.bin");
        assert_eq!(descriptor.approximate_size, None);
    }

    #[test]
    fn test_direct_url_rejects_other_schemes() {
        let err = DirectUrl.locate("ftp://example.com/file").unwrap_err();
        assert!(matches!(err, TransferError::Locate(_)));
    }

    #[test]
    fn test_descriptor_builders() {
        let descriptor = ResourceDescriptor::from_url("https://x.org/f")
            .with_approximate_size(42)
            .with_display_name("Film")
            .with_sha256("ab");

        assert_eq!(descriptor.approximate_size, Some(42));
        assert_eq!(descriptor.display_name, "Film");
        assert_eq!(descriptor.sha256.as_deref(), Some("ab"));
    }
}
