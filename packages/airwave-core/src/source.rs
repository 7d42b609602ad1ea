//! Stream endpoint with cache-busted URL derivation.
//!
//! Live-radio edges and intermediary proxies are happy to serve a stale or
//! half-dead connection for a URL they have seen before. Every reconnect
//! therefore derives a fresh request URL by appending a timestamp (and the
//! attempt count, which also aids log correlation on the server side).

use std::time::{SystemTime, UNIX_EPOCH};

/// Returns the current Unix time in milliseconds.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// The network-addressable live audio source.
#[derive(Debug, Clone)]
pub struct StreamEndpoint {
    base_url: String,
}

impl StreamEndpoint {
    /// Creates an endpoint for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    /// The immutable base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Derives a fresh request URL for a (re)connection attempt.
    ///
    /// Appends `t=<now_millis>&attempt=<n>` so no cache along the path can
    /// answer with a previously established (and possibly broken) response.
    #[must_use]
    pub fn fresh_url(&self, attempt: u32) -> String {
        let separator = if self.base_url.contains('?') { '&' } else { '?' };
        format!(
            "{}{}t={}&attempt={}",
            self.base_url,
            separator,
            now_millis(),
            attempt
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_url_appends_cache_buster() {
        let endpoint = StreamEndpoint::new("https://stream.example.com/live");
        let url = endpoint.fresh_url(0);
        assert!(url.starts_with("https://stream.example.com/live?t="));
        assert!(url.ends_with("&attempt=0"));
    }

    #[test]
    fn fresh_url_respects_existing_query() {
        let endpoint = StreamEndpoint::new("https://stream.example.com/live?codec=mp3");
        let url = endpoint.fresh_url(3);
        assert!(url.starts_with("https://stream.example.com/live?codec=mp3&t="));
        assert!(url.ends_with("&attempt=3"));
    }

    #[test]
    fn consecutive_urls_differ() {
        // Attempt count alone guarantees uniqueness even within one millisecond.
        let endpoint = StreamEndpoint::new("https://stream.example.com/live");
        assert_ne!(endpoint.fresh_url(1), endpoint.fresh_url(2));
    }
}
