//! Cover-art lookup and fallback resolution.
//!
//! Artwork is decoration, not data: every failure path here degrades to a
//! placeholder (or nothing) and must never delay or block the now-playing
//! display.

use async_trait::async_trait;
use serde::Deserialize;

const ITUNES_SEARCH_URL: &str = "https://itunes.apple.com/search";

/// Artwork resolution settings, derived from
/// [`MetadataConfig::artwork_config`](crate::config::MetadataConfig::artwork_config).
#[derive(Debug, Clone, Default)]
pub struct ArtworkConfig {
    /// Whether lookups run at all.
    pub lookup: bool,
    /// Fallback image shown while a lookup is pending or after a miss.
    pub placeholder_url: Option<String>,
}

/// Resolves a track to a cover-art URL.
///
/// `None` means "no artwork found" - implementations absorb their own
/// transport errors.
#[async_trait]
pub trait CoverArtResolver: Send + Sync {
    async fn resolve(&self, title: &str, artist: Option<&str>) -> Option<String>;
}

/// Resolver backed by the iTunes Search API.
pub struct ItunesArtResolver {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(rename = "artworkUrl100")]
    artwork_url_100: Option<String>,
}

impl ItunesArtResolver {
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_base_url(client, ITUNES_SEARCH_URL)
    }

    /// Overrides the API endpoint. Used by tests against a local server.
    #[must_use]
    pub fn with_base_url(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    async fn search(&self, term: &str) -> Result<SearchResponse, reqwest::Error> {
        self.client
            .get(&self.base_url)
            .query(&[("term", term), ("entity", "song"), ("limit", "1")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

#[async_trait]
impl CoverArtResolver for ItunesArtResolver {
    async fn resolve(&self, title: &str, artist: Option<&str>) -> Option<String> {
        let term = match artist {
            Some(artist) => format!("{artist} {title}"),
            None => title.to_string(),
        };
        match self.search(&term).await {
            Ok(response) => extract_artwork_url(response),
            Err(err) => {
                log::debug!("Cover art lookup failed for '{term}': {err}");
                None
            }
        }
    }
}

fn extract_artwork_url(response: SearchResponse) -> Option<String> {
    response
        .results
        .into_iter()
        .next()
        .and_then(|result| result.artwork_url_100)
        .map(|url| upscale(&url))
}

/// The API hands out 100x100 thumbnails; the same CDN path serves larger
/// renditions by substituting the size segment.
fn upscale(url: &str) -> String {
    url.replace("100x100", "600x600")
}
