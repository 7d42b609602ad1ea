//! Now-playing metadata: feed subscription, parsing, presentation.

use serde::Serialize;

pub mod feed;
pub mod presenter;

pub use feed::MetadataFeed;
pub use presenter::MetadataPresenter;

/// The track currently on air, as far as the player knows.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct NowPlaying {
    /// Track title. Empty only before the first feed payload arrives.
    pub title: String,
    /// Artist, when the feed's title string carried one.
    pub artist: Option<String>,
    /// Cover art, resolved or placeholder.
    pub artwork_url: Option<String>,
}

/// Splits a raw stream title into `(title, artist)`.
///
/// Radio feeds encode both in one string as `Title - Artist`. Titles
/// themselves often contain ` - ` (remix and edit suffixes), so the split
/// happens at the LAST occurrence; everything before it is the title. No
/// separator means the artist is unknown.
#[must_use]
pub fn parse_stream_title(raw: &str) -> (String, Option<String>) {
    match raw.rsplit_once(" - ") {
        Some((title, artist)) => {
            let artist = artist.trim();
            let title = title.trim().to_string();
            if artist.is_empty() {
                (title, None)
            } else {
                (title, Some(artist.to_string()))
            }
        }
        None => (raw.trim().to_string(), None),
    }
}
