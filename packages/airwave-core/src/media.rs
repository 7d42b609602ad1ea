//! Seam trait for the underlying media element.
//!
//! The controller drives playback exclusively through [`MediaElement`] and
//! observes the element through [`MediaEvent`]s, mirroring the lifecycle
//! events a browser audio element emits. Hosts supply the implementation:
//! an HTML audio element binding, a decoder pipeline, or the HTTP probe
//! element shipped with the player binary.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors a media element can report synchronously from a play request.
///
/// Asynchronous failures (mid-stream drops, stalls) arrive as
/// [`MediaEvent`]s instead.
#[derive(Debug, Error)]
pub enum MediaError {
    /// No source URL has been assigned to the element.
    #[error("no source configured")]
    NoSource,

    /// The play request was rejected (connection refused, bad status,
    /// autoplay policy - whatever the backing element maps here).
    #[error("play request rejected: {0}")]
    Rejected(String),
}

/// Lifecycle events emitted by a media element.
///
/// These correspond to the native audio-element events the controller
/// consumes: `play`, `pause`, `playing`, `waiting`, `stalled`, `error`,
/// `canplay`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaEvent {
    /// A play request was accepted; data may not be flowing yet.
    Play,
    /// The element paused.
    Pause,
    /// Audio is actually rendering (data confirmed flowing).
    Playing,
    /// The element is waiting for more data.
    Waiting,
    /// The stream stalled - data stopped arriving without a hard error.
    Stalled,
    /// Enough data is buffered to begin playback.
    CanPlay,
    /// The element hit a hard error and gave up on the current source.
    Error {
        /// Human-readable description from the element.
        message: String,
    },
}

/// Sending half of a media event channel, held by element implementations.
pub type MediaEventSender = mpsc::UnboundedSender<MediaEvent>;

/// Receiving half of a media event channel, consumed by the controller.
pub type MediaEvents = mpsc::UnboundedReceiver<MediaEvent>;

/// Creates the event channel connecting an element to the controller.
pub fn event_channel() -> (MediaEventSender, MediaEvents) {
    mpsc::unbounded_channel()
}

/// Abstraction over the audio element bound to the live stream.
///
/// The controller is the exclusive owner and mutator of the element; UI
/// code only observes controller status and must never touch the element
/// directly. All operations are best-effort except [`play`](Self::play),
/// whose rejection feeds the retry machinery.
#[async_trait]
pub trait MediaElement: Send + Sync {
    /// Assigns a new source URL. Does not start loading.
    async fn set_source(&self, url: &str);

    /// Drops the current source, releasing any open connection.
    async fn clear_source(&self);

    /// Forces a reload of the current source state. Combined with
    /// [`clear_source`](Self::clear_source) this guarantees a subsequent
    /// play is not served from a broken pipe.
    async fn load(&self);

    /// Requests playback of the current source.
    async fn play(&self) -> Result<(), MediaError>;

    /// Pauses playback, keeping the source assigned.
    async fn pause(&self);

    /// Whether the element currently reports itself paused.
    ///
    /// Sampled by the controller's health check to distinguish a silently
    /// stalled connection from genuine playback.
    async fn is_paused(&self) -> bool;

    /// Sets the output volume, 0.0 to 1.0.
    async fn set_volume(&self, volume: f32);
}
