//! Airwave Core - resilient playback engine for live internet-radio streams.
//!
//! This crate provides the core logic for the Airwave radio player: a
//! playback controller that keeps a live stream alive across transient
//! network failures, plus the now-playing metadata pipeline that accompanies
//! it. It is designed to be embedded behind any UI surface (web, desktop,
//! headless monitor); rendering stays outside the crate.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`controller`]: The playback state machine - intent, retry/backoff,
//!   health checks, connectivity handling
//! - [`media`]: Seam trait for the underlying media element and its events
//! - [`connectivity`]: Online/offline signal fan-out
//! - [`source`]: Stream endpoint with cache-busted URL derivation
//! - [`metadata`]: Now-playing feed subscription, parsing, and presentation
//! - [`artwork`]: Cover-art lookup and fallback resolution
//! - [`events`]: Sink trait for status/track/visualizer notifications
//! - [`config`]: Configuration and persistence
//! - [`error`]: Centralized error types
//!
//! # Abstraction Traits
//!
//! Three traits decouple the core from its environment:
//!
//! - [`MediaElement`](media::MediaElement): The audio element being driven
//! - [`CoverArtResolver`](artwork::CoverArtResolver): Artwork lookup backend
//! - [`EventEmitter`](events::EventEmitter): Delivery of state changes to a UI
//!
//! Each has a default implementation suitable for a headless deployment;
//! UI hosts provide their own.

#![warn(clippy::all)]

pub mod artwork;
pub mod backoff;
pub mod config;
pub mod connectivity;
pub mod controller;
pub mod error;
pub mod events;
pub mod media;
pub mod metadata;
pub mod source;

// Re-export commonly used types at the crate root
pub use artwork::{ArtworkConfig, CoverArtResolver, ItunesArtResolver};
pub use config::{
    normalize_volume, HealthCheckConfig, MetadataConfig, PlayerConfig, RetryConfig,
};
pub use connectivity::ConnectivityMonitor;
pub use controller::{ControllerConfig, PlaybackController, PlaybackIntent, PlaybackStatus};
pub use error::{AirwaveError, AirwaveResult, ErrorCode};
pub use events::{EventEmitter, LoggingEmitter, NoopEmitter, SharedEmitter};
pub use media::{event_channel, MediaElement, MediaError, MediaEvent, MediaEventSender, MediaEvents};
pub use metadata::{parse_stream_title, MetadataFeed, MetadataPresenter, NowPlaying};
pub use source::{now_millis, StreamEndpoint};
