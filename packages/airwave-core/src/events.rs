//! Event emission seam for host integration.
//!
//! The controller and metadata presenter report everything a UI needs
//! through [`EventEmitter`]; hosts bridge these calls into their own event
//! system (DOM CustomEvents, IPC, a TUI redraw queue). The library never
//! assumes a particular host.

use std::sync::Arc;

use crate::controller::PlaybackStatus;
use crate::metadata::NowPlaying;

/// Receives player notifications.
///
/// Implementations must be cheap and non-blocking; emission happens on the
/// controller's task and a slow emitter stalls playback supervision.
pub trait EventEmitter: Send + Sync {
    /// The playback status changed.
    fn emit_status(&self, status: PlaybackStatus);

    /// The current track changed.
    fn emit_track(&self, now_playing: &NowPlaying);

    /// Connectivity changed as observed by the controller.
    fn emit_connectivity(&self, online: bool);

    /// The visualizer should start or stop following playback.
    fn emit_visualizer(&self, active: bool);
}

/// Shared handle to an emitter.
pub type SharedEmitter = Arc<dyn EventEmitter>;

/// Emitter that discards everything. Useful for tests and headless use.
pub struct NoopEmitter;

impl EventEmitter for NoopEmitter {
    fn emit_status(&self, _status: PlaybackStatus) {}
    fn emit_track(&self, _now_playing: &NowPlaying) {}
    fn emit_connectivity(&self, _online: bool) {}
    fn emit_visualizer(&self, _active: bool) {}
}

/// Emitter that writes notifications to the log.
///
/// The default for the headless player binary, where the log *is* the UI.
pub struct LoggingEmitter;

impl EventEmitter for LoggingEmitter {
    fn emit_status(&self, status: PlaybackStatus) {
        log::info!("Playback status: {status}");
    }

    fn emit_track(&self, now_playing: &NowPlaying) {
        match &now_playing.artist {
            Some(artist) => log::info!("Now playing: {} - {}", now_playing.title, artist),
            None => log::info!("Now playing: {}", now_playing.title),
        }
    }

    fn emit_connectivity(&self, online: bool) {
        if online {
            log::info!("Connection restored");
        } else {
            log::warn!("Connection lost");
        }
    }

    fn emit_visualizer(&self, active: bool) {
        log::debug!("Visualizer {}", if active { "on" } else { "off" });
    }
}
