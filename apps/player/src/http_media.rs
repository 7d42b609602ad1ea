//! HTTP stream-reader media element.
//!
//! Headless stand-in for a browser audio element: it verifies the stream by
//! consuming it. A play request opens the connection and a background reader
//! drains the body, reporting the same lifecycle events an audio element
//! would - `Playing` when data flows, `Stalled` when it stops arriving,
//! `Error` when the connection drops. No decoding happens here.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use airwave_core::{MediaElement, MediaError, MediaEvent, MediaEventSender};
use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

pub struct HttpMediaElement {
    client: reqwest::Client,
    events: MediaEventSender,
    source: Mutex<Option<String>>,
    reader: Mutex<Option<CancellationToken>>,
    /// Shared with the reader task, which flips it back when the stream
    /// dies, so the health probe sees the element as paused.
    paused: Arc<AtomicBool>,
    volume: Mutex<f32>,
    stall_timeout: Duration,
}

impl HttpMediaElement {
    pub fn new(
        client: reqwest::Client,
        events: MediaEventSender,
        stall_timeout: Duration,
    ) -> Self {
        Self {
            client,
            events,
            source: Mutex::new(None),
            reader: Mutex::new(None),
            paused: Arc::new(AtomicBool::new(true)),
            volume: Mutex::new(1.0),
            stall_timeout,
        }
    }

    fn cancel_reader(&self) {
        if let Some(token) = self.reader.lock().take() {
            token.cancel();
        }
    }

    fn send(&self, event: MediaEvent) {
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl MediaElement for HttpMediaElement {
    async fn set_source(&self, url: &str) {
        *self.source.lock() = Some(url.to_string());
    }

    async fn clear_source(&self) {
        self.cancel_reader();
        *self.source.lock() = None;
    }

    async fn load(&self) {
        // Connections open lazily on play; nothing to preload.
    }

    async fn play(&self) -> Result<(), MediaError> {
        let url = self.source.lock().clone().ok_or(MediaError::NoSource)?;
        self.cancel_reader();

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| MediaError::Rejected(err.to_string()))?;

        self.paused.store(false, Ordering::SeqCst);
        self.send(MediaEvent::Play);

        let token = CancellationToken::new();
        *self.reader.lock() = Some(token.clone());

        tokio::spawn(read_stream(
            response,
            self.events.clone(),
            self.paused.clone(),
            token,
            self.stall_timeout,
        ));
        Ok(())
    }

    async fn pause(&self) {
        self.cancel_reader();
        if !self.paused.swap(true, Ordering::SeqCst) {
            self.send(MediaEvent::Pause);
        }
    }

    async fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    async fn set_volume(&self, volume: f32) {
        *self.volume.lock() = volume;
        log::debug!("Volume set to {volume:.2}");
    }
}

/// Drains the stream body, translating its behavior into media events.
async fn read_stream(
    response: reqwest::Response,
    events: MediaEventSender,
    paused: Arc<AtomicBool>,
    cancel: CancellationToken,
    stall_timeout: Duration,
) {
    let mut stream = response.bytes_stream();
    let mut flowing = false;
    loop {
        let next = tokio::select! {
            () = cancel.cancelled() => return,
            next = tokio::time::timeout(stall_timeout, stream.next()) => next,
        };
        match next {
            Ok(Some(Ok(chunk))) => {
                if !flowing {
                    flowing = true;
                    let _ = events.send(MediaEvent::Playing);
                }
                log::trace!("Received {} stream bytes", chunk.len());
            }
            Ok(Some(Err(err))) => {
                paused.store(true, Ordering::SeqCst);
                let _ = events.send(MediaEvent::Error {
                    message: err.to_string(),
                });
                return;
            }
            Ok(None) => {
                // Live streams never end on purpose.
                paused.store(true, Ordering::SeqCst);
                let _ = events.send(MediaEvent::Error {
                    message: "stream ended unexpectedly".to_string(),
                });
                return;
            }
            Err(_elapsed) => {
                if flowing {
                    flowing = false;
                    let _ = events.send(MediaEvent::Stalled);
                }
            }
        }
    }
}
