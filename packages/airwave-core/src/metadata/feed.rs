//! Server-push metadata feed subscription.
//!
//! The station pushes now-playing updates over a long-lived HTTP response
//! in the server-sent-events framing: UTF-8 lines, payload lines prefixed
//! with `data:`, each payload a JSON object carrying `streamTitle`. The
//! feed never ends on purpose; EOF and transport errors both mean
//! "re-subscribe after a delay, forever".

use std::time::Duration;

use futures::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Subscriber for the station's metadata push feed.
pub struct MetadataFeed {
    client: reqwest::Client,
    url: String,
    resubscribe_delay: Duration,
}

#[derive(Debug, Deserialize)]
struct FeedPayload {
    #[serde(rename = "streamTitle")]
    stream_title: Option<String>,
}

impl MetadataFeed {
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        url: impl Into<String>,
        resubscribe_delay: Duration,
    ) -> Self {
        Self {
            client,
            url: url.into(),
            resubscribe_delay,
        }
    }

    /// Spawns the subscription loop, yielding raw stream titles in feed
    /// order. The loop runs until `cancel` fires or the receiver is
    /// dropped.
    pub fn spawn(self, cancel: CancellationToken) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(self.run(tx, cancel));
        rx
    }

    async fn run(self, tx: mpsc::UnboundedSender<String>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                () = cancel.cancelled() => return,
                result = self.subscribe_once(&tx) => match result {
                    Ok(()) => log::info!("Metadata feed ended, re-subscribing"),
                    Err(err) => log::warn!("Metadata feed error: {err}, re-subscribing"),
                },
            }
            if tx.is_closed() {
                return;
            }
            tokio::select! {
                () = cancel.cancelled() => return,
                () = tokio::time::sleep(self.resubscribe_delay) => {}
            }
        }
    }

    /// One subscription: connect, stream lines until EOF or error.
    async fn subscribe_once(
        &self,
        tx: &mpsc::UnboundedSender<String>,
    ) -> Result<(), reqwest::Error> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?;
        tracing::debug!(url = %self.url, "Metadata feed connected");

        let mut stream = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();
        while let Some(chunk) = stream.next().await {
            buffer.extend_from_slice(&chunk?);
            for line in drain_lines(&mut buffer) {
                if let Some(title) = parse_feed_line(&line) {
                    if tx.send(title).is_err() {
                        return Ok(());
                    }
                }
            }
        }
        Ok(())
    }
}

/// Longest line the assembly buffer will hold. Feed payloads are a few
/// hundred bytes; anything bigger is a broken or hostile endpoint.
const MAX_LINE_BYTES: usize = 64 * 1024;

/// Splits completed lines out of the assembly buffer.
///
/// An unterminated line longer than [`MAX_LINE_BYTES`] is discarded so the
/// buffer cannot grow without bound; its eventual tail will fail payload
/// parsing and be skipped like any other junk line.
fn drain_lines(buffer: &mut Vec<u8>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(newline) = buffer.iter().position(|b| *b == b'\n') {
        let line: Vec<u8> = buffer.drain(..=newline).collect();
        lines.push(String::from_utf8_lossy(&line).trim_end().to_string());
    }
    if buffer.len() > MAX_LINE_BYTES {
        log::warn!(
            "Metadata feed sent an unterminated line over {MAX_LINE_BYTES} bytes, discarding"
        );
        buffer.clear();
    }
    lines
}

/// Extracts a stream title from one feed line, if it carries one.
///
/// Non-`data:` lines (comments, event names, keep-alive blanks) and
/// malformed payloads are skipped silently; a noisy feed must not spam the
/// log.
fn parse_feed_line(line: &str) -> Option<String> {
    let data = line.strip_prefix("data:")?.trim();
    if data.is_empty() {
        return None;
    }
    let payload: FeedPayload = serde_json::from_str(data).ok()?;
    payload
        .stream_title
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty())
}
