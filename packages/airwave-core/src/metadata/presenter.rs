//! Joins the metadata feed with cover-art resolution.
//!
//! Title and artist publish the moment a feed payload arrives; artwork
//! follows asynchronously when (and if) the resolver answers. A lookup
//! that completes after the track has already changed is discarded.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::artwork::{ArtworkConfig, CoverArtResolver};
use crate::events::SharedEmitter;
use crate::metadata::{parse_stream_title, NowPlaying};

/// Handle to the running presenter.
pub struct MetadataPresenter {
    now_rx: watch::Receiver<NowPlaying>,
}

impl MetadataPresenter {
    /// Spawns the presenter task consuming raw titles (usually from
    /// [`MetadataFeed::spawn`](crate::metadata::MetadataFeed::spawn)).
    pub fn spawn(
        titles: mpsc::UnboundedReceiver<String>,
        resolver: Arc<dyn CoverArtResolver>,
        artwork: ArtworkConfig,
        emitter: SharedEmitter,
        cancel: CancellationToken,
    ) -> Self {
        let (tx, rx) = watch::channel(NowPlaying::default());
        tokio::spawn(run(titles, resolver, artwork, emitter, cancel, tx));
        Self { now_rx: rx }
    }

    /// The current track.
    #[must_use]
    pub fn now_playing(&self) -> NowPlaying {
        self.now_rx.borrow().clone()
    }

    /// Subscribes to track changes (including late artwork updates).
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<NowPlaying> {
        self.now_rx.clone()
    }
}

async fn run(
    mut titles: mpsc::UnboundedReceiver<String>,
    resolver: Arc<dyn CoverArtResolver>,
    artwork: ArtworkConfig,
    emitter: SharedEmitter,
    cancel: CancellationToken,
    tx: watch::Sender<NowPlaying>,
) {
    // Sequence number identifying the current track; artwork results carry
    // the sequence they were requested under.
    let mut seq: u64 = 0;
    let mut last_raw: Option<String> = None;
    let (art_tx, mut art_rx) = mpsc::unbounded_channel::<(u64, Option<String>)>();

    loop {
        tokio::select! {
            () = cancel.cancelled() => return,
            raw = titles.recv() => match raw {
                Some(raw) => {
                    // Feeds re-push the current track on reconnect.
                    if last_raw.as_deref() == Some(raw.as_str()) {
                        continue;
                    }
                    last_raw = Some(raw.clone());
                    seq += 1;

                    let (title, artist) = parse_stream_title(&raw);
                    let now = NowPlaying {
                        title,
                        artist,
                        artwork_url: artwork.placeholder_url.clone(),
                    };
                    tracing::info!(title = %now.title, "Track changed");
                    emitter.emit_track(&now);
                    tx.send_replace(now.clone());

                    if artwork.lookup {
                        let resolver = resolver.clone();
                        let art_tx = art_tx.clone();
                        let this_seq = seq;
                        tokio::spawn(async move {
                            let resolved =
                                resolver.resolve(&now.title, now.artist.as_deref()).await;
                            let _ = art_tx.send((this_seq, resolved));
                        });
                    }
                }
                None => return,
            },
            Some((art_seq, resolved)) = art_rx.recv() => {
                if art_seq != seq {
                    tracing::debug!("Discarding artwork for a previous track");
                    continue;
                }
                // A miss keeps whatever the track published with.
                if let Some(url) = resolved {
                    let mut now = tx.borrow().clone();
                    now.artwork_url = Some(url);
                    emitter.emit_track(&now);
                    tx.send_replace(now);
                }
            }
        }
    }
}
