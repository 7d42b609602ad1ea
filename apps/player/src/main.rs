//! Airwave Player - headless player and monitor for live radio streams.
//!
//! Connects to a live stream, keeps the connection alive through the core
//! playback controller, and logs status, connectivity, and now-playing
//! metadata. Designed for deployments where the station wants a
//! stream-health watchdog rather than a UI.

mod config;
mod http_media;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use airwave_core::{
    event_channel, ConnectivityMonitor, ItunesArtResolver, LoggingEmitter, MetadataFeed,
    MetadataPresenter, PlaybackController, StreamEndpoint,
};
use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
use crate::http_media::HttpMediaElement;

/// Airwave Player - headless live-radio player and stream monitor.
#[derive(Parser, Debug)]
#[command(name = "airwave-player")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "AIRWAVE_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Stream URL (overrides config file).
    #[arg(short, long)]
    stream_url: Option<String>,

    /// Metadata feed URL (overrides config file).
    #[arg(short, long)]
    metadata_url: Option<String>,

    /// Initial volume, 0.0-1.0 or 0-100 (overrides config file).
    #[arg(short, long)]
    volume: Option<f32>,

    /// Data directory for persisting resolved settings.
    #[arg(short, long, env = "AIRWAVE_DATA_DIR")]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Airwave Player v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config = AppConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(url) = args.stream_url {
        config.stream_url = url;
    }
    if let Some(url) = args.metadata_url {
        config.metadata_url = Some(url);
    }
    if let Some(volume) = args.volume {
        config.volume = volume;
    }
    if let Some(data_dir) = args.data_dir {
        config.data_dir = Some(data_dir);
    }

    let player_config = config.to_player_config();
    player_config.validate().context(
        "Invalid configuration. Specify a stream with --stream-url, \
         AIRWAVE_STREAM_URL, or a config file.",
    )?;

    log::info!("Stream: {}", player_config.stream_url);

    // Persist the resolved settings so other Airwave hosts pick them up.
    if let Some(ref data_dir) = config.data_dir {
        if let Err(err) = player_config.save(data_dir) {
            log::warn!("Could not persist settings to {}: {err}", data_dir.display());
        }
    }

    let client = reqwest::Client::builder()
        .user_agent(concat!("airwave-player/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    // Wire the media element to the controller
    let (event_tx, event_rx) = event_channel();
    let media = Arc::new(HttpMediaElement::new(
        client.clone(),
        event_tx,
        Duration::from_secs(config.stall_timeout_secs),
    ));
    // No connectivity signal on a server host; failures surface as stream
    // errors and go through the normal retry path.
    let monitor = ConnectivityMonitor::assume_online();
    let emitter = Arc::new(LoggingEmitter);

    let controller = PlaybackController::spawn(
        media,
        StreamEndpoint::new(player_config.stream_url.as_str()),
        player_config.controller_config(),
        emitter.clone(),
        event_rx,
        monitor.subscribe(),
    );
    controller.set_volume(player_config.volume);

    // Metadata pipeline, when a feed is configured
    let shutdown = CancellationToken::new();
    let _presenter = player_config.metadata.feed_url.as_ref().map(|feed_url| {
        log::info!("Metadata feed: {feed_url}");
        let titles = MetadataFeed::new(
            client.clone(),
            feed_url.as_str(),
            player_config.metadata.resubscribe_delay(),
        )
        .spawn(shutdown.clone());
        MetadataPresenter::spawn(
            titles,
            Arc::new(ItunesArtResolver::new(client.clone())),
            player_config.metadata.artwork_config(),
            emitter,
            shutdown.clone(),
        )
    });

    controller.request_play();

    // Wait for shutdown signal
    shutdown_signal().await;

    log::info!("Shutdown signal received, cleaning up...");

    shutdown.cancel();
    controller.request_stop();
    // Give the stop a moment to reach the element before the runtime drops.
    tokio::time::sleep(Duration::from_millis(200)).await;

    log::info!("Shutdown complete");
    Ok(())
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
