//! The playback controller - keeps a live stream alive.
//!
//! Everything interesting about this player happens here: play/stop intent
//! tracking, bounded exponential-backoff reconnection, a periodic health
//! probe that catches silently dead connections, and online/offline
//! handling. The controller runs as a single task owning all mutable state;
//! the public [`PlaybackController`] handle just sends it commands and
//! watches status. Re-entrancy is impossible by construction - there is one
//! consumer of the command queue and no locks around the state machine.
//!
//! Failure on the playback path never surfaces as an `Err` to callers. The
//! outcome of every operation is observable only through status changes,
//! because "it failed" and "it is retrying" are the same thing from the
//! user's point of view.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::backoff;
use crate::config::{normalize_volume, HealthCheckConfig, RetryConfig};
use crate::events::SharedEmitter;
use crate::media::{MediaElement, MediaEvent, MediaEvents};
use crate::source::StreamEndpoint;

/// What the user asked for, independent of what the network permits.
///
/// Intent survives errors, stalls, and offline periods; it only changes on
/// an explicit play/stop request or an element-level pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackIntent {
    /// The user does not want audio.
    Stopped,
    /// The user wants audio; the controller fights to provide it.
    Playing,
}

/// Externally visible playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    /// Nothing requested yet.
    Idle,
    /// A play request is in flight.
    Loading,
    /// Audio is flowing.
    Playing,
    /// Stopped by request (or by the element).
    Paused,
    /// A reconnection attempt is in progress or scheduled.
    Reconnecting,
    /// All reconnection attempts exhausted; waiting for a new play request.
    Error,
    /// The host reports no connectivity.
    Offline,
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Reconnecting => "reconnecting",
            Self::Error => "error",
            Self::Offline => "offline",
        };
        f.write_str(name)
    }
}

/// Controller behavior knobs, usually derived from
/// [`PlayerConfig::controller_config`](crate::config::PlayerConfig::controller_config).
#[derive(Debug, Clone, Default)]
pub struct ControllerConfig {
    /// Retry and settle timing.
    pub retry: RetryConfig,
    /// Liveness probe behavior.
    pub health_check: HealthCheckConfig,
    /// Whether visualizer on/off notifications follow the `Playing` boundary.
    pub visualizer: bool,
}

/// Commands processed by the controller task.
///
/// Timers and the health probe feed back into the same queue, so every
/// state transition happens on the one task.
#[derive(Debug)]
enum Command {
    Play,
    Stop,
    SetVolume(f32),
    /// A scheduled retry timer fired. Stale timers carry an old generation
    /// and are discarded.
    AttemptReconnect {
        generation: u64,
    },
    HealthProbe,
}

/// Handle to a running playback controller.
///
/// All operations are fire-and-forget; observe outcomes via
/// [`status`](Self::status) or [`subscribe_status`](Self::subscribe_status).
/// Dropping the last handle shuts the controller task down.
pub struct PlaybackController {
    cmd_tx: mpsc::UnboundedSender<Command>,
    status_rx: watch::Receiver<PlaybackStatus>,
}

impl PlaybackController {
    /// Spawns the controller task on the current runtime.
    ///
    /// `media_events` must be the receiving half paired with the element's
    /// event sender; `connectivity` comes from
    /// [`ConnectivityMonitor::subscribe`](crate::connectivity::ConnectivityMonitor::subscribe).
    pub fn spawn(
        media: Arc<dyn MediaElement>,
        endpoint: StreamEndpoint,
        config: ControllerConfig,
        emitter: SharedEmitter,
        media_events: MediaEvents,
        connectivity: watch::Receiver<bool>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(PlaybackStatus::Idle);

        let task = ControllerTask {
            media,
            endpoint,
            config,
            emitter,
            // Weak, so the task's own timers don't keep the command
            // channel alive after the last handle drops.
            cmd_tx: cmd_tx.downgrade(),
            status_tx,
            intent: PlaybackIntent::Stopped,
            attempt: 0,
            is_reconnecting: false,
            generation: 0,
            online: true,
            was_playing_before_error: false,
            retry_timer: None,
            health_task: None,
        };
        tokio::spawn(task.run(cmd_rx, media_events, connectivity));

        Self { cmd_tx, status_rx }
    }

    /// Requests playback. No-op while a play request is already in flight.
    pub fn request_play(&self) {
        let _ = self.cmd_tx.send(Command::Play);
    }

    /// Requests a stop. Cancels any scheduled reconnection.
    pub fn request_stop(&self) {
        let _ = self.cmd_tx.send(Command::Stop);
    }

    /// Sets the volume. Values above 1.0 are treated as a 0-100 scale.
    pub fn set_volume(&self, volume: f32) {
        let _ = self.cmd_tx.send(Command::SetVolume(volume));
    }

    /// The current playback status.
    #[must_use]
    pub fn status(&self) -> PlaybackStatus {
        *self.status_rx.borrow()
    }

    /// Subscribes to status transitions.
    #[must_use]
    pub fn subscribe_status(&self) -> watch::Receiver<PlaybackStatus> {
        self.status_rx.clone()
    }
}

/// The state machine proper. Lives inside the spawned task; nothing outside
/// ever touches these fields.
struct ControllerTask {
    media: Arc<dyn MediaElement>,
    endpoint: StreamEndpoint,
    config: ControllerConfig,
    emitter: SharedEmitter,
    cmd_tx: mpsc::WeakUnboundedSender<Command>,
    status_tx: watch::Sender<PlaybackStatus>,

    intent: PlaybackIntent,
    /// Attempts consumed in the current reconnection sequence (1-based once
    /// a sequence starts). Reset on confirmed playback and on connectivity
    /// restoration; deliberately NOT reset by a stop request.
    attempt: u32,
    /// True only while an attempt's teardown/re-arm sequence is executing.
    /// Guards against overlapping sequences.
    is_reconnecting: bool,
    /// Bumped on every explicit play/stop so timers scheduled before the
    /// request cannot fire after it.
    generation: u64,
    /// Last connectivity state the controller acted on.
    online: bool,
    /// Set when an error interrupts playback, so a reconnect that lands
    /// after the element paused itself still resumes audio.
    was_playing_before_error: bool,

    retry_timer: Option<CancellationToken>,
    health_task: Option<CancellationToken>,
}

impl ControllerTask {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut media_events: MediaEvents,
        mut connectivity: watch::Receiver<bool>,
    ) {
        self.online = *connectivity.borrow_and_update();
        let mut media_alive = true;
        let mut connectivity_alive = true;

        loop {
            tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd).await,
                    // All handles dropped; nothing can reach us anymore.
                    None => break,
                },
                event = media_events.recv(), if media_alive => match event {
                    Some(event) => self.handle_media_event(event).await,
                    None => media_alive = false,
                },
                changed = connectivity.changed(), if connectivity_alive => match changed {
                    Ok(()) => {
                        let online = *connectivity.borrow_and_update();
                        self.handle_connectivity(online).await;
                    }
                    Err(_) => connectivity_alive = false,
                },
            }
        }

        self.cancel_retry_timer();
        self.stop_health_check();
        tracing::debug!("Playback controller task exiting");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Play => self.handle_play().await,
            Command::Stop => self.handle_stop().await,
            Command::SetVolume(volume) => {
                self.media.set_volume(normalize_volume(volume)).await;
            }
            Command::AttemptReconnect { generation } => {
                self.retry_timer = None;
                if generation == self.generation {
                    self.attempt_reconnection().await;
                } else {
                    tracing::debug!("Discarding stale reconnect timer");
                }
            }
            Command::HealthProbe => self.run_health_probe().await,
        }
    }

    async fn handle_play(&mut self) {
        let status = self.current_status();
        if status == PlaybackStatus::Loading {
            return;
        }
        if status == PlaybackStatus::Playing && self.intent == PlaybackIntent::Playing {
            return;
        }

        self.intent = PlaybackIntent::Playing;
        self.generation += 1;
        self.cancel_retry_timer();
        self.set_status(PlaybackStatus::Loading);

        let url = self.endpoint.fresh_url(self.attempt);
        self.media.set_source(&url).await;
        self.media.load().await;

        match self.media.play().await {
            Ok(()) => {
                self.reset_connection_state();
                self.set_status(PlaybackStatus::Playing);
            }
            Err(err) => {
                log::warn!("Play request rejected: {err}");
                self.begin_recovery(self.config.retry.error_settle());
            }
        }
    }

    async fn handle_stop(&mut self) {
        self.intent = PlaybackIntent::Stopped;
        self.generation += 1;
        self.cancel_retry_timer();
        self.is_reconnecting = false;
        self.was_playing_before_error = false;
        self.media.pause().await;
        self.set_status(PlaybackStatus::Paused);
    }

    async fn handle_media_event(&mut self, event: MediaEvent) {
        match event {
            MediaEvent::Play => {
                if self.intent == PlaybackIntent::Playing
                    && matches!(
                        self.current_status(),
                        PlaybackStatus::Idle | PlaybackStatus::Paused
                    )
                {
                    self.set_status(PlaybackStatus::Loading);
                }
            }
            MediaEvent::Playing => {
                // Data confirmed flowing.
                if self.intent == PlaybackIntent::Playing {
                    self.reset_connection_state();
                    self.set_status(PlaybackStatus::Playing);
                }
            }
            MediaEvent::CanPlay => {
                tracing::debug!("Media element reports canplay");
            }
            MediaEvent::Pause => self.handle_pause_event().await,
            MediaEvent::Waiting => {
                if self.intent == PlaybackIntent::Playing
                    && self.current_status() == PlaybackStatus::Playing
                {
                    self.set_status(PlaybackStatus::Loading);
                }
            }
            MediaEvent::Stalled => {
                if self.intent == PlaybackIntent::Playing {
                    log::warn!("Stream stalled, scheduling recovery");
                    self.begin_recovery(self.config.retry.stall_settle());
                }
            }
            MediaEvent::Error { message } => {
                log::error!("Stream error: {message}");
                if self.intent == PlaybackIntent::Playing {
                    self.was_playing_before_error = true;
                    self.begin_recovery(self.config.retry.error_settle());
                }
            }
        }
    }

    /// Pause events need extra care: the controller's own teardown pauses
    /// the element, and those events arrive later through the same queue.
    async fn handle_pause_event(&mut self) {
        if self.is_reconnecting
            || self.retry_timer.is_some()
            || self.current_status() == PlaybackStatus::Reconnecting
        {
            return;
        }
        // A queued pause from before a successful resume is stale.
        if !self.media.is_paused().await {
            return;
        }
        if matches!(
            self.current_status(),
            PlaybackStatus::Playing | PlaybackStatus::Loading
        ) {
            // The element paused outside our control (media keys, another
            // tab grabbing the output). Treat it as a user stop.
            self.intent = PlaybackIntent::Stopped;
            self.set_status(PlaybackStatus::Paused);
        }
    }

    async fn handle_connectivity(&mut self, online: bool) {
        if online == self.online {
            return;
        }
        self.online = online;
        self.emitter.emit_connectivity(online);

        if online {
            log::info!("Connection restored");
            // A fresh network deserves a fresh retry budget.
            self.attempt = 0;
            if self.intent == PlaybackIntent::Playing || self.was_playing_before_error {
                self.schedule_reconnect(self.config.retry.online_settle());
            } else if self.current_status() == PlaybackStatus::Offline {
                self.set_status(PlaybackStatus::Paused);
            }
        } else {
            log::warn!("Connection lost");
            self.cancel_retry_timer();
            self.is_reconnecting = false;
            if self.intent == PlaybackIntent::Playing {
                self.was_playing_before_error = true;
                self.media.pause().await;
            }
            self.set_status(PlaybackStatus::Offline);
        }
    }

    /// One reconnection attempt: teardown, cache-busted re-arm, play.
    async fn attempt_reconnection(&mut self) {
        if self.is_reconnecting {
            return;
        }
        if !self.online {
            // Don't consume an attempt the network guarantees will fail;
            // restoration will reschedule.
            self.set_status(PlaybackStatus::Offline);
            return;
        }
        if self.attempt >= self.config.retry.max_attempts {
            log::error!(
                "Giving up after {} reconnection attempts",
                self.config.retry.max_attempts
            );
            self.reset_connection_state();
            self.set_status(PlaybackStatus::Error);
            return;
        }

        self.attempt += 1;
        self.is_reconnecting = true;
        self.set_status(PlaybackStatus::Reconnecting);
        log::info!(
            "Reconnection attempt {}/{}",
            self.attempt,
            self.config.retry.max_attempts
        );

        // Full teardown first, so the next play cannot be served from the
        // broken connection.
        self.media.pause().await;
        self.media.clear_source().await;
        self.media.load().await;
        tokio::time::sleep(self.config.retry.teardown_settle()).await;

        let url = self.endpoint.fresh_url(self.attempt);
        self.media.set_source(&url).await;
        self.media.load().await;
        tokio::time::sleep(self.config.retry.play_settle()).await;

        if self.intent == PlaybackIntent::Playing || self.was_playing_before_error {
            match self.media.play().await {
                Ok(()) => {
                    self.reset_connection_state();
                    self.intent = PlaybackIntent::Playing;
                    self.set_status(PlaybackStatus::Playing);
                    log::info!("Reconnected");
                }
                Err(err) => {
                    log::warn!("Reconnection attempt {} failed: {err}", self.attempt);
                    self.is_reconnecting = false;
                    let delay = backoff::delay_for_attempt(
                        self.attempt,
                        self.config.retry.base_delay(),
                        self.config.retry.max_delay(),
                    );
                    self.schedule_reconnect(delay);
                }
            }
        } else {
            // Stopped mid-sequence: the pipe is restored but stays silent.
            self.reset_connection_state();
            self.set_status(PlaybackStatus::Paused);
        }
    }

    /// Kicks off a reconnection sequence after a settle delay, unless one
    /// is already running or scheduled.
    fn begin_recovery(&mut self, settle: Duration) {
        if self.intent != PlaybackIntent::Playing && !self.was_playing_before_error {
            return;
        }
        if self.is_reconnecting || self.retry_timer.is_some() {
            return;
        }
        if !self.online {
            self.set_status(PlaybackStatus::Offline);
            return;
        }
        self.was_playing_before_error = true;
        self.schedule_reconnect(settle);
        // The outage is visible now, not when the settle timer fires.
        self.set_status(PlaybackStatus::Reconnecting);
    }

    fn schedule_reconnect(&mut self, delay: Duration) {
        self.cancel_retry_timer();
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let cmd_tx = self.cmd_tx.clone();
        let generation = self.generation;
        tracing::debug!(delay_ms = delay.as_millis() as u64, "Scheduling reconnect");
        tokio::spawn(async move {
            tokio::select! {
                () = cancelled.cancelled() => {}
                () = tokio::time::sleep(delay) => {
                    if let Some(tx) = cmd_tx.upgrade() {
                        let _ = tx.send(Command::AttemptReconnect { generation });
                    }
                }
            }
        });
        self.retry_timer = Some(token);
    }

    fn cancel_retry_timer(&mut self) {
        if let Some(token) = self.retry_timer.take() {
            token.cancel();
        }
    }

    /// The probe runs only while status is `Playing`; it catches streams
    /// that died without emitting any event at all.
    async fn run_health_probe(&mut self) {
        if self.current_status() != PlaybackStatus::Playing
            || self.intent != PlaybackIntent::Playing
        {
            return;
        }
        if self.media.is_paused().await {
            log::warn!("Health check: element paused while status is playing, recovering");
            self.was_playing_before_error = true;
            self.begin_recovery(Duration::ZERO);
        }
    }

    fn start_health_check(&mut self) {
        if !self.config.health_check.enabled || self.health_task.is_some() {
            return;
        }
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let cmd_tx = self.cmd_tx.clone();
        let interval = self.config.health_check.interval();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately; skip it.
            ticker.tick().await;
            loop {
                tokio::select! {
                    () = cancelled.cancelled() => break,
                    _ = ticker.tick() => {
                        let alive = cmd_tx
                            .upgrade()
                            .is_some_and(|tx| tx.send(Command::HealthProbe).is_ok());
                        if !alive {
                            break;
                        }
                    }
                }
            }
        });
        self.health_task = Some(token);
    }

    fn stop_health_check(&mut self) {
        if let Some(token) = self.health_task.take() {
            token.cancel();
        }
    }

    fn reset_connection_state(&mut self) {
        self.attempt = 0;
        self.is_reconnecting = false;
        self.was_playing_before_error = false;
        self.cancel_retry_timer();
    }

    fn current_status(&self) -> PlaybackStatus {
        *self.status_tx.borrow()
    }

    /// Single funnel for status transitions. Owns the side effects tied to
    /// the `Playing` boundary: health check lifecycle and visualizer
    /// notifications.
    fn set_status(&mut self, status: PlaybackStatus) {
        let previous = self.current_status();
        if previous == status {
            return;
        }
        if previous == PlaybackStatus::Playing {
            self.stop_health_check();
            if self.config.visualizer {
                self.emitter.emit_visualizer(false);
            }
        }
        if status == PlaybackStatus::Playing {
            self.start_health_check();
            if self.config.visualizer {
                self.emitter.emit_visualizer(true);
            }
        }
        tracing::debug!("Status: {previous} -> {status}");
        self.status_tx.send_replace(status);
        self.emitter.emit_status(status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::ConnectivityMonitor;
    use crate::events::testing::RecordingEmitter;
    use crate::media::{event_channel, MediaError, MediaEventSender};
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Scripted media element. Each play request pops the next scripted
    /// result; an exhausted script succeeds.
    struct MockMedia {
        events: MediaEventSender,
        paused: Mutex<bool>,
        source: Mutex<Option<String>>,
        volume: Mutex<f32>,
        play_results: Mutex<VecDeque<Result<(), ()>>>,
        play_calls: AtomicU32,
    }

    impl MockMedia {
        fn new(events: MediaEventSender) -> Arc<Self> {
            Arc::new(Self {
                events,
                paused: Mutex::new(true),
                source: Mutex::new(None),
                volume: Mutex::new(1.0),
                play_results: Mutex::new(VecDeque::new()),
                play_calls: AtomicU32::new(0),
            })
        }

        fn script_play_results(&self, results: impl IntoIterator<Item = Result<(), ()>>) {
            self.play_results.lock().extend(results);
        }

        fn play_calls(&self) -> u32 {
            self.play_calls.load(Ordering::SeqCst)
        }

        /// Simulates a stream dying without any event reaching the
        /// controller.
        fn die_silently(&self) {
            *self.paused.lock() = true;
        }

        fn send(&self, event: MediaEvent) {
            let _ = self.events.send(event);
        }
    }

    #[async_trait::async_trait]
    impl MediaElement for MockMedia {
        async fn set_source(&self, url: &str) {
            *self.source.lock() = Some(url.to_string());
        }

        async fn clear_source(&self) {
            *self.source.lock() = None;
        }

        async fn load(&self) {}

        async fn play(&self) -> Result<(), MediaError> {
            self.play_calls.fetch_add(1, Ordering::SeqCst);
            let scripted = self.play_results.lock().pop_front().unwrap_or(Ok(()));
            match scripted {
                Ok(()) => {
                    *self.paused.lock() = false;
                    Ok(())
                }
                Err(()) => Err(MediaError::Rejected("connection refused".to_string())),
            }
        }

        async fn pause(&self) {
            *self.paused.lock() = true;
            let _ = self.events.send(MediaEvent::Pause);
        }

        async fn is_paused(&self) -> bool {
            *self.paused.lock()
        }

        async fn set_volume(&self, volume: f32) {
            *self.volume.lock() = volume;
        }
    }

    struct Fixture {
        media: Arc<MockMedia>,
        controller: PlaybackController,
        monitor: ConnectivityMonitor,
        emitter: Arc<RecordingEmitter>,
    }

    fn fixture(config: ControllerConfig) -> Fixture {
        let (event_tx, event_rx) = event_channel();
        let media = MockMedia::new(event_tx);
        let monitor = ConnectivityMonitor::assume_online();
        let emitter = Arc::new(RecordingEmitter::default());
        let controller = PlaybackController::spawn(
            media.clone(),
            StreamEndpoint::new("https://stream.example.com/live"),
            config,
            emitter.clone(),
            event_rx,
            monitor.subscribe(),
        );
        Fixture {
            media,
            controller,
            monitor,
            emitter,
        }
    }

    async fn wait_for(
        rx: &mut watch::Receiver<PlaybackStatus>,
        expected: PlaybackStatus,
    ) -> PlaybackStatus {
        *rx.wait_for(|status| *status == expected).await.unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn play_reaches_playing_on_success() {
        let f = fixture(ControllerConfig::default());
        let mut status = f.controller.subscribe_status();

        f.controller.request_play();
        wait_for(&mut status, PlaybackStatus::Playing).await;
        assert_eq!(f.media.play_calls(), 1);
        assert!(f
            .media
            .source
            .lock()
            .as_deref()
            .unwrap()
            .starts_with("https://stream.example.com/live?t="));
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_play_retries_until_success() {
        let f = fixture(ControllerConfig::default());
        f.media.script_play_results([Err(()), Err(()), Ok(())]);
        let mut status = f.controller.subscribe_status();

        f.controller.request_play();
        wait_for(&mut status, PlaybackStatus::Playing).await;
        assert_eq!(f.media.play_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let mut config = ControllerConfig::default();
        config.retry.max_attempts = 2;
        let f = fixture(config);
        f.media
            .script_play_results([Err(()), Err(()), Err(()), Err(())]);
        let mut status = f.controller.subscribe_status();

        f.controller.request_play();
        wait_for(&mut status, PlaybackStatus::Error).await;
        // Initial play plus exactly max_attempts reconnects.
        assert_eq!(f.media.play_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_scheduled_retry() {
        let f = fixture(ControllerConfig::default());
        f.media.script_play_results([Err(())]);
        let mut status = f.controller.subscribe_status();

        f.controller.request_play();
        wait_for(&mut status, PlaybackStatus::Reconnecting).await;
        f.controller.request_stop();
        wait_for(&mut status, PlaybackStatus::Paused).await;

        // Far beyond every settle and backoff delay.
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(f.media.play_calls(), 1);
        assert_eq!(f.controller.status(), PlaybackStatus::Paused);
    }

    #[tokio::test(start_paused = true)]
    async fn final_intent_wins_for_rapid_toggles() {
        let f = fixture(ControllerConfig::default());
        let mut status = f.controller.subscribe_status();

        f.controller.request_play();
        f.controller.request_stop();
        f.controller.request_play();
        wait_for(&mut status, PlaybackStatus::Playing).await;

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(f.controller.status(), PlaybackStatus::Playing);

        f.controller.request_play();
        f.controller.request_stop();
        wait_for(&mut status, PlaybackStatus::Paused).await;
        assert_eq!(f.controller.status(), PlaybackStatus::Paused);
    }

    #[tokio::test(start_paused = true)]
    async fn stall_triggers_reconnect() {
        let f = fixture(ControllerConfig::default());
        let mut status = f.controller.subscribe_status();

        f.controller.request_play();
        wait_for(&mut status, PlaybackStatus::Playing).await;

        f.media.send(MediaEvent::Stalled);
        wait_for(&mut status, PlaybackStatus::Reconnecting).await;
        wait_for(&mut status, PlaybackStatus::Playing).await;
        assert_eq!(f.media.play_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stall_while_stopped_is_ignored() {
        let f = fixture(ControllerConfig::default());
        let mut status = f.controller.subscribe_status();

        f.controller.request_play();
        wait_for(&mut status, PlaybackStatus::Playing).await;
        f.controller.request_stop();
        wait_for(&mut status, PlaybackStatus::Paused).await;

        f.media.send(MediaEvent::Stalled);
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(f.controller.status(), PlaybackStatus::Paused);
        assert_eq!(f.media.play_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn error_event_recovers_playback() {
        let f = fixture(ControllerConfig::default());
        let mut status = f.controller.subscribe_status();

        f.controller.request_play();
        wait_for(&mut status, PlaybackStatus::Playing).await;

        f.media.send(MediaEvent::Error {
            message: "MEDIA_ERR_NETWORK".to_string(),
        });
        wait_for(&mut status, PlaybackStatus::Reconnecting).await;
        wait_for(&mut status, PlaybackStatus::Playing).await;
        assert_eq!(f.media.play_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn error_leaves_playing_before_the_settle_elapses() {
        let f = fixture(ControllerConfig::default());
        let mut status = f.controller.subscribe_status();

        f.controller.request_play();
        wait_for(&mut status, PlaybackStatus::Playing).await;

        f.media.send(MediaEvent::Error {
            message: "MEDIA_ERR_NETWORK".to_string(),
        });
        // Well inside the error settle window: the outage must already be
        // visible even though no attempt has started yet.
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(f.controller.status(), PlaybackStatus::Reconnecting);
        assert_eq!(f.media.play_calls(), 1);

        wait_for(&mut status, PlaybackStatus::Playing).await;
    }

    #[tokio::test(start_paused = true)]
    async fn second_trigger_mid_retry_is_ignored() {
        let mut config = ControllerConfig::default();
        config.retry.max_attempts = 2;
        let f = fixture(config);
        f.media
            .script_play_results([Err(()), Err(()), Err(()), Err(())]);
        let mut status = f.controller.subscribe_status();

        f.controller.request_play();
        wait_for(&mut status, PlaybackStatus::Reconnecting).await;
        f.media.send(MediaEvent::Stalled);
        f.media.send(MediaEvent::Stalled);

        wait_for(&mut status, PlaybackStatus::Error).await;
        // Initial play plus the bounded attempts; the extra stalls must not
        // have started sequences of their own.
        assert_eq!(f.media.play_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn offline_pauses_and_restore_resumes() {
        let f = fixture(ControllerConfig::default());
        let mut status = f.controller.subscribe_status();

        f.controller.request_play();
        wait_for(&mut status, PlaybackStatus::Playing).await;

        f.monitor.set_online(false);
        wait_for(&mut status, PlaybackStatus::Offline).await;

        f.monitor.set_online(true);
        wait_for(&mut status, PlaybackStatus::Playing).await;
        assert_eq!(f.media.play_calls(), 2);
        assert_eq!(*f.emitter.connectivity.lock(), vec![false, true]);
    }

    #[tokio::test(start_paused = true)]
    async fn offline_while_stopped_restores_to_paused() {
        let f = fixture(ControllerConfig::default());
        let mut status = f.controller.subscribe_status();

        f.controller.request_play();
        wait_for(&mut status, PlaybackStatus::Playing).await;
        f.controller.request_stop();
        wait_for(&mut status, PlaybackStatus::Paused).await;

        f.monitor.set_online(false);
        wait_for(&mut status, PlaybackStatus::Offline).await;
        f.monitor.set_online(true);
        wait_for(&mut status, PlaybackStatus::Paused).await;
        assert_eq!(f.media.play_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn health_check_catches_silent_death() {
        let f = fixture(ControllerConfig::default());
        let mut status = f.controller.subscribe_status();

        f.controller.request_play();
        wait_for(&mut status, PlaybackStatus::Playing).await;

        f.media.die_silently();
        wait_for(&mut status, PlaybackStatus::Reconnecting).await;
        wait_for(&mut status, PlaybackStatus::Playing).await;
        assert_eq!(f.media.play_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn health_check_can_be_disabled() {
        let mut config = ControllerConfig::default();
        config.health_check.enabled = false;
        let f = fixture(config);
        let mut status = f.controller.subscribe_status();

        f.controller.request_play();
        wait_for(&mut status, PlaybackStatus::Playing).await;

        f.media.die_silently();
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(f.controller.status(), PlaybackStatus::Playing);
        assert_eq!(f.media.play_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn external_pause_becomes_stop() {
        let f = fixture(ControllerConfig::default());
        let mut status = f.controller.subscribe_status();

        f.controller.request_play();
        wait_for(&mut status, PlaybackStatus::Playing).await;

        // Element paused by something outside the controller.
        f.media.die_silently();
        f.media.send(MediaEvent::Pause);
        wait_for(&mut status, PlaybackStatus::Paused).await;

        // Intent flipped to stopped, so nothing tries to resume.
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(f.controller.status(), PlaybackStatus::Paused);
        assert_eq!(f.media.play_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn visualizer_follows_playing_boundary() {
        let mut config = ControllerConfig::default();
        config.visualizer = true;
        let f = fixture(config);
        let mut status = f.controller.subscribe_status();

        f.controller.request_play();
        wait_for(&mut status, PlaybackStatus::Playing).await;
        assert_eq!(*f.emitter.visualizer.lock(), vec![true]);

        f.controller.request_stop();
        wait_for(&mut status, PlaybackStatus::Paused).await;
        assert_eq!(*f.emitter.visualizer.lock(), vec![true, false]);
    }

    #[tokio::test(start_paused = true)]
    async fn set_volume_normalizes_percent_scale() {
        let f = fixture(ControllerConfig::default());
        f.controller.set_volume(80.0);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!((*f.media.volume.lock() - 0.8).abs() < f32::EPSILON);
    }

    #[tokio::test(start_paused = true)]
    async fn statuses_are_emitted_once_per_transition() {
        let f = fixture(ControllerConfig::default());
        let mut status = f.controller.subscribe_status();

        f.controller.request_play();
        wait_for(&mut status, PlaybackStatus::Playing).await;
        f.controller.request_stop();
        wait_for(&mut status, PlaybackStatus::Paused).await;

        assert_eq!(
            *f.emitter.statuses.lock(),
            vec![
                PlaybackStatus::Loading,
                PlaybackStatus::Playing,
                PlaybackStatus::Paused,
            ]
        );
    }
}
