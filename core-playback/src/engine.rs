//! # Playback Engine
//!
//! Drives one platform audio resource at a time:
//!
//! - `play_song()` resolves the media URL, releases the previous resource and
//!   loads the new one through the host [`AudioBackend`]
//! - transport controls (`toggle_play_pause()`, `seek()`) act on the live
//!   resource only
//! - `play_next()` / `play_previous()` walk the queue with wrap-around
//! - a status monitor applies position ticks and advances the queue when a
//!   track plays to its end
//!
//! ## Concurrency
//!
//! Engine state lives behind a synchronous mutex that is never held across an
//! `.await`. Loads are serialized by an async operation lock; every
//! `play_song()` call gets a [`CancellationToken`] so a newer call can abandon
//! a load that hangs in the backend. Each loaded resource gets a fresh
//! [`SessionId`]; ticks and command completions that belong to an older
//! session are dropped.
//!
//! ## Usage
//!
//! ```ignore
//! use core_playback::{MediaResolver, PlaybackEngine};
//!
//! let resolver = MediaResolver::new("http://192.168.0.101:5000")?;
//! let engine = PlaybackEngine::new(backend, resolver, event_bus, Some(session_manager));
//!
//! engine.play_song(tracks[0].clone(), tracks.clone()).await?;
//! let mut updates = engine.subscribe();
//! while updates.changed().await.is_ok() {
//!     render(&updates.borrow());
//! }
//! ```

use crate::error::{PlaybackError, Result, TransportError};
use crate::queue::Queue;
use crate::resolver::MediaResolver;
use crate::state::{PlaybackPhase, PlayerSnapshot, SessionId};
use crate::types::Track;
use bridge_traits::http::AUTHORIZATION_HEADER;
use bridge_traits::playback::{
    AudioBackend, AudioResource, LoadRequest, PlaybackStatus, StatusStream,
};
use core_auth::CredentialProvider;
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use core_runtime::logging::strip_path;
use futures::future::BoxFuture;
use futures::StreamExt;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};

/// The loaded resource and the task consuming its status stream.
struct ActiveSession {
    id: SessionId,
    resource: Arc<dyn AudioResource>,
    monitor: Option<JoinHandle<()>>,
}

struct EngineState {
    phase: PlaybackPhase,
    current_track: Option<Track>,
    queue: Queue,
    is_playing: bool,
    position: Duration,
    duration: Option<Duration>,
    active: Option<ActiveSession>,
    /// Ticket and token of the most recent `play_song` still in flight.
    pending_load: Option<(u64, CancellationToken)>,
}

impl EngineState {
    fn new() -> Self {
        Self {
            phase: PlaybackPhase::Idle,
            current_track: None,
            queue: Queue::default(),
            is_playing: false,
            position: Duration::ZERO,
            duration: None,
            active: None,
            pending_load: None,
        }
    }

    fn session(&self) -> Option<SessionId> {
        self.active.as_ref().map(|active| active.id)
    }

    fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            phase: self.phase,
            current_track: self.current_track.clone(),
            queue: self.queue.clone(),
            is_playing: self.is_playing,
            position: self.position,
            duration: self.duration,
            session: self.session(),
        }
    }

    /// Back to idle with nothing loaded. The queue is kept.
    fn reset_to_idle(&mut self) {
        self.phase = PlaybackPhase::Idle;
        self.current_track = None;
        self.is_playing = false;
        self.position = Duration::ZERO;
        self.duration = None;
    }

    fn clear_pending(&mut self, ticket: u64) {
        if matches!(self.pending_load, Some((pending, _)) if pending == ticket) {
            self.pending_load = None;
        }
    }

    /// Resource handle for transport commands, if a session is live.
    fn transport_target(&self) -> std::result::Result<(SessionId, Arc<dyn AudioResource>), TransportError> {
        match &self.active {
            Some(active) if self.phase.is_active() => Ok((active.id, Arc::clone(&active.resource))),
            _ => Err(TransportError::NoActiveSession),
        }
    }

    fn track_id(&self) -> String {
        self.current_track
            .as_ref()
            .map(|track| track.id.to_string())
            .unwrap_or_default()
    }
}

enum TickOutcome {
    Applied,
    Ignored,
    Stale,
    Finished,
}

#[derive(Clone, Copy)]
enum Direction {
    Next,
    Previous,
}

struct EngineInner {
    backend: Arc<dyn AudioBackend>,
    resolver: MediaResolver,
    credentials: Option<Arc<dyn CredentialProvider>>,
    event_bus: EventBus,
    state: Mutex<EngineState>,
    op_lock: tokio::sync::Mutex<()>,
    snapshot_tx: watch::Sender<PlayerSnapshot>,
    next_session: AtomicU64,
    next_ticket: AtomicU64,
}

impl EngineInner {
    /// Publish the current state. Called with the state lock held so
    /// snapshots are observed in mutation order.
    fn publish(&self, state: &EngineState) {
        self.snapshot_tx.send_replace(state.snapshot());
    }

    fn emit(&self, event: PlaybackEvent) {
        if self.event_bus.emit(CoreEvent::Playback(event)).is_err() {
            trace!("No event subscribers");
        }
    }

    fn apply_status(&self, session: SessionId, status: PlaybackStatus) -> TickOutcome {
        let mut state = self.state.lock();
        if state.session() != Some(session) {
            return TickOutcome::Stale;
        }
        if !status.is_loaded {
            return TickOutcome::Ignored;
        }

        state.position = status.position;
        if status.duration.is_some() {
            state.duration = status.duration;
        }
        self.publish(&state);

        let track_id = state.track_id();
        let duration_ms = state.duration.map(millis);
        drop(state);

        self.emit(PlaybackEvent::PositionChanged {
            track_id: track_id.clone(),
            position_ms: millis(status.position),
            duration_ms,
        });

        if status.did_finish {
            self.emit(PlaybackEvent::Completed { track_id });
            TickOutcome::Finished
        } else {
            TickOutcome::Applied
        }
    }
}

impl Drop for EngineInner {
    fn drop(&mut self) {
        if let Some(active) = self.state.get_mut().active.as_mut() {
            if let Some(monitor) = active.monitor.take() {
                monitor.abort();
            }
        }
    }
}

/// Single-resource playback engine.
///
/// Cheap to clone; clones share the same engine.
#[derive(Clone)]
pub struct PlaybackEngine {
    inner: Arc<EngineInner>,
}

impl PlaybackEngine {
    /// Create an idle engine.
    ///
    /// When `credentials` yields a credential, media loads carry an
    /// `Authorization` header; otherwise media is fetched anonymously.
    pub fn new(
        backend: Arc<dyn AudioBackend>,
        resolver: MediaResolver,
        event_bus: EventBus,
        credentials: Option<Arc<dyn CredentialProvider>>,
    ) -> Self {
        let (snapshot_tx, _) = watch::channel(PlayerSnapshot::default());

        Self {
            inner: Arc::new(EngineInner {
                backend,
                resolver,
                credentials,
                event_bus,
                state: Mutex::new(EngineState::new()),
                op_lock: tokio::sync::Mutex::new(()),
                snapshot_tx,
                next_session: AtomicU64::new(0),
                next_ticket: AtomicU64::new(0),
            }),
        }
    }

    /// Load `track` and start playing it.
    ///
    /// A non-empty `queue` replaces the stored queue; an empty one keeps it.
    ///
    /// # Errors
    ///
    /// - [`PlaybackError::Resolution`] if the track has no usable path. The
    ///   current session is left untouched.
    /// - [`PlaybackError::Load`] if the backend fails. The engine is idle
    ///   afterwards.
    /// - [`PlaybackError::LoadCancelled`] if a newer `play_song` or `stop`
    ///   superseded this call.
    #[instrument(skip(self, track, queue), fields(track_id = %track.id))]
    pub async fn play_song(&self, track: Track, queue: Vec<Track>) -> Result<()> {
        self.start(track, queue, None).await
    }

    /// Pause when playing, resume when paused. Returns the new playing flag.
    #[instrument(skip(self))]
    pub async fn toggle_play_pause(&self) -> Result<bool> {
        let (session, resource, was_playing) = {
            let state = self.inner.state.lock();
            let (session, resource) = state.transport_target()?;
            (session, resource, state.is_playing)
        };

        let result = if was_playing {
            resource.pause().await
        } else {
            resource.play().await
        };
        result.map_err(|e| TransportError::Backend(e.to_string()))?;

        let mut state = self.inner.state.lock();
        if state.session() != Some(session) {
            debug!(%session, "Session replaced during toggle");
            return Err(TransportError::NoActiveSession.into());
        }

        state.is_playing = !was_playing;
        state.phase = if state.is_playing {
            PlaybackPhase::Playing
        } else {
            PlaybackPhase::Paused
        };
        self.inner.publish(&state);

        let track_id = state.track_id();
        let position_ms = millis(state.position);
        let is_playing = state.is_playing;
        drop(state);

        self.inner.emit(if is_playing {
            PlaybackEvent::Resumed {
                track_id,
                position_ms,
            }
        } else {
            PlaybackEvent::Paused {
                track_id,
                position_ms,
            }
        });

        Ok(is_playing)
    }

    /// Skip to the next queued track, wrapping to the first.
    ///
    /// `Ok(None)` when nothing is playing or the current track is not queued.
    #[instrument(skip(self))]
    pub async fn play_next(&self) -> Result<Option<Track>> {
        self.skip(Direction::Next, None).await
    }

    /// Skip to the previous queued track, wrapping to the last.
    #[instrument(skip(self))]
    pub async fn play_previous(&self) -> Result<Option<Track>> {
        self.skip(Direction::Previous, None).await
    }

    /// Seek to `target_ms` milliseconds. Returns the clamped position.
    #[instrument(skip(self))]
    pub async fn seek(&self, target_ms: f64) -> Result<Duration> {
        let (session, resource, duration) = {
            let state = self.inner.state.lock();
            let (session, resource) = state.transport_target()?;
            (session, resource, state.duration)
        };

        let target = clamp_seek(target_ms, duration);
        resource
            .seek_to(target)
            .await
            .map_err(|e| TransportError::Backend(e.to_string()))?;

        let mut state = self.inner.state.lock();
        if state.session() != Some(session) {
            debug!(%session, "Session replaced during seek");
            return Ok(target);
        }
        state.position = target;
        self.inner.publish(&state);

        let track_id = state.track_id();
        let duration_ms = state.duration.map(millis);
        drop(state);

        self.inner.emit(PlaybackEvent::PositionChanged {
            track_id,
            position_ms: millis(target),
            duration_ms,
        });

        Ok(target)
    }

    /// Release the current resource and go idle. The queue is kept.
    #[instrument(skip(self))]
    pub async fn stop(&self) -> Result<()> {
        if let Some((_, token)) = self.inner.state.lock().pending_load.take() {
            token.cancel();
        }

        let _guard = self.inner.op_lock.lock().await;
        let stopped = self.inner.state.lock().current_track.clone();
        self.release_active().await;

        {
            let mut state = self.inner.state.lock();
            state.reset_to_idle();
            self.inner.publish(&state);
        }

        if let Some(track) = stopped {
            info!(track_id = %track.id, "Playback stopped");
            self.inner.emit(PlaybackEvent::Stopped {
                track_id: track.id.to_string(),
            });
        }

        Ok(())
    }

    /// Watch the player state. The receiver starts at the current snapshot.
    pub fn subscribe(&self) -> watch::Receiver<PlayerSnapshot> {
        self.inner.snapshot_tx.subscribe()
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        self.inner.state.lock().snapshot()
    }

    pub fn current_track(&self) -> Option<Track> {
        self.inner.state.lock().current_track.clone()
    }

    pub fn is_playing(&self) -> bool {
        self.inner.state.lock().is_playing
    }

    pub fn position(&self) -> Duration {
        self.inner.state.lock().position
    }

    pub fn duration(&self) -> Option<Duration> {
        self.inner.state.lock().duration
    }

    pub fn queue(&self) -> Queue {
        self.inner.state.lock().queue.clone()
    }

    pub fn phase(&self) -> PlaybackPhase {
        self.inner.state.lock().phase
    }

    /// Shared load path. With `expected` set, the load only proceeds while
    /// that session is still the live one and no other load is pending.
    async fn start(
        &self,
        track: Track,
        queue: Vec<Track>,
        expected: Option<SessionId>,
    ) -> Result<()> {
        let inner = &self.inner;
        let url = inner.resolver.resolve(&track.storage_path)?;

        let ticket = inner.next_ticket.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        {
            let mut state = inner.state.lock();
            if expected.is_some() && state.pending_load.is_some() {
                return Err(PlaybackError::LoadCancelled);
            }
            if let Some((_, previous)) = state.pending_load.replace((ticket, token.clone())) {
                debug!("Cancelling in-flight load");
                previous.cancel();
            }
        }

        let _guard = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(PlaybackError::LoadCancelled),
            guard = inner.op_lock.lock() => guard,
        };

        if let Some(expected) = expected {
            let mut state = inner.state.lock();
            if state.session() != Some(expected) {
                state.clear_pending(ticket);
                return Err(PlaybackError::LoadCancelled);
            }
        }

        self.release_active().await;

        {
            let mut state = inner.state.lock();
            if token.is_cancelled() {
                state.reset_to_idle();
                inner.publish(&state);
                return Err(PlaybackError::LoadCancelled);
            }
            state.reset_to_idle();
            state.phase = PlaybackPhase::Loading;
            if !queue.is_empty() {
                state.queue = Queue::new(queue);
            }
            inner.publish(&state);
        }

        debug!(file = %strip_path(&track.storage_path), "Loading track");

        let load = async {
            let mut request = LoadRequest::new(url);
            if let Some(provider) = &inner.credentials {
                if let Some(credential) = provider.credential().await {
                    request = request
                        .with_header(AUTHORIZATION_HEADER, credential.authorization_value());
                }
            }
            inner.backend.load(request).await
        };

        let loaded = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            result = load => Some(result),
        };

        match loaded {
            None => {
                debug!("Load abandoned");
                let mut state = inner.state.lock();
                state.reset_to_idle();
                inner.publish(&state);
                Err(PlaybackError::LoadCancelled)
            }
            Some(Ok(resource)) if token.is_cancelled() => {
                debug!("Load finished after cancellation, releasing resource");
                if let Err(e) = resource.release().await {
                    warn!(error = %e, "Failed to release superseded resource");
                }
                let mut state = inner.state.lock();
                state.reset_to_idle();
                inner.publish(&state);
                Err(PlaybackError::LoadCancelled)
            }
            Some(Ok(resource)) => {
                let resource: Arc<dyn AudioResource> = Arc::from(resource);
                let session = SessionId(inner.next_session.fetch_add(1, Ordering::Relaxed) + 1);
                let status = resource.status_stream();

                {
                    let mut state = inner.state.lock();
                    let monitor =
                        tokio::spawn(monitor_status(Arc::downgrade(inner), session, status));
                    state.active = Some(ActiveSession {
                        id: session,
                        resource,
                        monitor: Some(monitor),
                    });
                    state.phase = PlaybackPhase::Playing;
                    state.current_track = Some(track.clone());
                    state.is_playing = true;
                    state.position = Duration::ZERO;
                    state.duration = None;
                    state.clear_pending(ticket);
                    inner.publish(&state);
                }

                info!(%session, title = %track.title, "Playback started");
                inner.emit(PlaybackEvent::Started {
                    track_id: track.id.to_string(),
                    title: track.title.clone(),
                    session: session.as_u64(),
                });
                Ok(())
            }
            Some(Err(e)) => {
                warn!(error = %e, "Failed to load track");
                {
                    let mut state = inner.state.lock();
                    state.reset_to_idle();
                    state.clear_pending(ticket);
                    inner.publish(&state);
                }
                inner.emit(PlaybackEvent::Error {
                    track_id: Some(track.id.to_string()),
                    message: e.to_string(),
                    recoverable: true,
                });
                Err(PlaybackError::Load(e.to_string()))
            }
        }
    }

    async fn skip(
        &self,
        direction: Direction,
        expected: Option<SessionId>,
    ) -> Result<Option<Track>> {
        let target = {
            let state = self.inner.state.lock();
            if expected.is_some() && state.session() != expected {
                return Ok(None);
            }
            let Some(current) = state.current_track.as_ref() else {
                return Ok(None);
            };
            match direction {
                Direction::Next => state.queue.next_after(&current.id),
                Direction::Previous => state.queue.previous_before(&current.id),
            }
            .cloned()
        };

        let Some(target) = target else {
            debug!("Nothing to skip to");
            return Ok(None);
        };

        self.start_boxed(target.clone(), expected).await?;
        Ok(Some(target))
    }

    /// Boxed: the status monitor reaches this through a spawned task, which
    /// would otherwise make the type of `start`'s future recursive.
    fn start_boxed(&self, track: Track, expected: Option<SessionId>) -> BoxFuture<'_, Result<()>> {
        Box::pin(self.start(track, Vec::new(), expected))
    }

    /// Detach the live session, stop its monitor and release the resource.
    async fn release_active(&self) {
        let active = self.inner.state.lock().active.take();
        let Some(mut active) = active else {
            return;
        };

        if let Some(monitor) = active.monitor.take() {
            monitor.abort();
        }
        if let Err(e) = active.resource.release().await {
            warn!(session = %active.id, error = %e, "Failed to release audio resource");
        } else {
            debug!(session = %active.id, "Audio resource released");
        }
    }
}

/// Consume one resource's status ticks until the session is replaced or the
/// stream ends. A finished track stays monitored: with nothing to advance to
/// it remains loaded and can be replayed.
async fn monitor_status(engine: Weak<EngineInner>, session: SessionId, mut status: StatusStream) {
    while let Some(tick) = status.next().await {
        let Some(inner) = engine.upgrade() else {
            return;
        };

        match inner.apply_status(session, tick) {
            TickOutcome::Applied | TickOutcome::Ignored => {}
            TickOutcome::Stale => {
                trace!(%session, "Dropping tick from replaced session");
                return;
            }
            TickOutcome::Finished => {
                tokio::spawn(advance_after_finish(PlaybackEngine { inner }, session));
            }
        }
    }
    debug!(%session, "Status stream ended");
}

/// Move to the next queued track after `session` played to its end.
async fn advance_after_finish(engine: PlaybackEngine, session: SessionId) {
    match engine.skip(Direction::Next, Some(session)).await {
        Ok(Some(track)) => debug!(track_id = %track.id, "Advanced to next track"),
        Ok(None) => {
            let mut state = engine.inner.state.lock();
            if state.session() == Some(session) {
                state.is_playing = false;
                state.phase = PlaybackPhase::Paused;
                engine.inner.publish(&state);
            }
        }
        Err(PlaybackError::LoadCancelled) => {
            debug!(%session, "Queue advance superseded");
        }
        Err(e) => warn!(%session, error = %e, "Queue advance failed"),
    }
}

/// Clamp a seek request into `[0, duration]`. NaN and negative targets map
/// to zero; the upper bound applies only once the duration is known.
pub(crate) fn clamp_seek(target_ms: f64, duration: Option<Duration>) -> Duration {
    let upper = duration.unwrap_or(Duration::MAX);
    if target_ms.is_nan() || target_ms <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(target_ms / 1000.0)
        .unwrap_or(upper)
        .min(upper)
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_seek_bounds() {
        let duration = Some(Duration::from_secs(200));

        assert_eq!(clamp_seek(-5.0, duration), Duration::ZERO);
        assert_eq!(clamp_seek(f64::NAN, duration), Duration::ZERO);
        assert_eq!(clamp_seek(0.0, duration), Duration::ZERO);
        assert_eq!(clamp_seek(1_500.0, duration), Duration::from_millis(1_500));
        assert_eq!(clamp_seek(250_000.0, duration), Duration::from_secs(200));
        assert_eq!(clamp_seek(f64::INFINITY, duration), Duration::from_secs(200));
    }

    #[test]
    fn test_clamp_seek_without_duration() {
        assert_eq!(clamp_seek(90_000.0, None), Duration::from_secs(90));
    }

    #[test]
    fn test_millisecond_conversion_saturates() {
        assert_eq!(millis(Duration::from_millis(1_234)), 1_234);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }
}
