//! # Event Bus
//!
//! Typed notifications from the core to the UI, carried over a
//! `tokio::sync::broadcast` channel. The session provider publishes
//! [`AuthEvent`]s and the playback engine publishes [`PlaybackEvent`]s; any
//! number of subscribers receive a clone of each.
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let bus = EventBus::new(16);
//! let mut rx = bus.subscribe();
//!
//! bus.emit(CoreEvent::Playback(PlaybackEvent::Completed {
//!     track_id: "42".to_string(),
//! }))
//! .ok();
//!
//! assert_eq!(rx.recv().await.unwrap().description(), "Track completed");
//! # }
//! ```
//!
//! A slow subscriber gets `RecvError::Lagged(n)` and simply continues from the
//! oldest retained event; position ticks are the usual cause. `Closed` means
//! every publisher is gone. Emitting with no subscribers is an `Err` that
//! publishers ignore.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast::{self, error::TryRecvError};

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Channel capacity used when none is configured.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    Auth(AuthEvent),
    Playback(PlaybackEvent),
}

impl CoreEvent {
    /// Short human-readable summary, suitable for a status line.
    pub fn description(&self) -> &'static str {
        match self {
            CoreEvent::Auth(event) => event.description(),
            CoreEvent::Playback(event) => event.description(),
        }
    }

    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Auth(event) => event.severity(),
            CoreEvent::Playback(event) => event.severity(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

/// Session lifecycle notifications.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum AuthEvent {
    SignedIn { user_id: String, username: String },
    /// A persisted credential was accepted at startup.
    SessionRestored { user_id: String },
    SignedOut,
    /// `recoverable` is set for network failures, where retrying may work.
    AuthError { message: String, recoverable: bool },
}

impl AuthEvent {
    fn description(&self) -> &'static str {
        match self {
            AuthEvent::SignedIn { .. } => "User signed in",
            AuthEvent::SessionRestored { .. } => "Session restored",
            AuthEvent::SignedOut => "User signed out",
            AuthEvent::AuthError { .. } => "Authentication error",
        }
    }

    fn severity(&self) -> EventSeverity {
        match self {
            AuthEvent::AuthError {
                recoverable: true, ..
            } => EventSeverity::Warning,
            AuthEvent::AuthError { .. } => EventSeverity::Error,
            _ => EventSeverity::Info,
        }
    }
}

/// Playback notifications. Track ids are rendered as strings; positions and
/// durations are milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// A resource loaded and started playing under a new session number.
    Started {
        track_id: String,
        title: String,
        session: u64,
    },
    Paused {
        track_id: String,
        position_ms: u64,
    },
    Resumed {
        track_id: String,
        position_ms: u64,
    },
    /// Released by `stop()` before reaching the end.
    Stopped { track_id: String },
    /// Played through to the natural end of the media.
    Completed { track_id: String },
    /// Emitted for every applied status tick and after each seek.
    PositionChanged {
        track_id: String,
        position_ms: u64,
        duration_ms: Option<u64>,
    },
    Error {
        track_id: Option<String>,
        message: String,
        /// Whether replaying the track may succeed.
        recoverable: bool,
    },
}

impl PlaybackEvent {
    fn description(&self) -> &'static str {
        match self {
            PlaybackEvent::Started { .. } => "Playback started",
            PlaybackEvent::Paused { .. } => "Playback paused",
            PlaybackEvent::Resumed { .. } => "Playback resumed",
            PlaybackEvent::Stopped { .. } => "Playback stopped",
            PlaybackEvent::Completed { .. } => "Track completed",
            PlaybackEvent::PositionChanged { .. } => "Playback position changed",
            PlaybackEvent::Error { .. } => "Playback error",
        }
    }

    fn severity(&self) -> EventSeverity {
        match self {
            PlaybackEvent::Error { .. } => EventSeverity::Error,
            PlaybackEvent::PositionChanged { .. } => EventSeverity::Debug,
            _ => EventSeverity::Info,
        }
    }
}

/// Cloneable publisher handle; every clone feeds the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// `capacity` must be non-zero (`CoreConfig` validation guarantees this
    /// for configured buses); `broadcast::channel` panics otherwise.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish `event`, returning how many subscribers will see it.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// New receiver starting after the most recent event.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// ```rust
    /// use core_runtime::events::EventBus;
    ///
    /// let bus = EventBus::default();
    /// let _rx = bus.subscribe();
    /// assert_eq!(bus.subscriber_count(), 1);
    /// ```
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventBus({} subscribers)", self.subscriber_count())
    }
}

type Predicate = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// Receiver that skips events rejected by an optional predicate.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let bus = EventBus::default();
/// let playback_only = EventStream::new(bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Playback(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    predicate: Option<Predicate>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            predicate: None,
        }
    }

    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Box::new(predicate));
        self
    }

    fn wants(&self, event: &CoreEvent) -> bool {
        match &self.predicate {
            Some(predicate) => predicate(event),
            None => true,
        }
    }

    /// Wait for the next accepted event.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.wants(&event) {
                return Ok(event);
            }
        }
    }

    /// Next accepted event if one is already buffered.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            let event = match self.receiver.try_recv() {
                Ok(event) => event,
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Lagged(missed)) => return Some(Err(RecvError::Lagged(missed))),
                Err(TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            };
            if self.wants(&event) {
                return Some(Ok(event));
            }
        }
    }
}
