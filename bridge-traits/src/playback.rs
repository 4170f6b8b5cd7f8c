//! Playback bridge traits and supporting audio types.
//!
//! These abstractions let the core playback engine drive a platform audio
//! player (AVPlayer, ExoPlayer, a desktop decoder, ...) without knowing how
//! it fetches or decodes media. The host supplies one [`AudioBackend`]; every
//! successful [`AudioBackend::load`] yields one [`AudioResource`] that owns a
//! native player instance until [`AudioResource::release`] is called.

use crate::{error::Result, platform::PlatformSendSync};
use futures::stream::BoxStream;
use std::collections::HashMap;
use std::time::Duration;

/// Stream of status ticks produced by a loaded resource.
pub type StatusStream = BoxStream<'static, PlaybackStatus>;

/// Request describing the media a backend should load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    /// Absolute HTTP(S) URL of the media.
    pub url: String,
    /// Extra request headers (e.g. `Authorization`) the backend must send
    /// when fetching the media.
    pub headers: HashMap<String, String>,
    /// Start playing as soon as enough data is buffered.
    pub autoplay: bool,
}

impl LoadRequest {
    /// Construct a request that auto-starts playback.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: HashMap::new(),
            autoplay: true,
        }
    }

    /// Attach a request header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Override the autoplay flag.
    pub fn with_autoplay(mut self, autoplay: bool) -> Self {
        self.autoplay = autoplay;
        self
    }
}

/// One status tick reported by a loaded resource.
///
/// Backends emit ticks at their own cadence (typically every 250-500 ms while
/// playing, plus one tick on every transport change).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaybackStatus {
    /// Current playback position.
    pub position: Duration,
    /// Total media duration, once known.
    pub duration: Option<Duration>,
    /// Whether the resource is loaded. Ticks with `false` carry no telemetry.
    pub is_loaded: bool,
    /// Set on the tick where the media played through to its natural end.
    /// Never set by a manual stop or release.
    pub did_finish: bool,
}

impl PlaybackStatus {
    /// Telemetry tick for a loaded resource.
    pub fn loaded(position: Duration, duration: Option<Duration>) -> Self {
        Self {
            position,
            duration,
            is_loaded: true,
            did_finish: false,
        }
    }

    /// Natural end-of-media tick.
    pub fn finished(duration: Duration) -> Self {
        Self {
            position: duration,
            duration: Some(duration),
            is_loaded: true,
            did_finish: true,
        }
    }

    /// Tick reported while the resource is not (or no longer) loaded.
    pub fn unloaded() -> Self {
        Self::default()
    }
}

/// Platform audio player capable of loading media URLs.
#[async_trait::async_trait]
pub trait AudioBackend: PlatformSendSync {
    /// Load the requested media and return the live resource.
    ///
    /// When `request.autoplay` is set the resource must already be playing
    /// when this returns. Network, missing-file and decode failures are
    /// reported as errors; the backend must not leave a half-loaded native
    /// player behind on failure, and dropping the returned future before it
    /// completes must abandon the load.
    async fn load(&self, request: LoadRequest) -> Result<Box<dyn AudioResource>>;
}

/// A single loaded native audio resource.
#[async_trait::async_trait]
pub trait AudioResource: PlatformSendSync {
    /// Begin or resume playback.
    async fn play(&self) -> Result<()>;

    /// Pause playback without releasing the resource.
    async fn pause(&self) -> Result<()>;

    /// Seek to an absolute position.
    async fn seek_to(&self, position: Duration) -> Result<()>;

    /// Release every native resource (decoder, audio session, buffers).
    /// The status stream ends after release.
    async fn release(&self) -> Result<()>;

    /// Subscribe to status ticks. Implementations may support a single
    /// subscriber; the engine subscribes exactly once per resource.
    fn status_stream(&self) -> StatusStream;
}
