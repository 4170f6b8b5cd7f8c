//! Observable player state.

use crate::queue::Queue;
use crate::types::Track;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Identifies one loaded resource. Incremented on every load so status ticks
/// from a released resource can be told apart from current ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(pub(crate) u64);

impl SessionId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Coarse engine phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum PlaybackPhase {
    #[default]
    Idle,
    Loading,
    Playing,
    Paused,
}

impl PlaybackPhase {
    /// Whether a resource is loaded and accepts transport commands.
    pub fn is_active(&self) -> bool {
        matches!(self, PlaybackPhase::Playing | PlaybackPhase::Paused)
    }
}

impl fmt::Display for PlaybackPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackPhase::Idle => write!(f, "Idle"),
            PlaybackPhase::Loading => write!(f, "Loading"),
            PlaybackPhase::Playing => write!(f, "Playing"),
            PlaybackPhase::Paused => write!(f, "Paused"),
        }
    }
}

/// Point-in-time copy of everything the UI renders.
///
/// Published through [`PlaybackEngine::subscribe`](crate::PlaybackEngine::subscribe)
/// after every state change.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlayerSnapshot {
    pub phase: PlaybackPhase,
    pub current_track: Option<Track>,
    pub queue: Queue,
    pub is_playing: bool,
    pub position: Duration,
    pub duration: Option<Duration>,
    pub session: Option<SessionId>,
}

impl PlayerSnapshot {
    /// Playback progress in `0.0..=1.0`, when the duration is known.
    pub fn progress(&self) -> Option<f64> {
        let duration = self.duration?.as_secs_f64();
        if duration <= 0.0 {
            return None;
        }
        Some((self.position.as_secs_f64() / duration).clamp(0.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_snapshot_is_idle() {
        let snapshot = PlayerSnapshot::default();
        assert_eq!(snapshot.phase, PlaybackPhase::Idle);
        assert!(snapshot.current_track.is_none());
        assert!(snapshot.queue.is_empty());
        assert!(!snapshot.is_playing);
        assert_eq!(snapshot.progress(), None);
    }

    #[test]
    fn test_progress_is_clamped() {
        let snapshot = PlayerSnapshot {
            position: Duration::from_secs(30),
            duration: Some(Duration::from_secs(120)),
            ..Default::default()
        };
        assert_eq!(snapshot.progress(), Some(0.25));

        let overshoot = PlayerSnapshot {
            position: Duration::from_secs(200),
            duration: Some(Duration::from_secs(120)),
            ..Default::default()
        };
        assert_eq!(overshoot.progress(), Some(1.0));
    }

    #[test]
    fn test_phase_activity() {
        assert!(PlaybackPhase::Playing.is_active());
        assert!(PlaybackPhase::Paused.is_active());
        assert!(!PlaybackPhase::Loading.is_active());
        assert_eq!(PlaybackPhase::Idle.to_string(), "Idle");
        assert_eq!(SessionId(4).to_string(), "#4");
    }
}
