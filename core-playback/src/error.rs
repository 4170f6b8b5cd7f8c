//! # Playback Error Types

use thiserror::Error;

/// Errors returned by transport controls (pause, resume, seek).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// No resource is loaded, or one is still loading.
    #[error("No active playback session")]
    NoActiveSession,

    /// The platform player rejected the command.
    #[error("Audio backend error: {0}")]
    Backend(String),
}

/// Errors that can occur during playback operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    /// The track's storage path cannot be turned into a URL. Caller bug;
    /// never retried and leaves the current session untouched.
    #[error("Cannot resolve media URL: {0}")]
    Resolution(String),

    /// Network, missing-file or decode failure while loading. The engine is
    /// left idle; retrying means calling `play_song` again.
    #[error("Failed to load track: {0}")]
    Load(String),

    /// A newer `play_song` or `stop` superseded this load.
    #[error("Load superseded by a newer request")]
    LoadCancelled,

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Invalid media origin '{origin}': {reason}")]
    InvalidOrigin { origin: String, reason: String },
}

impl PlaybackError {
    /// Returns `true` if loading the media failed.
    pub fn is_load_error(&self) -> bool {
        matches!(self, PlaybackError::Load(_))
    }

    /// Returns `true` for transport control failures.
    pub fn is_transport_error(&self) -> bool {
        matches!(self, PlaybackError::Transport(_))
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(PlaybackError::Load("404".to_string()).is_load_error());
        assert!(!PlaybackError::LoadCancelled.is_load_error());

        let err: PlaybackError = TransportError::NoActiveSession.into();
        assert!(err.is_transport_error());
        assert_eq!(err.to_string(), "No active playback session");
    }
}
