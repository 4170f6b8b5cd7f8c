//! Track metadata as delivered by the music API.

use core_auth::UserId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Fallback shown when a track carries no artist.
pub const UNKNOWN_ARTIST: &str = "Unknown artist";

/// Unique track identifier.
///
/// The API sends ids as JSON numbers for stored songs and as strings for
/// some search results; both forms are preserved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrackId {
    Number(i64),
    Text(String),
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackId::Number(n) => write!(f, "{}", n),
            TrackId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for TrackId {
    fn from(id: i64) -> Self {
        TrackId::Number(id)
    }
}

impl From<&str> for TrackId {
    fn from(id: &str) -> Self {
        TrackId::Text(id.to_string())
    }
}

impl From<String> for TrackId {
    fn from(id: String) -> Self {
        TrackId::Text(id)
    }
}

/// Artist reference embedded in a track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistRef {
    pub id: UserId,
    pub username: String,
}

/// A playable song.
///
/// ```
/// use core_playback::Track;
///
/// let track: Track = serde_json::from_str(
///     r#"{"id": 3, "title": "Intro", "file_path": "/uploads/intro.mp3"}"#,
/// ).unwrap();
/// assert_eq!(track.storage_path, "/uploads/intro.mp3");
/// assert_eq!(track.display_artist(), "Unknown artist");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    /// Server-relative media path.
    #[serde(rename = "file_path")]
    pub storage_path: String,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub artist: Option<ArtistRef>,
}

impl Track {
    pub fn new(
        id: impl Into<TrackId>,
        title: impl Into<String>,
        storage_path: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            storage_path: storage_path.into(),
            cover_image: None,
            artist: None,
        }
    }

    pub fn with_artist(mut self, id: UserId, username: impl Into<String>) -> Self {
        self.artist = Some(ArtistRef {
            id,
            username: username.into(),
        });
        self
    }

    pub fn with_cover_image(mut self, cover_image: impl Into<String>) -> Self {
        self.cover_image = Some(cover_image.into());
        self
    }

    /// Artist name for display, or [`UNKNOWN_ARTIST`].
    pub fn display_artist(&self) -> &str {
        self.artist
            .as_ref()
            .map(|artist| artist.username.as_str())
            .filter(|name| !name.is_empty())
            .unwrap_or(UNKNOWN_ARTIST)
    }
}

/// Formats a playback position as `m:ss`, the way the transport bar shows it.
///
/// ```
/// use core_playback::format_timestamp;
/// use std::time::Duration;
///
/// assert_eq!(format_timestamp(Duration::from_millis(65_900)), "1:05");
/// ```
pub fn format_timestamp(position: Duration) -> String {
    let total = position.as_secs();
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_id_accepts_number_and_string() {
        let numeric: TrackId = serde_json::from_str("12").unwrap();
        let text: TrackId = serde_json::from_str("\"abc\"").unwrap();

        assert_eq!(numeric, TrackId::Number(12));
        assert_eq!(text, TrackId::Text("abc".to_string()));
        assert_eq!(numeric.to_string(), "12");
    }

    #[test]
    fn test_track_deserializes_api_shape() {
        let track: Track = serde_json::from_str(
            r#"{
                "id": 5,
                "title": "Night Drive",
                "file_path": "uploads/songs/night.mp3",
                "cover_image": "uploads/covers/night.jpg",
                "artist": {"id": 2, "username": "Luna"}
            }"#,
        )
        .unwrap();

        assert_eq!(track.id, TrackId::Number(5));
        assert_eq!(track.display_artist(), "Luna");
        assert_eq!(track.cover_image.as_deref(), Some("uploads/covers/night.jpg"));
    }

    #[test]
    fn test_display_artist_fallback() {
        let track = Track::new(1, "Solo", "a.mp3");
        assert_eq!(track.display_artist(), UNKNOWN_ARTIST);

        let unnamed = Track::new(1, "Solo", "a.mp3").with_artist(UserId::new("9"), "");
        assert_eq!(unnamed.display_artist(), UNKNOWN_ARTIST);
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(Duration::ZERO), "0:00");
        assert_eq!(format_timestamp(Duration::from_secs(59)), "0:59");
        assert_eq!(format_timestamp(Duration::from_secs(600)), "10:00");
        assert_eq!(format_timestamp(Duration::from_secs(3725)), "62:05");
    }
}
