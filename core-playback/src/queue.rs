//! Ordered play queue with wrap-around navigation.

use crate::types::{Track, TrackId};
use serde::Serialize;
use std::ops::Deref;
use std::sync::Arc;

/// The ordered list of tracks a session was started from.
///
/// Immutable and cheap to clone; replacing the queue swaps the whole list.
/// Lookups are linear scans by track id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Queue(Arc<[Track]>);

impl Queue {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self(tracks.into())
    }

    /// Index of the first track with `id`.
    pub fn position_of(&self, id: &TrackId) -> Option<usize> {
        self.0.iter().position(|track| &track.id == id)
    }

    /// Track after `id`, wrapping from last to first.
    ///
    /// `None` when the queue is empty or does not contain `id`.
    pub fn next_after(&self, id: &TrackId) -> Option<&Track> {
        let index = self.position_of(id)?;
        self.0.get((index + 1) % self.0.len())
    }

    /// Track before `id`, wrapping from first to last.
    pub fn previous_before(&self, id: &TrackId) -> Option<&Track> {
        let index = self.position_of(id)?;
        let len = self.0.len();
        self.0.get((index + len - 1) % len)
    }

    pub fn to_vec(&self) -> Vec<Track> {
        self.0.to_vec()
    }
}

impl Default for Queue {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl Deref for Queue {
    type Target = [Track];

    fn deref(&self) -> &[Track] {
        &self.0
    }
}

impl From<Vec<Track>> for Queue {
    fn from(tracks: Vec<Track>) -> Self {
        Self::new(tracks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue(ids: &[i64]) -> Queue {
        ids.iter()
            .map(|&id| Track::new(id, format!("Track {id}"), format!("/songs/{id}.mp3")))
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn test_next_wraps_for_every_position() {
        let q = queue(&[10, 20, 30, 40]);
        for (index, track) in q.iter().enumerate() {
            let expected = &q[(index + 1) % q.len()];
            assert_eq!(q.next_after(&track.id), Some(expected));
        }
    }

    #[test]
    fn test_previous_wraps_for_every_position() {
        let q = queue(&[10, 20, 30, 40]);
        for (index, track) in q.iter().enumerate() {
            let expected = &q[(index + q.len() - 1) % q.len()];
            assert_eq!(q.previous_before(&track.id), Some(expected));
        }
    }

    #[test]
    fn test_single_track_queue_points_to_itself() {
        let q = queue(&[7]);
        let id = TrackId::Number(7);
        assert_eq!(q.next_after(&id).map(|t| &t.id), Some(&id));
        assert_eq!(q.previous_before(&id).map(|t| &t.id), Some(&id));
    }

    #[test]
    fn test_missing_track_or_empty_queue() {
        let q = queue(&[1, 2]);
        assert_eq!(q.next_after(&TrackId::Number(3)), None);
        assert_eq!(q.previous_before(&TrackId::from("1")), None);

        let empty = Queue::default();
        assert!(empty.is_empty());
        assert_eq!(empty.next_after(&TrackId::Number(1)), None);
    }

    #[test]
    fn test_duplicate_ids_use_first_match() {
        let q = queue(&[1, 2, 1, 3]);
        assert_eq!(q.position_of(&TrackId::Number(1)), Some(0));
        assert_eq!(q.next_after(&TrackId::Number(1)).map(|t| &t.id), Some(&TrackId::Number(2)));
    }

    #[test]
    fn test_serializes_as_plain_track_list() {
        let json = serde_json::to_value(queue(&[4, 5])).unwrap();

        assert_eq!(json.as_array().map(Vec::len), Some(2));
        assert_eq!(json[0]["id"], 4);
        assert_eq!(json[1]["file_path"], "/songs/5.mp3");
        assert_eq!(serde_json::to_string(&Queue::default()).unwrap(), "[]");
    }
}
