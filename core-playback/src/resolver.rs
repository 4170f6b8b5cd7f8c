//! Media URL derivation.

use crate::error::{PlaybackError, Result};
use core_runtime::config::validate_origin;

/// Turns server-relative storage paths into absolute media URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaResolver {
    origin: String,
}

impl MediaResolver {
    /// Create a resolver for `origin` (e.g. `https://api.example.com`).
    ///
    /// Only `http`/`https` origins without query or fragment are accepted.
    /// A trailing `/` is dropped.
    pub fn new(origin: &str) -> Result<Self> {
        let origin = validate_origin(origin).map_err(|e| match e {
            core_runtime::Error::InvalidOrigin { origin, reason } => {
                PlaybackError::InvalidOrigin { origin, reason }
            }
            other => PlaybackError::InvalidOrigin {
                origin: origin.to_string(),
                reason: other.to_string(),
            },
        })?;

        Ok(Self { origin })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Resolve a storage path to the URL handed to the audio backend.
    ///
    /// Joins origin and path with exactly one `/`. Paths that are already
    /// absolute `http(s)` URLs pass through unchanged.
    pub fn resolve(&self, storage_path: &str) -> Result<String> {
        let path = storage_path.trim();
        if path.is_empty() {
            return Err(PlaybackError::Resolution(
                "track has no storage path".to_string(),
            ));
        }

        if path.starts_with("http://") || path.starts_with("https://") {
            return Ok(path.to_string());
        }

        Ok(format!("{}/{}", self.origin, path.trim_start_matches('/')))
    }
}
