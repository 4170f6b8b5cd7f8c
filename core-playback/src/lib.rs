//! # Playback Module
//!
//! Single-resource playback engine for the music client.
//!
//! ## Overview
//!
//! This module handles:
//! - Resolving server storage paths into media URLs
//! - Loading tracks through the host `AudioBackend` with optional bearer auth
//! - Transport controls (pause/resume, seek) with stale-session protection
//! - Queue navigation with wrap-around and auto-advance at end of track
//! - An observable `PlayerSnapshot` via `tokio::sync::watch`

pub mod engine;
pub mod error;
pub mod queue;
pub mod resolver;
pub mod state;
pub mod types;

pub use engine::PlaybackEngine;
pub use error::{PlaybackError, Result, TransportError};
pub use queue::Queue;
pub use resolver::MediaResolver;
pub use state::{PlaybackPhase, PlayerSnapshot, SessionId};
pub use types::{format_timestamp, ArtistRef, Track, TrackId, UNKNOWN_ARTIST};
