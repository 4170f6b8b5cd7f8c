//! # Core Runtime
//!
//! Shared plumbing for the session provider and the playback engine:
//!
//! - [`config`]: `CoreConfig` and origin validation
//! - [`events`]: the broadcast `EventBus` carrying auth and playback events
//! - [`logging`]: `tracing` subscriber setup, redaction and host log forwarding

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
