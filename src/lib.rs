//! Workspace umbrella crate.
//!
//! Re-exports the [`core_service`] façade so host applications can depend on
//! `musicapp-core` and toggle the documented features (e.g. `desktop-shims`)
//! without wiring each workspace crate individually.

pub use core_service::*;
