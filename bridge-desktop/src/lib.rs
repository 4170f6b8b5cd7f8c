//! # Desktop Bridges
//!
//! Default [`HttpClient`](bridge_traits::HttpClient) and
//! [`SecureStore`](bridge_traits::SecureStore) for macOS, Windows and Linux.
//! `core-runtime` picks them up when its `desktop-shims` feature is on.
//!
//! There is no desktop audio backend: the host supplies the adapter for
//! whichever player it embeds.
//!
//! The `secure-store` feature (default) pulls in `keyring`.

mod http;

#[cfg(feature = "secure-store")]
mod secure_store;

pub use http::ReqwestHttpClient;

#[cfg(feature = "secure-store")]
pub use secure_store::KeyringSecureStore;
