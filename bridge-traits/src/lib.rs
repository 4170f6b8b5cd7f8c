//! # Host Bridge Traits
//!
//! The capabilities the core needs from the host application, expressed as
//! object-safe async traits. The core holds each one as `Arc<dyn Trait>`:
//!
//! | Trait | Used by | Desktop default |
//! |-------|---------|-----------------|
//! | [`HttpClient`] | session provider (`/api/login`, `/api/register`, `/api/profile`) | `bridge_desktop::ReqwestHttpClient` |
//! | [`SecureStore`] | persisted bearer token | `bridge_desktop::KeyringSecureStore` |
//! | [`AudioBackend`] / [`AudioResource`] | playback engine | none, always host supplied |
//! | [`LoggerSink`] | `core_runtime::logging` | [`ConsoleLogger`] |
//!
//! Every trait reports failures as [`BridgeError`]. Implementations are
//! shared across tasks and must be `Send + Sync`.
//!
//! ```ignore
//! use async_trait::async_trait;
//! use bridge_traits::{error::Result, HttpClient, HttpRequest, HttpResponse};
//!
//! struct NativeHttp(PlatformSession);
//!
//! #[async_trait]
//! impl HttpClient for NativeHttp {
//!     async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
//!         self.0.send(request).await
//!     }
//! }
//! ```

pub mod error;
pub mod http;
pub mod logger;
pub mod platform;
pub mod playback;
pub mod storage;

pub use error::BridgeError;

pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use logger::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use playback::{AudioBackend, AudioResource, LoadRequest, PlaybackStatus, StatusStream};
pub use storage::SecureStore;
