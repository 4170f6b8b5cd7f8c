//! # Core Configuration
//!
//! [`CoreConfig`] bundles the API origin, the host bridges and a couple of
//! tunables. [`CoreConfigBuilder::build`] validates everything up front so a
//! misconfigured host fails at startup rather than on its first login.
//!
//! The API origin and the [`AudioBackend`] must always be supplied. With the
//! `desktop-shims` feature the HTTP client and the secure store fall back to
//! `bridge_desktop`; mobile hosts inject their own.
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::time::Duration;
//!
//! let config = CoreConfig::builder()
//!     .api_base_url("http://192.168.0.101:5000")
//!     .audio_backend(Arc::new(AvPlayerBackend::new()))
//!     .request_timeout(Duration::from_secs(15))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{AudioBackend, HttpClient, SecureStore};
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const REQUEST_TIMEOUT_RANGE: RangeInclusive<Duration> =
    Duration::from_secs(1)..=Duration::from_secs(300);

#[derive(Clone)]
pub struct CoreConfig {
    /// API origin without a trailing slash, e.g. `http://192.168.0.101:5000`.
    pub api_base_url: String,
    pub http_client: Arc<dyn HttpClient>,
    /// Holds the persisted bearer token.
    pub secure_store: Arc<dyn SecureStore>,
    pub audio_backend: Arc<dyn AudioBackend>,
    /// Deadline for each session provider request.
    pub request_timeout: Duration,
    /// Capacity of the event bus; slower subscribers lag beyond it.
    pub event_buffer_size: usize,
}

impl fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreConfig")
            .field("api_base_url", &self.api_base_url)
            .field("request_timeout", &self.request_timeout)
            .field("event_buffer_size", &self.event_buffer_size)
            .finish_non_exhaustive()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Re-check a config whose public fields may have been edited after
    /// `build`.
    pub fn validate(&self) -> Result<()> {
        validate_origin(&self.api_base_url)?;

        if !REQUEST_TIMEOUT_RANGE.contains(&self.request_timeout) {
            return Err(Error::Config(format!(
                "request timeout {:?} is outside {:?}..={:?}",
                self.request_timeout,
                REQUEST_TIMEOUT_RANGE.start(),
                REQUEST_TIMEOUT_RANGE.end()
            )));
        }
        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "event buffer size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Accepts an absolute `http`/`https` URL with a host and no query or
/// fragment. Returns it trimmed, without a trailing slash.
///
/// ```
/// use core_runtime::config::validate_origin;
///
/// assert_eq!(
///     validate_origin("http://10.0.2.2:5000/").unwrap(),
///     "http://10.0.2.2:5000"
/// );
/// assert!(validate_origin("10.0.2.2:5000").is_err());
/// ```
pub fn validate_origin(origin: &str) -> Result<String> {
    let reject = |reason: String| Error::InvalidOrigin {
        origin: origin.to_string(),
        reason,
    };

    let trimmed = origin.trim();
    let url = Url::parse(trimmed).map_err(|e| reject(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(reject(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.host_str().is_none() {
        return Err(reject("no host".to_string()));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(reject("query and fragment are not allowed".to_string()));
    }

    Ok(trimmed.trim_end_matches('/').to_string())
}

fn missing(capability: &str, hint: &str) -> Error {
    Error::CapabilityMissing {
        capability: capability.to_string(),
        message: hint.to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
mod defaults {
    use super::*;
    use bridge_desktop::{KeyringSecureStore, ReqwestHttpClient};

    pub(super) fn http_client(timeout: Duration) -> Result<Arc<dyn HttpClient>> {
        Ok(Arc::new(ReqwestHttpClient::with_timeout(timeout)?))
    }

    pub(super) fn secure_store() -> Result<Arc<dyn SecureStore>> {
        Ok(Arc::new(KeyringSecureStore::new()))
    }
}

#[cfg(not(feature = "desktop-shims"))]
mod defaults {
    use super::*;

    pub(super) fn http_client(_timeout: Duration) -> Result<Arc<dyn HttpClient>> {
        Err(missing(
            "HttpClient",
            "inject a client (URLSession, OkHttp) or enable the 'desktop-shims' feature",
        ))
    }

    pub(super) fn secure_store() -> Result<Arc<dyn SecureStore>> {
        Err(missing(
            "SecureStore",
            "inject Keychain/Keystore storage for the session token \
             or enable the 'desktop-shims' feature",
        ))
    }
}

#[derive(Default)]
pub struct CoreConfigBuilder {
    api_base_url: Option<String>,
    http_client: Option<Arc<dyn HttpClient>>,
    secure_store: Option<Arc<dyn SecureStore>>,
    audio_backend: Option<Arc<dyn AudioBackend>>,
    request_timeout: Option<Duration>,
    event_buffer_size: Option<usize>,
}

impl CoreConfigBuilder {
    /// Required. Media paths are resolved against this origin too.
    pub fn api_base_url(mut self, origin: impl Into<String>) -> Self {
        self.api_base_url = Some(origin.into());
        self
    }

    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn secure_store(mut self, store: Arc<dyn SecureStore>) -> Self {
        self.secure_store = Some(store);
        self
    }

    /// Required.
    pub fn audio_backend(mut self, backend: Arc<dyn AudioBackend>) -> Self {
        self.audio_backend = Some(backend);
        self
    }

    /// Defaults to [`DEFAULT_REQUEST_TIMEOUT`].
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Defaults to [`DEFAULT_EVENT_BUFFER_SIZE`].
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    pub fn build(self) -> Result<CoreConfig> {
        let origin = self.api_base_url.ok_or_else(|| {
            Error::Config("api_base_url is required, e.g. http://192.168.0.101:5000".to_string())
        })?;
        let audio_backend = self.audio_backend.ok_or_else(|| {
            missing(
                "AudioBackend",
                "inject the host player adapter (AVPlayer, ExoPlayer, or a scripted backend in tests)",
            )
        })?;
        let request_timeout = self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT);

        let http_client = match self.http_client {
            Some(client) => client,
            None => defaults::http_client(request_timeout)?,
        };
        let secure_store = match self.secure_store {
            Some(store) => store,
            None => defaults::secure_store()?,
        };

        let config = CoreConfig {
            api_base_url: validate_origin(&origin)?,
            http_client,
            secure_store,
            audio_backend,
            request_timeout,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
        };
        config.validate()?;
        Ok(config)
    }
}
