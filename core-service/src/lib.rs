//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (HTTP, secure
//! storage, audio backend) into one explicitly owned [`CoreService`]. Hosts
//! build a [`CoreConfig`], call [`CoreService::bootstrap`] once at startup and
//! hand clones of the service to whichever screens need it. Desktop apps
//! typically enable the `desktop-shims` feature, which supplies default HTTP
//! and secure storage bridges.
//!
//! ```ignore
//! use core_service::{CoreConfig, CoreService};
//!
//! let config = CoreConfig::builder()
//!     .api_base_url("http://192.168.0.101:5000")
//!     .audio_backend(backend)
//!     .build()?;
//! let core = CoreService::bootstrap(config).await?;
//!
//! let songs: Vec<Track> = fetch_songs(&core).await?;
//! core.playback().play_song(songs[0].clone(), songs.clone()).await?;
//! ```

pub mod error;

pub use error::{CoreError, Result};

pub use core_auth::{AuthState, RegisterRequest, SessionManager, User};
pub use core_playback::{MediaResolver, PlaybackEngine, PlayerSnapshot, Track};
pub use core_runtime::config::CoreConfig;
pub use core_runtime::events::{CoreEvent, EventBus, EventStream};

use core_auth::CredentialProvider;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Primary façade exposed to host applications.
///
/// Owns the session provider and the playback engine; clones share both.
#[derive(Clone)]
pub struct CoreService {
    config: CoreConfig,
    event_bus: EventBus,
    session: Arc<SessionManager>,
    playback: PlaybackEngine,
}

impl CoreService {
    /// Create the service without touching the network or secure storage.
    ///
    /// The session stays in [`AuthState::Restoring`] until
    /// [`SessionManager::restore`] runs; [`CoreService::bootstrap`] does both.
    pub fn new(config: CoreConfig) -> Result<Self> {
        config.validate()?;

        let event_bus = EventBus::new(config.event_buffer_size);
        let session = Arc::new(
            SessionManager::new(
                Arc::clone(&config.http_client),
                Arc::clone(&config.secure_store),
                event_bus.clone(),
                config.api_base_url.clone(),
            )
            .with_request_timeout(config.request_timeout),
        );

        let resolver = MediaResolver::new(&config.api_base_url)?;
        let credentials: Arc<dyn CredentialProvider> = session.clone();
        let playback = PlaybackEngine::new(
            Arc::clone(&config.audio_backend),
            resolver,
            event_bus.clone(),
            Some(credentials),
        );

        Ok(Self {
            config,
            event_bus,
            session,
            playback,
        })
    }

    /// Create the service and restore any persisted session.
    ///
    /// A credential the server no longer accepts is discarded and the
    /// service starts signed out; only secure storage failures are errors.
    #[instrument(skip(config), fields(api = %config.api_base_url))]
    pub async fn bootstrap(config: CoreConfig) -> Result<Self> {
        let service = Self::new(config)?;

        match service.session.restore().await? {
            Some(user) => info!(user_id = %user.id, "Session restored"),
            None if service.session.has_network_error().await => {
                warn!("Started signed out: API unreachable during restore")
            }
            None => info!("Started signed out"),
        }

        Ok(service)
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Session provider (login, register, logout, current user).
    pub fn session(&self) -> Arc<SessionManager> {
        Arc::clone(&self.session)
    }

    /// Playback engine handle.
    pub fn playback(&self) -> PlaybackEngine {
        self.playback.clone()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Subscribe to auth and playback events.
    pub fn events(&self) -> EventStream {
        EventStream::new(self.event_bus.subscribe())
    }

    /// Sign out and stop playback of anything loaded with the old credential.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> Result<()> {
        self.playback.stop().await?;
        self.session.logout().await?;
        Ok(())
    }

    /// Release the audio resource before the host tears down.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> Result<()> {
        self.playback.stop().await?;
        info!("Core service shut down");
        Ok(())
    }
}
