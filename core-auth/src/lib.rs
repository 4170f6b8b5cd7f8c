//! # Authentication Module
//!
//! Session provider for the music API: owns the bearer credential, the
//! current user and the request interceptor that authorizes outbound calls.
//!
//! ## Features
//!
//! - E-mail/password login and account registration
//! - Startup restore of a persisted credential via `/api/profile`
//! - Secure credential persistence via the host `SecureStore`
//! - `Authorization: Bearer` interceptor for API and media requests
//! - Auth state event emission

pub mod credential_store;
pub mod error;
pub mod manager;
pub mod types;

pub use credential_store::{CredentialStore, CREDENTIAL_KEY};
pub use error::{AuthError, Result};
pub use manager::{CredentialProvider, SessionManager};
pub use types::{AuthState, Credential, RegisterRequest, User, UserId};
