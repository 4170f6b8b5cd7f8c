//! # Session Manager
//!
//! Owns the bearer credential lifecycle against the music API:
//!
//! - `restore()` validates a persisted credential at startup
//! - `login()` / `register()` / `logout()`
//! - `authorize()` attaches `Authorization: Bearer <token>` to outbound
//!   requests, including media loads through [`CredentialProvider`]
//!
//! State changes are published on the [`EventBus`] as [`AuthEvent`]s.
//!
//! ## Usage
//!
//! ```ignore
//! use core_auth::SessionManager;
//! use core_runtime::events::EventBus;
//!
//! let manager = SessionManager::new(http_client, secure_store, EventBus::new(100), "http://192.168.0.101:5000");
//!
//! if manager.restore().await?.is_none() {
//!     let user = manager.login("ana@example.com", "secret").await?;
//!     println!("Welcome {}", user.username);
//! }
//! ```

use crate::credential_store::CredentialStore;
use crate::error::{AuthError, Result};
use crate::types::{AuthState, Credential, ErrorBody, LoginRequest, LoginResponse, RegisterRequest, User};
use async_trait::async_trait;
use bridge_traits::{
    http::{HttpClient, HttpRequest, HttpResponse},
    SecureStore,
};
use core_runtime::config::DEFAULT_REQUEST_TIMEOUT;
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

const LOGIN_PATH: &str = "/api/login";
const REGISTER_PATH: &str = "/api/register";
const PROFILE_PATH: &str = "/api/profile";

/// Source of the credential attached to authorized requests.
///
/// The playback engine depends on this trait rather than on
/// [`SessionManager`] so hosts and tests can supply credentials directly.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// The current credential, or `None` for anonymous requests.
    async fn credential(&self) -> Option<Credential>;
}

#[derive(Debug, Clone)]
struct SessionState {
    state: AuthState,
    user: Option<User>,
    network_error: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            state: AuthState::Restoring,
            user: None,
            network_error: false,
        }
    }
}

/// Session provider for the music API.
pub struct SessionManager {
    http_client: Arc<dyn HttpClient>,
    credentials: CredentialStore,
    event_bus: EventBus,
    api_base_url: String,
    request_timeout: Duration,
    session: RwLock<SessionState>,
}

impl SessionManager {
    /// Creates a session manager talking to `api_base_url`.
    ///
    /// `api_base_url` is expected to be validated already (see
    /// `core_runtime::config::validate_origin`); a trailing slash is dropped.
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        secure_store: Arc<dyn SecureStore>,
        event_bus: EventBus,
        api_base_url: impl Into<String>,
    ) -> Self {
        let api_base_url = api_base_url.into().trim_end_matches('/').to_string();
        Self {
            http_client,
            credentials: CredentialStore::new(secure_store),
            event_bus,
            api_base_url,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            session: RwLock::new(SessionState::default()),
        }
    }

    /// Overrides the per-request timeout (default 30 seconds).
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Validates a persisted credential at startup.
    ///
    /// Without a credential the session becomes `SignedOut` and no request is
    /// made. With one, `GET /api/profile` decides: success restores the user;
    /// any failure deletes the credential, and a transport failure also sets
    /// the network error flag. Only secure storage failures are returned as
    /// errors.
    #[instrument(skip(self))]
    pub async fn restore(&self) -> Result<Option<User>> {
        let credential = match self.credentials.load().await {
            Ok(credential) => credential,
            Err(e) => {
                self.set_signed_out(false).await;
                self.emit_error(&e);
                return Err(e);
            }
        };

        let Some(credential) = credential else {
            debug!("No persisted credential, starting signed out");
            self.set_signed_out(false).await;
            return Ok(None);
        };

        match self.fetch_profile(&credential).await {
            Ok(user) => {
                info!(user_id = %user.id, "Session restored");
                {
                    let mut session = self.session.write().await;
                    session.state = AuthState::SignedIn;
                    session.user = Some(user.clone());
                    session.network_error = false;
                }
                self.emit(AuthEvent::SessionRestored {
                    user_id: user.id.to_string(),
                });
                Ok(Some(user))
            }
            Err(e) => {
                warn!(error = %e, "Persisted credential rejected, discarding it");
                if let Err(clear_err) = self.credentials.clear().await {
                    error!(error = %clear_err, "Failed to discard persisted credential");
                }
                self.set_signed_out(e.is_network()).await;
                self.emit_error(&e);
                Ok(None)
            }
        }
    }

    /// Signs in with e-mail and password.
    ///
    /// On success the returned token is persisted, the user becomes current
    /// and `SignedIn` is emitted.
    #[instrument(skip(self, email, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let request = HttpRequest::post(self.endpoint(LOGIN_PATH))
            .json(&body)
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

        let response = self.send_checked(request, "Login failed").await?;
        let LoginResponse { token, user } = response
            .json()
            .map_err(|e| self.fail(AuthError::InvalidResponse(e.to_string())))?;

        let credential = Credential::new(token);
        self.credentials
            .store(&credential)
            .await
            .map_err(|e| self.fail(e))?;

        {
            let mut session = self.session.write().await;
            session.state = AuthState::SignedIn;
            session.user = Some(user.clone());
            session.network_error = false;
        }

        info!(user_id = %user.id, "User signed in");
        self.emit(AuthEvent::SignedIn {
            user_id: user.id.to_string(),
            username: user.username.clone(),
        });
        Ok(user)
    }

    /// Creates an account. Does not sign in; callers log in afterwards.
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn register(&self, request: RegisterRequest) -> Result<()> {
        let http_request = HttpRequest::post(self.endpoint(REGISTER_PATH))
            .json(&request)
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

        self.send_checked(http_request, "Registration failed").await?;
        self.session.write().await.network_error = false;

        info!("Account registered");
        Ok(())
    }

    /// Deletes the credential and clears the current user.
    ///
    /// In-memory state is cleared even when the secure store fails; the
    /// storage error is still returned.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<()> {
        let cleared = self.credentials.clear().await;
        self.set_signed_out(false).await;
        self.emit(AuthEvent::SignedOut);
        info!("User signed out");
        cleared
    }

    /// The signed-in user, if any.
    pub async fn current_user(&self) -> Option<User> {
        self.session.read().await.user.clone()
    }

    pub async fn state(&self) -> AuthState {
        self.session.read().await.state
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session.read().await.state.is_signed_in()
    }

    /// Whether the last restore, login or registration failed without
    /// reaching the server.
    pub async fn has_network_error(&self) -> bool {
        self.session.read().await.network_error
    }

    /// Request interceptor: attaches the bearer credential when one is
    /// persisted, otherwise returns the request unchanged.
    pub async fn authorize(&self, request: HttpRequest) -> HttpRequest {
        match self.credential().await {
            Some(credential) => request.bearer_token(credential.expose()),
            None => request,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url, path)
    }

    async fn fetch_profile(&self, credential: &Credential) -> Result<User> {
        let request = HttpRequest::get(self.endpoint(PROFILE_PATH)).bearer_token(credential.expose());
        let response = self.send_checked(request, "Could not load profile").await?;
        response
            .json()
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))
    }

    /// Executes `request` and maps transport failures and non-2xx statuses.
    async fn send_checked(&self, request: HttpRequest, fallback: &str) -> Result<HttpResponse> {
        debug!(url = %request.url, "Sending request");
        let request = request.timeout(self.request_timeout);

        let response = match self.http_client.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Request failed before reaching the server");
                self.session.write().await.network_error = true;
                return Err(self.fail(AuthError::Network(e.to_string())));
            }
        };

        if response.is_success() {
            return Ok(response);
        }

        let message = response
            .json::<ErrorBody>()
            .ok()
            .and_then(|body| body.error)
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| fallback.to_string());

        warn!(status = response.status, "Request rejected by server");
        Err(self.fail(AuthError::Rejected {
            status: response.status,
            message,
        }))
    }

    async fn set_signed_out(&self, network_error: bool) {
        let mut session = self.session.write().await;
        session.state = AuthState::SignedOut;
        session.user = None;
        session.network_error = network_error;
    }

    /// Publishes `AuthError` for `error` and hands it back.
    fn fail(&self, error: AuthError) -> AuthError {
        self.emit_error(&error);
        error
    }

    fn emit_error(&self, error: &AuthError) {
        self.emit(AuthEvent::AuthError {
            message: error.user_message().to_string(),
            recoverable: !matches!(error, AuthError::SecureStorageUnavailable(_)),
        });
    }

    fn emit(&self, event: AuthEvent) {
        let _ = self.event_bus.emit(CoreEvent::Auth(event));
    }
}

#[async_trait]
impl CredentialProvider for SessionManager {
    async fn credential(&self) -> Option<Credential> {
        match self.credentials.load().await {
            Ok(credential) => credential,
            Err(e) => {
                warn!(error = %e, "Credential unavailable, sending request anonymously");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential_store::CREDENTIAL_KEY;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::http::{HttpMethod, AUTHORIZATION_HEADER};
    use mockall::mock;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    const ORIGIN: &str = "http://192.168.0.101:5000";

    mock! {
        pub Http {}

        #[async_trait]
        impl HttpClient for Http {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        entries: Mutex<HashMap<String, Vec<u8>>>,
    }

    impl MemoryStore {
        fn with_token(token: &str) -> Self {
            let mut entries = HashMap::new();
            entries.insert(CREDENTIAL_KEY.to_string(), token.as_bytes().to_vec());
            Self {
                entries: Mutex::new(entries),
            }
        }

        async fn token(&self) -> Option<String> {
            self.entries
                .lock()
                .await
                .get(CREDENTIAL_KEY)
                .map(|bytes| String::from_utf8(bytes.clone()).unwrap())
        }
    }

    #[async_trait]
    impl SecureStore for MemoryStore {
        async fn set_secret(&self, key: &str, value: &[u8]) -> BridgeResult<()> {
            self.entries.lock().await.insert(key.to_string(), value.to_vec());
            Ok(())
        }

        async fn get_secret(&self, key: &str) -> BridgeResult<Option<Vec<u8>>> {
            Ok(self.entries.lock().await.get(key).cloned())
        }

        async fn delete_secret(&self, key: &str) -> BridgeResult<()> {
            self.entries.lock().await.remove(key);
            Ok(())
        }
    }

    fn json_response(status: u16, body: serde_json::Value) -> HttpResponse {
        HttpResponse::new(status, serde_json::to_vec(&body).unwrap())
    }

    fn user_json() -> serde_json::Value {
        serde_json::json!({ "id": 7, "username": "ana", "email": "ana@example.com" })
    }

    fn manager(http: MockHttp, store: Arc<MemoryStore>, bus: &EventBus) -> SessionManager {
        SessionManager::new(Arc::new(http), store, bus.clone(), ORIGIN)
    }

    #[tokio::test]
    async fn test_login_persists_token_and_emits_signed_in() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .withf(|req| {
                req.method == HttpMethod::Post
                    && req.url == "http://192.168.0.101:5000/api/login"
                    && req.timeout == Some(DEFAULT_REQUEST_TIMEOUT)
            })
            .times(1)
            .returning(|_| {
                Ok(json_response(
                    200,
                    serde_json::json!({ "token": "tok-1", "user": user_json() }),
                ))
            });

        let store = Arc::new(MemoryStore::default());
        let bus = EventBus::new(16);
        let mut events = bus.subscribe();
        let manager = manager(http, store.clone(), &bus);

        let user = manager.login("ana@example.com", "pw").await.unwrap();

        assert_eq!(user.username, "ana");
        assert_eq!(store.token().await.as_deref(), Some("tok-1"));
        assert_eq!(manager.state().await, AuthState::SignedIn);
        assert_eq!(manager.current_user().await, Some(user));
        assert!(!manager.has_network_error().await);
        assert_eq!(
            events.recv().await.unwrap(),
            CoreEvent::Auth(AuthEvent::SignedIn {
                user_id: "7".to_string(),
                username: "ana".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_login_rejected_carries_server_message() {
        let mut http = MockHttp::new();
        http.expect_execute().returning(|_| {
            Ok(json_response(
                401,
                serde_json::json!({ "error": "Invalid credentials" }),
            ))
        });

        let store = Arc::new(MemoryStore::default());
        let bus = EventBus::new(16);
        let manager = manager(http, store.clone(), &bus);

        let err = manager.login("ana@example.com", "wrong").await.unwrap_err();

        assert_eq!(
            err,
            AuthError::Rejected {
                status: 401,
                message: "Invalid credentials".to_string(),
            }
        );
        assert_eq!(store.token().await, None);
        assert!(!manager.is_authenticated().await);
        assert!(!manager.has_network_error().await);
    }

    #[tokio::test]
    async fn test_login_without_error_body_uses_fallback_message() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .returning(|_| Ok(HttpResponse::new(500, "oops")));

        let bus = EventBus::new(16);
        let manager = manager(http, Arc::new(MemoryStore::default()), &bus);

        let err = manager.login("a@b.c", "pw").await.unwrap_err();
        assert_eq!(err.user_message(), "Login failed");
    }

    #[tokio::test]
    async fn test_login_network_failure_sets_flag() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .returning(|_| Err(BridgeError::OperationFailed("connection refused".to_string())));

        let bus = EventBus::new(16);
        let mut events = bus.subscribe();
        let manager = manager(http, Arc::new(MemoryStore::default()), &bus);

        let err = manager.login("a@b.c", "pw").await.unwrap_err();

        assert!(err.is_network());
        assert!(manager.has_network_error().await);
        assert!(matches!(
            events.recv().await.unwrap(),
            CoreEvent::Auth(AuthEvent::AuthError { recoverable: true, .. })
        ));
    }

    #[tokio::test]
    async fn test_restore_without_token_skips_network() {
        let mut http = MockHttp::new();
        http.expect_execute().times(0);

        let bus = EventBus::new(16);
        let manager = manager(http, Arc::new(MemoryStore::default()), &bus);

        assert_eq!(manager.state().await, AuthState::Restoring);
        assert_eq!(manager.restore().await.unwrap(), None);
        assert_eq!(manager.state().await, AuthState::SignedOut);
    }

    #[tokio::test]
    async fn test_restore_fetches_profile_with_bearer() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .withf(|req| {
                req.method == HttpMethod::Get
                    && req.url.ends_with("/api/profile")
                    && req.headers.get(AUTHORIZATION_HEADER) == Some(&"Bearer tok-9".to_string())
            })
            .times(1)
            .returning(|_| Ok(json_response(200, user_json())));

        let store = Arc::new(MemoryStore::with_token("tok-9"));
        let bus = EventBus::new(16);
        let mut events = bus.subscribe();
        let manager = manager(http, store.clone(), &bus);

        let user = manager.restore().await.unwrap().unwrap();

        assert_eq!(user.id.as_str(), "7");
        assert!(manager.is_authenticated().await);
        assert_eq!(store.token().await.as_deref(), Some("tok-9"));
        assert_eq!(
            events.recv().await.unwrap(),
            CoreEvent::Auth(AuthEvent::SessionRestored {
                user_id: "7".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_restore_rejected_token_is_purged() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .returning(|_| Ok(json_response(401, serde_json::json!({ "error": "expired" }))));

        let store = Arc::new(MemoryStore::with_token("stale"));
        let bus = EventBus::new(16);
        let manager = manager(http, store.clone(), &bus);

        assert_eq!(manager.restore().await.unwrap(), None);
        assert_eq!(store.token().await, None);
        assert_eq!(manager.state().await, AuthState::SignedOut);
        assert!(!manager.has_network_error().await);
    }

    #[tokio::test]
    async fn test_restore_network_failure_purges_and_flags() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .returning(|_| Err(BridgeError::OperationFailed("timed out".to_string())));

        let store = Arc::new(MemoryStore::with_token("tok"));
        let bus = EventBus::new(16);
        let manager = manager(http, store.clone(), &bus);

        assert_eq!(manager.restore().await.unwrap(), None);
        assert_eq!(store.token().await, None);
        assert!(manager.has_network_error().await);
    }

    #[tokio::test]
    async fn test_register_sends_role_and_stays_signed_out() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .withf(|req| {
                let body: serde_json::Value =
                    serde_json::from_slice(req.body.as_deref().unwrap_or_default()).unwrap();
                req.url.ends_with("/api/register")
                    && body["username"] == "ana"
                    && body["role"] == "artist"
            })
            .times(1)
            .returning(|_| Ok(json_response(201, serde_json::json!({ "message": "ok" }))));

        let store = Arc::new(MemoryStore::default());
        let bus = EventBus::new(16);
        let manager = manager(http, store.clone(), &bus);

        manager
            .register(RegisterRequest::new("ana", "ana@example.com", "pw").with_role("artist"))
            .await
            .unwrap();

        assert_eq!(store.token().await, None);
        assert_eq!(manager.current_user().await, None);
    }

    #[tokio::test]
    async fn test_register_rejected() {
        let mut http = MockHttp::new();
        http.expect_execute().returning(|_| {
            Ok(json_response(
                409,
                serde_json::json!({ "error": "Email already registered" }),
            ))
        });

        let bus = EventBus::new(16);
        let manager = manager(http, Arc::new(MemoryStore::default()), &bus);

        let err = manager
            .register(RegisterRequest::new("ana", "ana@example.com", "pw"))
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Email already registered");
    }

    #[tokio::test]
    async fn test_logout_clears_everything() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .returning(|_| Ok(json_response(200, user_json())));

        let store = Arc::new(MemoryStore::with_token("tok"));
        let bus = EventBus::new(16);
        let manager = manager(http, store.clone(), &bus);
        manager.restore().await.unwrap();

        let mut events = bus.subscribe();
        manager.logout().await.unwrap();

        assert_eq!(store.token().await, None);
        assert_eq!(manager.current_user().await, None);
        assert_eq!(manager.state().await, AuthState::SignedOut);
        assert_eq!(
            events.recv().await.unwrap(),
            CoreEvent::Auth(AuthEvent::SignedOut)
        );
    }

    #[tokio::test]
    async fn test_authorize_attaches_bearer_only_with_credential() {
        let http = MockHttp::new();
        let store = Arc::new(MemoryStore::default());
        let bus = EventBus::new(16);
        let manager = manager(http, store.clone(), &bus);

        let anonymous = manager.authorize(HttpRequest::get("https://cdn/a.mp3")).await;
        assert!(!anonymous.headers.contains_key(AUTHORIZATION_HEADER));

        store.set_secret(CREDENTIAL_KEY, b"tok-3").await.unwrap();
        let authorized = manager.authorize(HttpRequest::get("https://cdn/a.mp3")).await;
        assert_eq!(
            authorized.headers.get(AUTHORIZATION_HEADER),
            Some(&"Bearer tok-3".to_string())
        );
        assert_eq!(manager.credential().await, Some(Credential::new("tok-3")));
    }
}
