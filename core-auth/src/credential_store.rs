//! Secure Credential Storage
//!
//! Persists the bearer credential through the host `SecureStore`
//! (Keychain, Keystore, OS keyring).
//!
//! - The credential is stored as UTF-8 bytes under a single key
//! - Credential values are never logged or included in error messages
//! - An unreadable (non UTF-8) entry is treated as absent and purged

use crate::error::{AuthError, Result};
use crate::types::Credential;
use bridge_traits::storage::SecureStore;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Key the credential is stored under.
pub const CREDENTIAL_KEY: &str = "token";

/// Secure storage for the bearer credential.
#[derive(Clone)]
pub struct CredentialStore {
    secure_store: Arc<dyn SecureStore>,
}

impl CredentialStore {
    pub fn new(secure_store: Arc<dyn SecureStore>) -> Self {
        Self { secure_store }
    }

    /// Store the credential, overwriting any previous one.
    pub async fn store(&self, credential: &Credential) -> Result<()> {
        self.secure_store
            .set_secret(CREDENTIAL_KEY, credential.expose().as_bytes())
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to store credential in secure storage");
                AuthError::SecureStorageUnavailable(e.to_string())
            })?;

        info!("Credential stored securely");
        Ok(())
    }

    /// Load the persisted credential, if any.
    ///
    /// Returns:
    /// - `Ok(Some(credential))` if a readable credential exists
    /// - `Ok(None)` if nothing is stored (corrupted entries are deleted)
    /// - `Err` if the secure store is unavailable
    pub async fn load(&self) -> Result<Option<Credential>> {
        let bytes = self
            .secure_store
            .get_secret(CREDENTIAL_KEY)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to read credential from secure storage");
                AuthError::SecureStorageUnavailable(e.to_string())
            })?;

        let Some(bytes) = bytes else {
            debug!("No credential stored");
            return Ok(None);
        };

        match String::from_utf8(bytes) {
            Ok(token) if !token.trim().is_empty() => Ok(Some(Credential::new(token))),
            _ => {
                warn!("Stored credential is unreadable, deleting it");
                self.clear().await?;
                Ok(None)
            }
        }
    }

    /// Delete the persisted credential. Deleting a missing entry succeeds.
    pub async fn clear(&self) -> Result<()> {
        self.secure_store
            .delete_secret(CREDENTIAL_KEY)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to delete credential from secure storage");
                AuthError::SecureStorageUnavailable(e.to_string())
            })?;

        info!("Credential deleted");
        Ok(())
    }

    /// Whether a credential is currently persisted.
    pub async fn exists(&self) -> Result<bool> {
        self.secure_store
            .has_secret(CREDENTIAL_KEY)
            .await
            .map_err(|e| AuthError::SecureStorageUnavailable(e.to_string()))
    }
}
