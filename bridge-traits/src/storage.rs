use async_trait::async_trait;

use crate::error::Result;

/// Byte-oriented secret storage provided by the host (Keychain, Keystore,
/// Credential Manager, Secret Service).
///
/// The session provider keeps the bearer token here under a single key.
/// Values must survive process restarts and must never be logged.
#[async_trait]
pub trait SecureStore: Send + Sync {
    /// Write `value` under `key`, replacing what was there.
    async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()>;

    /// `Ok(None)` when nothing is stored under `key`.
    async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Removing a missing key is not an error.
    async fn delete_secret(&self, key: &str) -> Result<()>;

    async fn has_secret(&self, key: &str) -> Result<bool> {
        Ok(self.get_secret(key).await?.is_some())
    }
}
