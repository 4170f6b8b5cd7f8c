use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bridge_traits::{
    error::{BridgeError, Result},
    storage::SecureStore,
};
use keyring::Entry;
use tracing::{debug, warn};

const DEFAULT_SERVICE: &str = "musicapp-core";

/// [`SecureStore`] backed by the OS credential vault through `keyring`
/// (Keychain, Credential Manager, Secret Service).
///
/// Each key becomes one vault entry under the store's service name. Values are
/// base64 encoded because the vaults only hold strings.
#[derive(Debug, Clone)]
pub struct KeyringSecureStore {
    service: String,
}

impl KeyringSecureStore {
    pub fn new() -> Self {
        Self::with_service_name(DEFAULT_SERVICE)
    }

    /// Use a separate vault namespace, e.g. per build flavor.
    pub fn with_service_name(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry> {
        Entry::new(&self.service, key).map_err(vault_error)
    }
}

impl Default for KeyringSecureStore {
    fn default() -> Self {
        Self::new()
    }
}

fn vault_error(e: keyring::Error) -> BridgeError {
    BridgeError::OperationFailed(format!("credential vault: {e}"))
}

#[async_trait]
impl SecureStore for KeyringSecureStore {
    async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()> {
        self.entry(key)?
            .set_password(&STANDARD.encode(value))
            .map_err(vault_error)?;
        debug!(key, "Secret written");
        Ok(())
    }

    async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let encoded = match self.entry(key)?.get_password() {
            Ok(encoded) => encoded,
            Err(keyring::Error::NoEntry) => return Ok(None),
            Err(e) => return Err(vault_error(e)),
        };

        STANDARD.decode(encoded).map(Some).map_err(|e| {
            warn!(key, error = %e, "Stored secret is not valid base64");
            BridgeError::OperationFailed(format!("corrupt secret for {key}: {e}"))
        })
    }

    async fn delete_secret(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => {
                debug!(key, "Secret removed");
                Ok(())
            }
            Err(e) => Err(vault_error(e)),
        }
    }
}
