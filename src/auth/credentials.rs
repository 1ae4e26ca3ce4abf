use crate::error::ClientError;
use crate::store::KeyValueStore;
use std::sync::Arc;
use tracing::{info, warn};

pub const TOKEN_KEY: &str = "issac_token";
pub const USER_KEY: &str = "issac_user";

/// Durable slot holding the bearer token and the username it belongs to
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Underlying store, shared with the per-user session caches
    pub fn store(&self) -> Arc<dyn KeyValueStore> {
        Arc::clone(&self.store)
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    pub fn token(&self) -> Option<String> {
        self.read(TOKEN_KEY)
    }

    pub fn username(&self) -> Option<String> {
        self.read(USER_KEY)
    }

    /// Store the token and username after a successful login
    pub fn save(&self, token: &str, username: &str) -> Result<(), ClientError> {
        self.store
            .set(TOKEN_KEY, token)
            .and_then(|_| self.store.set(USER_KEY, username))
            .map_err(|e| ClientError::Storage(format!("{:#}", e)))?;

        info!("Stored credentials for {}", username);
        Ok(())
    }

    /// Drop both the token and the username
    pub fn clear(&self) -> Result<(), ClientError> {
        self.store
            .remove(TOKEN_KEY)
            .and_then(|_| self.store.remove(USER_KEY))
            .map_err(|e| ClientError::Storage(format!("{:#}", e)))?;

        info!("Cleared stored credentials");
        Ok(())
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                warn!("Failed to read {}: {:#}", key, e);
                None
            }
        }
    }
}
