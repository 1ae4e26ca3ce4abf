use super::model::Session;
use crate::error::ClientError;
use crate::store::KeyValueStore;
use std::sync::Arc;
use tracing::{info, warn};

/// Durable, per-user, most-recent-first list of sessions
///
/// At most one session is pending (`id == None`) at a time and it is always
/// the head of the list. Every mutation persists the whole list before it
/// returns.
#[derive(Clone)]
pub struct SessionCache {
    store: Arc<dyn KeyValueStore>,
    username: String,
}

impl SessionCache {
    /// Bind a cache to one authenticated identity
    pub fn for_user(store: Arc<dyn KeyValueStore>, username: impl Into<String>) -> Self {
        Self {
            store,
            username: username.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Storage key for a user's session list
    pub fn key_for(username: &str) -> String {
        format!("issac_sessions_{}", username)
    }

    /// Current session list; missing or malformed records read as empty
    pub fn load(&self) -> Vec<Session> {
        let key = Self::key_for(&self.username);

        let raw = match self.store.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("Failed to read session cache {}: {:#}", key, e);
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<Session>>(&raw) {
            Ok(sessions) => sessions,
            Err(e) => {
                warn!("Discarding malformed session cache {}: {}", key, e);
                Vec::new()
            }
        }
    }

    /// Prepend a pending session named `name`
    ///
    /// A previous pending session never completed a turn, so the server holds
    /// nothing for it; it is replaced rather than left as a second pending entry.
    pub fn create_pending(&self, name: &str) -> Result<(), ClientError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ClientError::Validation(
                "session name cannot be empty".to_string(),
            ));
        }

        let mut sessions = self.load();
        let before = sessions.len();
        sessions.retain(|s| !s.is_pending());
        if sessions.len() != before {
            info!("Replacing unused pending session for {}", self.username);
        }

        sessions.insert(0, Session::pending(name));
        self.save(&sessions)?;

        info!("Created pending session \"{}\" for {}", name, self.username);
        Ok(())
    }

    /// Patch the pending head session with `server_id`
    ///
    /// Returns `true` when the cache changed. Reconciling with no pending head
    /// (including a second call with the same id) leaves the cache untouched.
    pub fn reconcile(&self, server_id: &str) -> Result<bool, ClientError> {
        let mut sessions = self.load();

        match sessions.first_mut() {
            Some(head) if head.is_pending() => {
                head.id = Some(server_id.to_string());
            }
            _ => return Ok(false),
        }

        self.save(&sessions)?;
        info!("Reconciled pending session with server id {}", server_id);
        Ok(true)
    }

    fn save(&self, sessions: &[Session]) -> Result<(), ClientError> {
        let key = Self::key_for(&self.username);
        let json = serde_json::to_string(sessions)
            .map_err(|e| ClientError::Storage(format!("Failed to encode sessions: {}", e)))?;

        self.store
            .set(&key, &json)
            .map_err(|e| ClientError::Storage(format!("{:#}", e)))
    }
}
