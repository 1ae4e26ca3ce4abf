//! Error taxonomy for the chat client.
//!
//! Every asynchronous operation converts its failure into one of these
//! variants at its own boundary; the orchestrator then renders it as a
//! bubble or an alert instead of propagating it further.

use serde::Deserialize;

/// Errors surfaced by the client core.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Empty or otherwise invalid user input, rejected before any network call
    #[error("validation error: {0}")]
    Validation(String),

    /// Missing or rejected bearer token
    #[error("authentication error: {0}")]
    Auth(String),

    /// Transport failure (connection refused, timeout, malformed body)
    #[error("network error: {0}")]
    Network(String),

    /// Server answered with a non-2xx status
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Microphone unavailable, denied, or produced no audio
    #[error("capture error: {0}")]
    Capture(String),

    /// Durable store could not be read or written
    #[error("storage error: {0}")]
    Storage(String),

    /// Configuration could not be loaded
    #[error("config error: {0}")]
    Config(String),
}

/// Optional error fields the server puts in JSON failure bodies
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    msg: Option<String>,
    error: Option<String>,
}

/// `msg` (preferred) or `error` from a JSON failure body, if non-blank
pub(crate) fn server_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    parsed
        .msg
        .filter(|m| !m.trim().is_empty())
        .or(parsed.error.filter(|m| !m.trim().is_empty()))
}

impl ClientError {
    /// Build an error from a non-2xx response.
    ///
    /// A JSON `msg` (preferred) or `error` field becomes the message; anything
    /// else collapses to `HTTP <status>`. 401 and 422 are the codes the server
    /// uses for missing and malformed tokens, so they map to [`ClientError::Auth`].
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = server_message(body).unwrap_or_else(|| format!("HTTP {}", status));

        match status {
            401 | 422 => ClientError::Auth(message),
            _ => ClientError::Status { status, message },
        }
    }

    /// Text shown to the user in a bubble or alert
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Validation(m)
            | ClientError::Auth(m)
            | ClientError::Network(m)
            | ClientError::Capture(m)
            | ClientError::Storage(m)
            | ClientError::Config(m) => m.clone(),
            ClientError::Status { message, .. } => message.clone(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Network("request timed out".to_string())
        } else if err.is_decode() {
            ClientError::Network(format!("invalid response: {}", err))
        } else {
            ClientError::Network(err.to_string())
        }
    }
}
