use crate::session::Message;
use serde::{Deserialize, Serialize};

/// Body of `POST /api/login` and `POST /api/register`
#[derive(Debug, Serialize)]
pub struct CredentialsRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterResponse {
    pub msg: Option<String>,
}

/// Body of `POST /api/chat`; `session_id` is sent as `null` for a new session
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub message: &'a str,
    pub session_id: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VoiceResponse {
    pub transcript: String,
    pub reply: String,
    pub session_id: String,
}

/// One stored turn as returned by `GET /api/history/{id}`
#[derive(Debug, Deserialize)]
pub struct HistoryEntry {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryResponse {
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

impl HistoryResponse {
    pub fn into_messages(self) -> Vec<Message> {
        self.history
            .into_iter()
            .map(|entry| Message {
                role: crate::session::Role::from_wire(&entry.role),
                content: entry.content,
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub struct SearchRequest<'a> {
    pub query: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<String>,
}
