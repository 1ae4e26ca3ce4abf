use super::messages::{
    ChatRequest, ChatResponse, HistoryResponse, SearchRequest, SearchResponse, VoiceResponse,
};
use crate::auth::CredentialStore;
use crate::error::ClientError;
use crate::session::Message;
use crate::voice::AudioArtifact;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Authenticated calls the chat orchestrator makes against the assistant service
#[async_trait]
pub trait AssistantApi: Send + Sync {
    /// `POST /api/chat`
    async fn chat(&self, message: &str, session_id: Option<&str>)
        -> Result<ChatResponse, ClientError>;

    /// `POST /api/voice` (multipart)
    async fn voice(
        &self,
        audio: &AudioArtifact,
        session_id: Option<&str>,
    ) -> Result<VoiceResponse, ClientError>;

    /// `GET /api/history/{session_id}`, oldest message first
    async fn history(&self, session_id: &str) -> Result<Vec<Message>, ClientError>;

    /// `POST /api/search`, top matching document snippets
    async fn search(&self, query: &str) -> Result<Vec<String>, ClientError>;
}

/// `reqwest`-backed assistant API
#[derive(Clone)]
pub struct HttpAssistantApi {
    client: Client,
    base_url: String,
    credentials: CredentialStore,
}

impl HttpAssistantApi {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        credentials: CredentialStore,
    ) -> Result<Self, ClientError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `/api/history/<id>` with the id percent-encoded as one path segment
    fn history_url(&self, session_id: &str) -> Result<Url, ClientError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ClientError::Config(format!("Invalid base URL {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::Config(format!("Base URL {} cannot take a path", self.base_url)))?
            .pop_if_empty()
            .extend(["api", "history", session_id]);
        Ok(url)
    }

    /// Attach `Authorization: Bearer <token>`; the token is re-read on every call
    fn auth_request(&self, request: RequestBuilder) -> Result<RequestBuilder, ClientError> {
        let token = self
            .credentials
            .token()
            .ok_or_else(|| ClientError::Auth("not logged in".to_string()))?;
        Ok(request.bearer_auth(token))
    }
}

pub(crate) fn build_client(timeout: Duration) -> Result<Client, ClientError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ClientError::Config(format!("Failed to build HTTP client: {}", e)))
}

/// Decode a success body, or turn a non-2xx response into [`ClientError`]
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if !status.is_success() {
        let path = response.url().path().to_string();
        let body = response.text().await.unwrap_or_default();
        warn!("Request to {} failed with {}", path, status);
        return Err(ClientError::from_status(status.as_u16(), &body));
    }
    Ok(response.json::<T>().await?)
}

#[async_trait]
impl AssistantApi for HttpAssistantApi {
    async fn chat(
        &self,
        message: &str,
        session_id: Option<&str>,
    ) -> Result<ChatResponse, ClientError> {
        info!(
            "Sending chat turn (session={})",
            session_id.unwrap_or("new")
        );

        let request = self.auth_request(
            self.client
                .post(self.url("/api/chat"))
                .json(&ChatRequest { message, session_id }),
        )?;

        let response: ChatResponse = read_json(request.send().await?).await?;
        debug!("Chat reply received for session {}", response.session_id);
        Ok(response)
    }

    async fn voice(
        &self,
        audio: &AudioArtifact,
        session_id: Option<&str>,
    ) -> Result<VoiceResponse, ClientError> {
        info!(
            "Uploading voice turn: {} bytes of {} (session={})",
            audio.bytes.len(),
            audio.mime_type,
            session_id.unwrap_or("new")
        );

        let part = reqwest::multipart::Part::bytes(audio.bytes.clone())
            .file_name(audio.file_name.clone())
            .mime_str(&audio.mime_type)
            .map_err(|e| ClientError::Capture(format!("Invalid audio MIME type: {}", e)))?;

        let mut form = reqwest::multipart::Form::new().part("file", part);
        if let Some(id) = session_id {
            form = form.text("session_id", id.to_string());
        }

        let request = self.auth_request(self.client.post(self.url("/api/voice")).multipart(form))?;
        let response: VoiceResponse = read_json(request.send().await?).await?;
        debug!("Voice reply received for session {}", response.session_id);
        Ok(response)
    }

    async fn history(&self, session_id: &str) -> Result<Vec<Message>, ClientError> {
        info!("Fetching history for session {}", session_id);

        let request = self.auth_request(self.client.get(self.history_url(session_id)?))?;
        let response: HistoryResponse = read_json(request.send().await?).await?;
        Ok(response.into_messages())
    }

    async fn search(&self, query: &str) -> Result<Vec<String>, ClientError> {
        let request = self.auth_request(
            self.client
                .post(self.url("/api/search"))
                .json(&SearchRequest { query }),
        )?;
        let response: SearchResponse = read_json(request.send().await?).await?;
        Ok(response.results)
    }
}
