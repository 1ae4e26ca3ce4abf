use super::events::{RenderEvent, RenderSurface};
use super::greeting::greeting;
use crate::api::AssistantApi;
use crate::auth::CredentialStore;
use crate::error::ClientError;
use crate::session::{Message, Session, SessionCache};
use crate::voice::{AudioArtifact, AudioInput, RecordingState, ToggleOutcome, VoiceCapture};
use std::sync::Arc;
use tracing::{error, info, warn};

const HISTORY_FAILED: &str = "Failed to load history";

/// Coordinates chat turns for one signed-in user
///
/// Built on entry to the authenticated view and consumed by [`logout`].
/// Every intent method reports its outcome through render events; failures
/// become bubbles or alerts and never leave the loading indicator on.
/// Methods take `&mut self`, so turns on one orchestrator run one at a time.
///
/// [`logout`]: ChatOrchestrator::logout
pub struct ChatOrchestrator {
    api: Arc<dyn AssistantApi>,
    credentials: CredentialStore,
    cache: SessionCache,
    surface: Box<dyn RenderSurface>,
    voice: Option<VoiceCapture>,
    current_session_id: Option<String>,
}

impl ChatOrchestrator {
    /// Create an orchestrator for the user held in `credentials`
    pub fn new(
        api: Arc<dyn AssistantApi>,
        credentials: CredentialStore,
        surface: Box<dyn RenderSurface>,
    ) -> Result<Self, ClientError> {
        if !credentials.is_authenticated() {
            return Err(ClientError::Auth("not logged in".to_string()));
        }
        let username = credentials
            .username()
            .ok_or_else(|| ClientError::Auth("no username stored".to_string()))?;

        info!("Chat session opened for {}", username);

        Ok(Self {
            api,
            cache: SessionCache::for_user(credentials.store(), username),
            credentials,
            surface,
            voice: None,
            current_session_id: None,
        })
    }

    /// Attach a voice capture; without one, `send_voice` reports that
    /// recording is unsupported
    pub fn with_voice(mut self, capture: VoiceCapture) -> Self {
        self.voice = Some(capture);
        self
    }

    pub fn username(&self) -> &str {
        self.cache.username()
    }

    pub fn current_session_id(&self) -> Option<&str> {
        self.current_session_id.as_deref()
    }

    pub fn sessions(&self) -> Vec<Session> {
        self.cache.load()
    }

    pub fn recording_state(&self) -> RecordingState {
        self.voice
            .as_ref()
            .map(|v| v.state())
            .unwrap_or(RecordingState::Idle)
    }

    /// Use `input` for the next recording
    pub fn set_voice_input(&mut self, input: Box<dyn AudioInput>) -> Result<(), ClientError> {
        match self.voice.as_mut() {
            Some(voice) => voice.replace_input(input),
            None => {
                self.voice = Some(VoiceCapture::new(input));
                Ok(())
            }
        }
    }

    /// Render the greeting, the session list and, if one is selected, its history
    pub async fn init(&mut self) {
        let text = greeting(self.cache.username());
        self.emit(RenderEvent::Greeting(text));
        self.refresh_sessions();

        if let Some(id) = self.current_session_id.clone() {
            self.load_history(&id).await;
        }
    }

    /// Send one text turn; blank input is ignored
    pub async fn send_text(&mut self, message: &str) {
        let message = message.trim();
        if message.is_empty() {
            return;
        }

        self.emit(RenderEvent::AppendBubble(Message::user(message)));
        self.emit(RenderEvent::LoadingStarted);

        let result = self
            .api
            .chat(message, self.current_session_id.as_deref())
            .await;

        match result {
            Ok(response) => {
                self.adopt_session_id(response.session_id);
                self.emit(RenderEvent::LoadingStopped);
                self.emit(RenderEvent::AppendBubble(Message::assistant(response.reply)));
            }
            Err(e) => {
                warn!("Text turn failed: {}", e);
                self.emit(RenderEvent::LoadingStopped);
                self.emit(RenderEvent::error_bubble(&e.user_message()));
            }
        }
    }

    /// Press the record control
    ///
    /// The first press starts recording; the next one stops it and submits the
    /// recording as a voice turn.
    pub async fn send_voice(&mut self) {
        let (outcome, state) = match self.voice.as_mut() {
            Some(voice) => {
                let outcome = voice.start().await;
                (outcome, voice.state())
            }
            None => {
                self.emit(RenderEvent::Alert(
                    "Audio recording not supported.".to_string(),
                ));
                return;
            }
        };

        match outcome {
            Ok(ToggleOutcome::Started) => {
                self.emit(RenderEvent::RecordingChanged(state));
            }
            Ok(ToggleOutcome::Busy) => {
                info!("Record control pressed while a recording is being processed");
            }
            Ok(ToggleOutcome::Finished(artifact)) => {
                self.emit(RenderEvent::RecordingChanged(state));
                self.submit_voice(artifact).await;
            }
            Err(e) => {
                self.emit(RenderEvent::RecordingChanged(state));
                self.emit(RenderEvent::Alert(format!(
                    "Voice recording failed: {}",
                    e.user_message()
                )));
            }
        }
    }

    /// Send everything `input` produces as one voice turn
    ///
    /// The regular voice input is set aside for the turn and restored after,
    /// so a WAV replay never becomes the record control's input. Refused while
    /// a recording is in progress.
    pub async fn send_recording(&mut self, input: Box<dyn AudioInput>) {
        if self.recording_state() != RecordingState::Idle {
            self.emit(RenderEvent::Alert(
                "Finish the current recording first.".to_string(),
            ));
            return;
        }

        let previous = self.voice.replace(VoiceCapture::new(input));
        self.send_voice().await;
        if self.recording_state() == RecordingState::Recording {
            self.send_voice().await;
        }
        self.voice = previous;
    }

    async fn submit_voice(&mut self, artifact: AudioArtifact) {
        self.emit(RenderEvent::LoadingStarted);

        let result = self
            .api
            .voice(&artifact, self.current_session_id.as_deref())
            .await;

        match result {
            Ok(response) => {
                self.adopt_session_id(response.session_id);
                self.emit(RenderEvent::LoadingStopped);
                self.emit(RenderEvent::AppendBubble(Message::user(response.transcript)));
                self.emit(RenderEvent::AppendBubble(Message::assistant(response.reply)));
            }
            Err(e) => {
                warn!("Voice turn failed: {}", e);
                let text = e.user_message();
                self.emit(RenderEvent::LoadingStopped);
                self.emit(RenderEvent::Alert(format!("Voice recording failed: {}", text)));
                self.emit(RenderEvent::error_bubble(&text));
            }
        }
    }

    /// View a session: its transcript is replaced with the server's history
    pub async fn switch_session(&mut self, id: &str) {
        info!("Switching to session {}", id);
        self.current_session_id = Some(id.to_string());
        self.refresh_sessions();
        self.load_history(id).await;
    }

    /// View the pending session, which has no server history yet
    pub fn select_pending(&mut self) {
        self.current_session_id = None;
        self.refresh_sessions();
        self.emit(RenderEvent::ClearTranscript);
    }

    /// Start a new, pending session named `name`; a blank name is ignored
    pub fn create_session(&mut self, name: &str) {
        let name = name.trim();
        if name.is_empty() {
            return;
        }

        self.current_session_id = None;
        self.emit(RenderEvent::ClearTranscript);

        if let Err(e) = self.cache.create_pending(name) {
            error!("Failed to create session: {}", e);
            self.emit(RenderEvent::Alert(format!(
                "Could not create chat: {}",
                e.user_message()
            )));
        }
        self.refresh_sessions();
    }

    /// Clear the stored credentials and give up this orchestrator
    pub fn logout(mut self) -> Result<(), ClientError> {
        if let Err(e) = self.credentials.clear() {
            self.emit(RenderEvent::Alert(format!("Logout failed: {}", e.user_message())));
            return Err(e);
        }
        info!("Logged out {}", self.cache.username());
        self.emit(RenderEvent::LoggedOut);
        Ok(())
    }

    async fn load_history(&mut self, id: &str) {
        self.emit(RenderEvent::ClearTranscript);

        match self.api.history(id).await {
            Ok(messages) => {
                info!("Loaded {} messages for session {}", messages.len(), id);
                for message in messages {
                    self.emit(RenderEvent::AppendBubble(message));
                }
            }
            Err(e) => {
                warn!("Failed to load history for {}: {}", id, e);
                self.emit(RenderEvent::error_bubble(HISTORY_FAILED));
            }
        }
    }

    /// Record the server's session id; the first id for a pending session
    /// reconciles the cache before the list is re-rendered
    fn adopt_session_id(&mut self, server_id: String) {
        let prior = self.current_session_id.replace(server_id.clone());
        if prior.is_some() {
            return;
        }

        match self.cache.reconcile(&server_id) {
            Ok(true) => self.refresh_sessions(),
            Ok(false) => {}
            Err(e) => {
                error!("Failed to reconcile session {}: {}", server_id, e);
                self.emit(RenderEvent::Alert(format!(
                    "Could not save chat: {}",
                    e.user_message()
                )));
            }
        }
    }

    fn refresh_sessions(&mut self) {
        let sessions = self.cache.load();
        let active = self.current_session_id.clone();
        self.emit(RenderEvent::SessionsChanged { sessions, active });
    }

    fn emit(&mut self, event: RenderEvent) {
        self.surface.render(event);
    }
}
