pub mod api;
pub mod auth;
pub mod chat;
pub mod config;
pub mod error;
pub mod session;
pub mod store;
pub mod terminal;
pub mod voice;

pub use api::{AssistantApi, ChatResponse, HttpAssistantApi, VoiceResponse};
pub use auth::{AuthClient, CredentialStore};
pub use chat::{ChatOrchestrator, EventLog, RenderEvent, RenderSurface};
pub use config::Config;
pub use error::ClientError;
pub use session::{Message, Role, Session, SessionCache};
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use terminal::TerminalSurface;
pub use voice::{
    AudioArtifact, AudioFrame, AudioInput, AudioInputConfig, AudioInputFactory, AudioSource,
    RecordingState, VoiceCapture, WavFileInput,
};
