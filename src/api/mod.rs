//! HTTP client for the assistant service
//!
//! Endpoints used by the chat core:
//! - POST /api/chat - text turn
//! - POST /api/voice - recorded audio turn (multipart)
//! - GET /api/history/:session_id - full transcript of a session
//! - POST /api/search - document snippet lookup
//!
//! Login and registration live in [`crate::auth`].

mod client;
pub mod messages;

pub use client::{AssistantApi, HttpAssistantApi};
pub(crate) use client::build_client;
pub use messages::{ChatResponse, VoiceResponse};
