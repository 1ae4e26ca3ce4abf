use crate::session::{Message, Session};
use crate::voice::RecordingState;
use std::sync::{Arc, Mutex};

/// Prefix that marks a bubble as an error report
pub const ERROR_MARKER: &str = "⚠️";

/// Closed set of view updates emitted by the orchestrator
#[derive(Debug, Clone, PartialEq)]
pub enum RenderEvent {
    /// Time-of-day greeting for the signed-in user
    Greeting(String),
    /// Append one message bubble to the transcript
    AppendBubble(Message),
    LoadingStarted,
    LoadingStopped,
    /// Empty the transcript area
    ClearTranscript,
    /// The session list or the active selection changed
    SessionsChanged {
        sessions: Vec<Session>,
        active: Option<String>,
    },
    /// The record control changed state
    RecordingChanged(RecordingState),
    /// Immediate, out-of-transcript notice
    Alert(String),
    /// Credentials were cleared; the view should return to sign-in
    LoggedOut,
}

impl RenderEvent {
    /// Assistant bubble carrying an error report
    pub fn error_bubble(text: &str) -> Self {
        RenderEvent::AppendBubble(Message::assistant(format!("{} {}", ERROR_MARKER, text)))
    }

    pub fn is_error_bubble(&self) -> bool {
        matches!(self, RenderEvent::AppendBubble(m) if m.content.starts_with(ERROR_MARKER))
    }
}

/// Receives render events; implemented by the view layer
pub trait RenderSurface: Send {
    fn render(&mut self, event: RenderEvent);
}

/// Surface that records every event; clones share the same log
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<RenderEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything rendered so far
    pub fn events(&self) -> Vec<RenderEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Drain the log
    pub fn take(&self) -> Vec<RenderEvent> {
        self.events
            .lock()
            .map(|mut e| std::mem::take(&mut *e))
            .unwrap_or_default()
    }
}

impl RenderSurface for EventLog {
    fn render(&mut self, event: RenderEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
