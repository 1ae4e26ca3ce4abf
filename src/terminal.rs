use crate::chat::{RenderEvent, RenderSurface};
use crate::session::{Role, Session};
use crate::voice::RecordingState;
use std::io::Write;

/// Renders chat events as lines on stdout; alerts go to stderr
pub struct TerminalSurface<W: Write + Send> {
    out: W,
}

impl TerminalSurface<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self {
            out: std::io::stdout(),
        }
    }
}

impl<W: Write + Send> TerminalSurface<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) {
        let _ = writeln!(self.out, "{}", text);
        let _ = self.out.flush();
    }
}

/// Numbered session list; `*` marks the active one
pub fn format_sessions(sessions: &[Session], active: Option<&str>) -> Vec<String> {
    sessions
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let marker = if s.id.as_deref() == active { '*' } else { ' ' };
            let id = s.id.as_deref().unwrap_or("pending");
            format!("{} {:>2}. {} ({})", marker, i + 1, s.name, id)
        })
        .collect()
}

impl<W: Write + Send> RenderSurface for TerminalSurface<W> {
    fn render(&mut self, event: RenderEvent) {
        match event {
            RenderEvent::Greeting(text) => {
                self.line(&format!("{}.", text));
                self.line("How can I help you today?");
            }
            RenderEvent::AppendBubble(message) => {
                let who = match message.role {
                    Role::User => "you",
                    Role::Assistant => "issac",
                };
                self.line(&format!("{}> {}", who, message.content));
            }
            RenderEvent::LoadingStarted => self.line("…"),
            RenderEvent::LoadingStopped => {}
            RenderEvent::ClearTranscript => self.line("────────"),
            RenderEvent::SessionsChanged { sessions, active } => {
                if sessions.is_empty() {
                    self.line("(no chats yet; /new <name> starts one)");
                }
                for row in format_sessions(&sessions, active.as_deref()) {
                    self.line(&row);
                }
            }
            RenderEvent::RecordingChanged(state) => match state {
                RecordingState::Recording => self.line("⏹ recording… (/voice again to send)"),
                RecordingState::Processing => self.line("processing recording…"),
                RecordingState::Idle => self.line("🎤 ready"),
            },
            RenderEvent::Alert(text) => eprintln!("! {}", text),
            RenderEvent::LoggedOut => self.line("Logged out."),
        }
    }
}
