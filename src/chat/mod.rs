//! Chat orchestration
//!
//! `ChatOrchestrator` turns user intents (send text, record voice, switch or
//! create a session, log out) into authenticated API calls, keeps the
//! session cache reconciled, and reports every outcome as a `RenderEvent`.

mod events;
mod greeting;
mod orchestrator;

pub use events::{EventLog, RenderEvent, RenderSurface, ERROR_MARKER};
pub use greeting::{greeting, salutation};
pub use orchestrator::ChatOrchestrator;
