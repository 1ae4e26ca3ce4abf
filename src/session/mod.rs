//! Local conversation sessions
//!
//! This module provides:
//! - `Session` / `Message` data types shared with the wire layer
//! - `SessionCache`, the durable per-user session list whose pending entry is
//!   reconciled with the server-assigned id after the first successful turn

mod cache;
mod model;

pub use cache::SessionCache;
pub use model::{Message, Role, Session};
