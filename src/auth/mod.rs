//! Authentication collaborator
//!
//! Holds the bearer token and username in the durable store and talks to the
//! unauthenticated login/register endpoints. The chat core only asks it for
//! the token and username, and asks it to clear them on logout.

mod client;
mod credentials;

pub use client::AuthClient;
pub use credentials::{CredentialStore, TOKEN_KEY, USER_KEY};
