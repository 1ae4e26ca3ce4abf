use super::credentials::CredentialStore;
use crate::api::messages::{CredentialsRequest, LoginResponse, RegisterResponse};
use crate::api::build_client;
use crate::error::{server_message, ClientError};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{info, warn};

/// Login and registration against the unauthenticated endpoints
pub struct AuthClient {
    client: Client,
    base_url: String,
    credentials: CredentialStore,
}

impl AuthClient {
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

    /// Exchange credentials for a bearer token and store it with the username
    pub async fn login(&self, username: &str, password: &str) -> Result<(), ClientError> {
        let (username, password) = validate(username, password)?;
        info!("Logging in as {}", username);

        let body: LoginResponse = self
            .submit("/api/login", username, password, "Login failed.")
            .await?;

        let token = body
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ClientError::Auth("Login failed.".to_string()))?;

        self.credentials.save(&token, username)
    }

    /// Create an account; returns the server's confirmation text
    pub async fn register(&self, username: &str, password: &str) -> Result<String, ClientError> {
        let (username, password) = validate(username, password)?;
        info!("Registering {}", username);

        let body: RegisterResponse = self
            .submit("/api/register", username, password, "Registration failed.")
            .await?;

        Ok(body
            .msg
            .unwrap_or_else(|| "Registered! Please log in.".to_string()))
    }

    /// POST the credential form; a rejection carries the server's `msg`/`error`
    /// text, or `fallback` when the body has none
    async fn submit<T: DeserializeOwned>(
        &self,
        path: &str,
        username: &str,
        password: &str,
        fallback: &str,
    ) -> Result<T, ClientError> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(&CredentialsRequest { username, password })
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        let body = response.text().await.map_err(network_error)?;

        if !status.is_success() {
            warn!("{} rejected with {}", path, status);
            return Err(ClientError::Auth(
                server_message(&body).unwrap_or_else(|| fallback.to_string()),
            ));
        }

        serde_json::from_str(&body).map_err(|e| {
            warn!("Malformed {} response: {}", path, e);
            ClientError::Network(NETWORK_ERROR.to_string())
        })
    }
}

const NETWORK_ERROR: &str = "Network error. Try again.";

fn validate<'a>(username: &'a str, password: &'a str) -> Result<(&'a str, &'a str), ClientError> {
    let username = username.trim();
    let password = password.trim();
    if username.is_empty() || password.is_empty() {
        return Err(ClientError::Validation("Both fields are required.".to_string()));
    }
    Ok((username, password))
}

fn network_error(err: reqwest::Error) -> ClientError {
    warn!("Auth request failed: {}", err);
    ClientError::Network(NETWORK_ERROR.to_string())
}
