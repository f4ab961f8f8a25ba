use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use shared::domain::MicrosoftAccount;
use thiserror::Error;
use tracing::info;

use crate::AuthClient;

#[derive(Debug, Error)]
pub enum AuthRefreshError {
    #[error("token endpoint request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("token endpoint rejected the refresh token: status {0}")]
    Rejected(StatusCode),
}

/// Refresh client talking to the launcher's auth backend: posts the refresh
/// token as a form grant and expects the full renewed account back.
pub struct HttpAuthClient {
    http: Client,
    token_endpoint: String,
}

impl HttpAuthClient {
    pub fn new(token_endpoint: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            token_endpoint: token_endpoint.into(),
        }
    }
}

#[async_trait]
impl AuthClient for HttpAuthClient {
    async fn refresh_credential(&self, refresh_token: &str) -> Result<MicrosoftAccount> {
        let response = self
            .http
            .post(&self.token_endpoint)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await
            .map_err(AuthRefreshError::Transport)?;

        if !response.status().is_success() {
            return Err(AuthRefreshError::Rejected(response.status()).into());
        }

        let account: MicrosoftAccount =
            response.json().await.map_err(AuthRefreshError::Transport)?;
        info!(username = %account.username, "received renewed credential");
        Ok(account)
    }
}

#[cfg(test)]
#[path = "tests/auth_tests.rs"]
mod tests;
