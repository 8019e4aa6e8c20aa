use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::credentials::TokenProvider;
use crate::errors::FirebaseError;

/// Firebase Realtime Database REST client
///
/// Paths are slash-separated node paths such as `chats/<id>/messages`.
pub struct RealtimeDatabaseClient {
    database_url: String,
    tokens: Arc<TokenProvider>,
    http_client: reqwest::Client,
}

impl RealtimeDatabaseClient {
    pub fn new(database_url: impl Into<String>, tokens: Arc<TokenProvider>) -> Self {
        Self {
            database_url: database_url.into().trim_end_matches('/').to_string(),
            tokens,
            http_client: reqwest::Client::new(),
        }
    }

    /// Placeholder the database replaces with its own clock on write.
    pub fn server_timestamp() -> Value {
        serde_json::json!({ ".sv": "timestamp" })
    }

    /// Replace the node at `path`
    pub async fn set(&self, path: &str, value: &Value) -> Result<(), FirebaseError> {
        let token = self.tokens.access_token().await?;
        let response = self
            .http_client
            .put(self.url_for(path))
            .bearer_auth(token)
            .json(value)
            .send()
            .await?;
        check_status(response).await?;
        debug!(path, "RTDB set");
        Ok(())
    }

    /// Multi-path update relative to `path`
    pub async fn update(&self, path: &str, updates: &Value) -> Result<(), FirebaseError> {
        let token = self.tokens.access_token().await?;
        let response = self
            .http_client
            .patch(self.url_for(path))
            .bearer_auth(token)
            .json(updates)
            .send()
            .await?;
        check_status(response).await?;
        debug!(path, "RTDB update");
        Ok(())
    }

    /// Read the node at `path`; `None` when it does not exist
    pub async fn get(&self, path: &str) -> Result<Option<Value>, FirebaseError> {
        let token = self.tokens.access_token().await?;
        let response = self
            .http_client
            .get(self.url_for(path))
            .bearer_auth(token)
            .send()
            .await?;
        let response = check_status(response).await?;
        let value: Value = response.json().await?;
        Ok(if value.is_null() { None } else { Some(value) })
    }

    pub(crate) fn url_for(&self, path: &str) -> String {
        format!("{}/{}.json", self.database_url, path.trim_matches('/'))
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, FirebaseError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(FirebaseError::ApiError(status.to_string(), body))
}
