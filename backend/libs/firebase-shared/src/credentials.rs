use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::RwLock;
use tracing::debug;

use crate::errors::FirebaseError;
use crate::models::{GoogleTokenResponse, JwtClaims, TokenCache};

/// Scopes needed by the messaging and realtime database clients.
const SERVICE_SCOPES: &str = "https://www.googleapis.com/auth/cloud-platform \
https://www.googleapis.com/auth/firebase.database \
https://www.googleapis.com/auth/firebase.messaging \
https://www.googleapis.com/auth/userinfo.email";

/// Firebase service account key (the JSON downloaded from the console)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceAccountKey {
    pub project_id: String,
    pub private_key_id: String,
    pub private_key: String,
    pub client_email: String,
    pub client_id: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

impl ServiceAccountKey {
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, FirebaseError> {
        let raw = tokio::fs::read_to_string(path).await?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, FirebaseError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Exchanges a signed service-account JWT for a Google OAuth2 access token
/// and caches it for reuse by every Firebase client.
pub struct TokenProvider {
    credentials: ServiceAccountKey,
    token_cache: RwLock<Option<TokenCache>>,
    http_client: reqwest::Client,
}

impl TokenProvider {
    pub fn new(credentials: ServiceAccountKey) -> Self {
        Self {
            credentials,
            token_cache: RwLock::new(None),
            http_client: reqwest::Client::new(),
        }
    }

    pub fn project_id(&self) -> &str {
        &self.credentials.project_id
    }

    /// Get an access token, refreshing it when the cached one is about to expire
    pub async fn access_token(&self) -> Result<String, FirebaseError> {
        if let Some(cached) = self.token_cache.read().await.as_ref() {
            if cached.is_fresh(Utc::now().timestamp()) {
                return Ok(cached.access_token.clone());
            }
        }

        let assertion = self.signed_assertion()?;
        let params = [
            ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
            ("assertion", assertion.as_str()),
        ];

        let response = self
            .http_client
            .post(&self.credentials.token_uri)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FirebaseError::TokenRequestFailed(
                response.status().to_string(),
            ));
        }

        let token_response: GoogleTokenResponse = response.json().await?;
        let expires_at = Utc::now().timestamp() + token_response.expires_in;
        debug!(expires_at, "Refreshed Google access token");

        *self.token_cache.write().await = Some(TokenCache {
            access_token: token_response.access_token.clone(),
            expires_at,
        });

        Ok(token_response.access_token)
    }

    fn signed_assertion(&self) -> Result<String, FirebaseError> {
        let now = Utc::now();
        let claims = JwtClaims {
            iss: self.credentials.client_email.clone(),
            sub: self.credentials.client_email.clone(),
            scope: SERVICE_SCOPES.to_string(),
            aud: self.credentials.token_uri.clone(),
            exp: (now + Duration::hours(1)).timestamp(),
            iat: now.timestamp(),
        };

        let encoding_key = EncodingKey::from_rsa_pem(self.credentials.private_key.as_bytes())
            .map_err(|e| FirebaseError::KeyParseError(e.to_string()))?;

        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.credentials.private_key_id.clone());

        encode(&header, &claims, &encoding_key)
            .map_err(|e| FirebaseError::JwtEncodeError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY: &str = include_str!("../tests/fixtures/test_rsa_key.pem");

    fn credentials(private_key: &str) -> ServiceAccountKey {
        ServiceAccountKey {
            project_id: "nwu-connect-test".to_string(),
            private_key_id: "key-id".to_string(),
            private_key: private_key.to_string(),
            client_email: "svc@nwu-connect-test.iam.gserviceaccount.com".to_string(),
            client_id: "123456".to_string(),
            token_uri: default_token_uri(),
        }
    }

    #[test]
    fn test_service_account_from_json_defaults_token_uri() {
        let raw = r#"{
            "project_id": "nwu-connect-test",
            "private_key_id": "abc",
            "private_key": "pem",
            "client_email": "svc@example.com",
            "client_id": "42"
        }"#;
        let key = ServiceAccountKey::from_json(raw).unwrap();
        assert_eq!(key.project_id, "nwu-connect-test");
        assert_eq!(key.token_uri, "https://oauth2.googleapis.com/token");
    }

    #[test]
    fn test_token_cache_freshness_window() {
        let cache = TokenCache {
            access_token: "t".to_string(),
            expires_at: 1_000,
        };
        assert!(cache.is_fresh(900));
        assert!(!cache.is_fresh(940));
        assert!(!cache.is_fresh(1_000));
    }

    #[test]
    fn test_signed_assertion_uses_rs256_and_kid() {
        let provider = TokenProvider::new(credentials(TEST_KEY));
        let assertion = provider.signed_assertion().unwrap();
        let header = jsonwebtoken::decode_header(&assertion).unwrap();
        assert_eq!(header.alg, Algorithm::RS256);
        assert_eq!(header.kid.as_deref(), Some("key-id"));
    }

    #[test]
    fn test_signed_assertion_rejects_bad_key() {
        let provider = TokenProvider::new(credentials("not a pem"));
        assert!(matches!(
            provider.signed_assertion(),
            Err(FirebaseError::KeyParseError(_))
        ));
    }

    #[tokio::test]
    async fn test_cached_token_is_reused() {
        let provider = TokenProvider::new(credentials(TEST_KEY));
        *provider.token_cache.write().await = Some(TokenCache {
            access_token: "cached-token".to_string(),
            expires_at: Utc::now().timestamp() + 3_600,
        });
        assert_eq!(provider.access_token().await.unwrap(), "cached-token");
    }
}
