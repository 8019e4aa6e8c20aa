//! Firebase Auth ID token verification
//!
//! ID tokens are RS256 JWTs signed by Google's `securetoken` service account.
//! The public keys are published as a JWK set whose `Cache-Control: max-age`
//! tells us how long they may be cached.

use chrono::Utc;
use jsonwebtoken::{decode, decode_header, jwk::JwkSet, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::errors::FirebaseError;

const JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
const DEFAULT_KEYS_TTL_SECS: i64 = 3_600;

/// Claims carried by a Firebase ID token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirebaseClaims {
    /// Firebase uid
    pub sub: String,
    pub aud: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(default)]
    pub auth_time: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: Option<bool>,
}

struct KeyCache {
    keys: JwkSet,
    expires_at: i64,
}

/// Verifies ID tokens for one Firebase project
pub struct IdTokenVerifier {
    project_id: String,
    keys: RwLock<Option<KeyCache>>,
    refreshable: bool,
    http_client: reqwest::Client,
}

impl IdTokenVerifier {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            keys: RwLock::new(None),
            refreshable: true,
            http_client: reqwest::Client::new(),
        }
    }

    /// Verifier pinned to a fixed key set; it never fetches keys.
    pub fn with_keys(project_id: impl Into<String>, keys: JwkSet) -> Self {
        Self {
            project_id: project_id.into(),
            keys: RwLock::new(Some(KeyCache {
                keys,
                expires_at: i64::MAX,
            })),
            refreshable: false,
            http_client: reqwest::Client::new(),
        }
    }

    pub fn issuer(&self) -> String {
        format!("https://securetoken.google.com/{}", self.project_id)
    }

    /// Verify signature, audience, issuer and expiry, returning the claims
    pub async fn verify(&self, token: &str) -> Result<FirebaseClaims, FirebaseError> {
        let header =
            decode_header(token).map_err(|e| FirebaseError::InvalidIdToken(e.to_string()))?;
        if header.alg != Algorithm::RS256 {
            return Err(FirebaseError::InvalidIdToken(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| FirebaseError::InvalidIdToken("missing kid".to_string()))?;

        let decoding_key = self.decoding_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.project_id.as_str()]);
        validation.set_issuer(&[self.issuer()]);

        let claims = decode::<FirebaseClaims>(token, &decoding_key, &validation)
            .map_err(|e| FirebaseError::InvalidIdToken(e.to_string()))?
            .claims;

        if claims.sub.is_empty() {
            return Err(FirebaseError::InvalidIdToken("empty subject".to_string()));
        }

        Ok(claims)
    }

    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, FirebaseError> {
        let now = Utc::now().timestamp();
        {
            let cache = self.keys.read().await;
            if let Some(cache) = cache.as_ref() {
                let usable = cache.expires_at > now || !self.refreshable;
                if usable {
                    if let Some(jwk) = cache.keys.find(kid) {
                        return DecodingKey::from_jwk(jwk)
                            .map_err(|e| FirebaseError::InvalidIdToken(e.to_string()));
                    }
                    if !self.refreshable {
                        return Err(FirebaseError::UnknownSigningKey(kid.to_string()));
                    }
                }
            }
        }

        // Keys expired or rotated since the last fetch
        self.refresh_keys().await?;

        let cache = self.keys.read().await;
        let jwk = cache
            .as_ref()
            .and_then(|c| c.keys.find(kid))
            .ok_or_else(|| FirebaseError::UnknownSigningKey(kid.to_string()))?;
        DecodingKey::from_jwk(jwk).map_err(|e| FirebaseError::InvalidIdToken(e.to_string()))
    }

    async fn refresh_keys(&self) -> Result<(), FirebaseError> {
        let response = self.http_client.get(JWKS_URL).send().await?;
        if !response.status().is_success() {
            let status = response.status().to_string();
            warn!(%status, "Failed to fetch Firebase signing keys");
            return Err(FirebaseError::ApiError(status, "jwks fetch failed".to_string()));
        }

        let ttl = response
            .headers()
            .get(reqwest::header::CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_max_age)
            .unwrap_or(DEFAULT_KEYS_TTL_SECS);

        let keys: JwkSet = response.json().await?;
        debug!(count = keys.keys.len(), ttl, "Fetched Firebase signing keys");

        *self.keys.write().await = Some(KeyCache {
            keys,
            expires_at: Utc::now().timestamp() + ttl,
        });
        Ok(())
    }
}

fn parse_max_age(cache_control: &str) -> Option<i64> {
    cache_control
        .split(',')
        .map(str::trim)
        .find_map(|directive| directive.strip_prefix("max-age="))
        .and_then(|v| v.parse().ok())
}
