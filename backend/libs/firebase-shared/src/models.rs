use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A push notification addressed to one device
#[derive(Debug, Clone, PartialEq)]
pub struct PushMessage {
    pub token: String,
    pub title: String,
    pub body: String,
    pub data: BTreeMap<String, String>,
}

/// FCM send result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FcmSendResult {
    pub message_id: String,
}

/// OAuth2 token cache entry
#[derive(Debug, Clone)]
pub struct TokenCache {
    pub access_token: String,
    pub expires_at: i64,
}

impl TokenCache {
    /// A cached token is reused while it has more than a minute left.
    pub fn is_fresh(&self, now: i64) -> bool {
        self.expires_at > now + 60
    }
}

/// JWT claims for the Google OAuth2 JWT-bearer grant
#[derive(Debug, Serialize)]
pub struct JwtClaims {
    pub iss: String,
    pub sub: String,
    pub scope: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
}

/// Google OAuth2 token response
#[derive(Debug, Deserialize)]
pub struct GoogleTokenResponse {
    pub access_token: String,
    pub expires_in: i64,
}

/// FCM HTTP v1 request envelope
#[derive(Debug, Serialize)]
pub struct FcmMessage {
    pub message: FcmMessageContent,
}

#[derive(Debug, Serialize)]
pub struct FcmMessageContent {
    pub token: String,
    pub notification: FcmNotification,
    pub data: BTreeMap<String, String>,
    pub android: FcmAndroidConfig,
    pub apns: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct FcmNotification {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct FcmAndroidConfig {
    pub priority: String,
    pub notification: FcmAndroidNotification,
}

#[derive(Debug, Serialize)]
pub struct FcmAndroidNotification {
    pub channel_id: String,
}

/// FCM API response
#[derive(Debug, Deserialize)]
pub struct FcmApiResponse {
    pub name: Option<String>,
}
