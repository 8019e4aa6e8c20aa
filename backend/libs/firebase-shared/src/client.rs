use std::sync::Arc;
use uuid::Uuid;

use crate::credentials::TokenProvider;
use crate::errors::FirebaseError;
use crate::models::*;

const ANDROID_CHANNEL_ID: &str = "high_importance_channel";

/// Firebase Cloud Messaging Client
///
/// Sends single-device notifications through the FCM HTTP v1 API. Android
/// messages go out with high priority on the app's high-importance channel
/// and iOS messages play the default sound.
pub struct FcmClient {
    project_id: String,
    tokens: Arc<TokenProvider>,
    http_client: reqwest::Client,
}

impl FcmClient {
    pub fn new(tokens: Arc<TokenProvider>) -> Self {
        Self {
            project_id: tokens.project_id().to_string(),
            tokens,
            http_client: reqwest::Client::new(),
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Send a notification to a single device
    pub async fn send(&self, push: &PushMessage) -> Result<FcmSendResult, FirebaseError> {
        let access_token = self.tokens.access_token().await?;

        let url = format!(
            "https://fcm.googleapis.com/v1/projects/{}/messages:send",
            self.project_id
        );

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(access_token)
            .json(&build_message(push))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(FirebaseError::ApiError(status.to_string(), error_text));
        }

        let fcm_response: FcmApiResponse = response.json().await?;
        Ok(FcmSendResult {
            message_id: fcm_response
                .name
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
        })
    }
}

pub(crate) fn build_message(push: &PushMessage) -> FcmMessage {
    FcmMessage {
        message: FcmMessageContent {
            token: push.token.clone(),
            notification: FcmNotification {
                title: push.title.clone(),
                body: push.body.clone(),
            },
            data: push.data.clone(),
            android: FcmAndroidConfig {
                priority: "high".to_string(),
                notification: FcmAndroidNotification {
                    channel_id: ANDROID_CHANNEL_ID.to_string(),
                },
            },
            apns: serde_json::json!({
                "payload": { "aps": { "sound": "default" } }
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_build_message_payload_shape() {
        let mut data = BTreeMap::new();
        data.insert("type".to_string(), "chat".to_string());
        data.insert("conversationId".to_string(), "abc".to_string());

        let push = PushMessage {
            token: "device-token".to_string(),
            title: "Rahim".to_string(),
            body: "hello".to_string(),
            data,
        };

        let json = serde_json::to_value(build_message(&push)).unwrap();
        let message = &json["message"];
        assert_eq!(message["token"], "device-token");
        assert_eq!(message["notification"]["title"], "Rahim");
        assert_eq!(message["notification"]["body"], "hello");
        assert_eq!(message["data"]["type"], "chat");
        assert_eq!(message["data"]["conversationId"], "abc");
        assert_eq!(message["android"]["priority"], "high");
        assert_eq!(
            message["android"]["notification"]["channel_id"],
            "high_importance_channel"
        );
        assert_eq!(message["apns"]["payload"]["aps"]["sound"], "default");
    }

    #[test]
    fn test_build_message_with_empty_data() {
        let push = PushMessage {
            token: "t".to_string(),
            title: "x".to_string(),
            body: "y".to_string(),
            data: BTreeMap::new(),
        };
        let json = serde_json::to_value(build_message(&push)).unwrap();
        assert!(json["message"]["data"].as_object().unwrap().is_empty());
    }
}
