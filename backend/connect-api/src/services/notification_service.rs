use bson::oid::ObjectId;
use firebase_shared::PushMessage;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::error::{AppError, Result};
use crate::gateways::PushGateway;
use crate::models::Notification;
use crate::repository::{NotificationRepository, UserRepository};
use crate::AppState;

const INBOX_LIMIT: i64 = 50;

/// Build a notification data map from key/value pairs
pub fn notification_data(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[derive(Clone)]
pub struct NotificationService {
    users: Arc<dyn UserRepository>,
    notifications: Arc<dyn NotificationRepository>,
    push: Arc<dyn PushGateway>,
}

impl NotificationService {
    pub fn new(state: &AppState) -> Self {
        Self {
            users: state.repos.users.clone(),
            notifications: state.repos.notifications.clone(),
            push: state.push.clone(),
        }
    }

    /// Store an inbox item and push it to the user's device.
    /// Every failure is logged; nothing is returned to the caller.
    pub async fn send_notification(
        &self,
        user_id: &str,
        title: &str,
        body: &str,
        data: BTreeMap<String, String>,
    ) {
        let notification = Notification::new(user_id, title, body, data.clone());
        if let Err(e) = self.notifications.insert(notification).await {
            error!(user_id, error = %e, "Failed to store notification");
        }

        let token = match self.users.find_by_uid(user_id).await {
            Ok(user) => user
                .and_then(|u| u.notification_token)
                .filter(|t| !t.is_empty()),
            Err(e) => {
                error!(user_id, error = %e, "Failed to look up push token");
                return;
            }
        };

        let Some(token) = token else {
            warn!(user_id, "No push token registered; skipping push");
            return;
        };

        let message = PushMessage {
            token,
            title: title.to_string(),
            body: body.to_string(),
            data,
        };

        match self.push.send(message).await {
            Ok(()) => debug!(user_id, "Push sent"),
            Err(e) => error!(user_id, error = %e, "Failed to send push"),
        }
    }

    pub async fn list(&self, uid: &str) -> Result<Vec<Notification>> {
        self.notifications.list_for_user(uid, INBOX_LIMIT).await
    }

    pub async fn mark_read(&self, id: ObjectId, uid: &str) -> Result<Notification> {
        self.notifications
            .mark_read(id, uid)
            .await?
            .ok_or_else(|| AppError::NotFound("Notification not found".to_string()))
    }

    pub async fn mark_all_read(&self, uid: &str) -> Result<u64> {
        self.notifications.mark_all_read(uid).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingPush, TestContext};

    #[tokio::test]
    async fn test_send_stores_and_pushes() {
        let ctx = TestContext::new();
        ctx.user("alice").await;
        let service = NotificationService::new(&ctx.state);

        service
            .send_notification("alice", "Hi", "Body", notification_data(&[("type", "chat")]))
            .await;

        let inbox = service.list("alice").await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].data["type"], "chat");

        let sent = ctx.push.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].token, "device-alice");
        assert_eq!(sent[0].title, "Hi");
    }

    #[tokio::test]
    async fn test_send_without_token_still_stores() {
        let ctx = TestContext::new();
        let service = NotificationService::new(&ctx.state);

        service
            .send_notification("ghost", "Hi", "Body", BTreeMap::new())
            .await;

        assert_eq!(service.list("ghost").await.unwrap().len(), 1);
        assert!(ctx.push.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_push_failure_is_swallowed() {
        let ctx = TestContext::with_push(RecordingPush::failing());
        ctx.user("alice").await;
        let service = NotificationService::new(&ctx.state);

        service
            .send_notification("alice", "Hi", "Body", BTreeMap::new())
            .await;

        assert_eq!(service.list("alice").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_mark_read_is_owner_scoped() {
        let ctx = TestContext::new();
        let service = NotificationService::new(&ctx.state);
        service
            .send_notification("alice", "Hi", "Body", BTreeMap::new())
            .await;
        let id = service.list("alice").await.unwrap()[0].id;

        assert!(matches!(
            service.mark_read(id, "bob").await,
            Err(AppError::NotFound(_))
        ));
        assert!(service.mark_read(id, "alice").await.unwrap().is_read);
    }

    #[tokio::test]
    async fn test_mark_all_read_counts() {
        let ctx = TestContext::new();
        let service = NotificationService::new(&ctx.state);
        for _ in 0..3 {
            service
                .send_notification("alice", "Hi", "Body", BTreeMap::new())
                .await;
        }
        assert_eq!(service.mark_all_read("alice").await.unwrap(), 3);
        assert_eq!(service.mark_all_read("alice").await.unwrap(), 0);
    }
}
