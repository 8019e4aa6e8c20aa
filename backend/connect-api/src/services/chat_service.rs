// Chat service - one-to-one conversations mirrored to the realtime database
use bson::oid::ObjectId;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{AppError, Result};
use crate::gateways::{server_timestamp, RealtimeStore};
use crate::models::{Conversation, Message, MessageStatus, MessageType, Profile};
use crate::repository::{ChatRepository, ProfileRepository};
use crate::services::{notification_data, NotificationService};
use crate::AppState;

const MESSAGE_PAGE: i64 = 50;

#[derive(Debug, Clone)]
pub struct SendMessage {
    pub target_id: String,
    pub content: String,
    pub message_type: MessageType,
    pub image_url: Option<String>,
}

impl SendMessage {
    fn validate(&self) -> Result<()> {
        match self.message_type {
            MessageType::Text if self.content.trim().is_empty() => Err(AppError::BadRequest(
                "Message content is required".to_string(),
            )),
            MessageType::Image if self.image_url.as_deref().map_or(true, str::is_empty) => Err(
                AppError::BadRequest("Image messages need an imageUrl".to_string()),
            ),
            _ => Ok(()),
        }
    }
}

/// Conversation summary from one participant's point of view
#[derive(Debug, Clone)]
pub struct ConversationView {
    pub conversation: Conversation,
    pub other_user_id: String,
    pub other_name: String,
    pub other_photo: String,
}

fn messages_path(conversation_id: ObjectId) -> String {
    format!("chats/{}/messages", conversation_id.to_hex())
}

fn mirror_payload(message: &Message) -> Value {
    json!({
        "id": message.id.to_hex(),
        "conversationId": message.conversation_id.to_hex(),
        "senderId": message.sender_id,
        "content": message.content,
        "type": message.message_type.as_str(),
        "imageUrl": message.image_url,
        "status": message.status.as_str(),
        "read": message.read,
        "timestamp": server_timestamp(),
    })
}

/// Multi-path update flipping every message from someone other than
/// `reader` to seen. `None` when nothing needs to change.
fn seen_updates(messages: &Value, reader: &str) -> Option<Value> {
    let updates: Map<String, Value> = messages
        .as_object()?
        .iter()
        .filter(|(_, m)| {
            m.get("senderId").and_then(Value::as_str) != Some(reader)
                && m.get("status").and_then(Value::as_str) != Some(MessageStatus::Seen.as_str())
        })
        .map(|(id, _)| {
            (
                format!("{}/status", id),
                Value::from(MessageStatus::Seen.as_str()),
            )
        })
        .collect();
    (!updates.is_empty()).then_some(Value::Object(updates))
}

pub struct ChatService {
    chat: Arc<dyn ChatRepository>,
    profiles: Arc<dyn ProfileRepository>,
    realtime: Arc<dyn RealtimeStore>,
    notifications: NotificationService,
}

impl ChatService {
    pub fn new(state: &AppState) -> Self {
        Self {
            chat: state.repos.chat.clone(),
            profiles: state.repos.profiles.clone(),
            realtime: state.realtime.clone(),
            notifications: NotificationService::new(state),
        }
    }

    pub async fn get_or_create_conversation(&self, uid: &str, target: &str) -> Result<Conversation> {
        if uid == target {
            return Err(AppError::BadRequest(
                "Cannot start a conversation with yourself".to_string(),
            ));
        }
        let conversation = self.chat.get_or_create_conversation(uid, target).await?;
        debug!(conversation_id = %conversation.id, "Conversation resolved");
        Ok(conversation)
    }

    pub async fn start(&self, uid: &str, target: &str) -> Result<Conversation> {
        self.get_or_create_conversation(uid, target).await
    }

    async fn participant_conversation(&self, id: ObjectId, uid: &str) -> Result<Conversation> {
        let conversation = self
            .chat
            .find_conversation(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Conversation not found".to_string()))?;
        if !conversation.has_participant(uid) {
            return Err(AppError::Forbidden);
        }
        Ok(conversation)
    }

    pub async fn send(&self, uid: &str, input: SendMessage) -> Result<Message> {
        input.validate()?;
        let conversation = self
            .get_or_create_conversation(uid, &input.target_id)
            .await?;

        let message = Message::new(
            conversation.id,
            uid,
            input.content,
            input.message_type,
            input.image_url,
        );
        self.chat
            .set_last_message(conversation.id, message.preview(), message.created_at)
            .await?;
        let message = self.chat.insert_message(message).await?;

        let path = format!("{}/{}", messages_path(conversation.id), message.id.to_hex());
        if let Err(e) = self.realtime.set(&path, mirror_payload(&message)).await {
            warn!(%path, error = %e, "Failed to mirror message");
        }

        let sender_name = self
            .profiles
            .find_by_user(uid)
            .await?
            .map(|p| p.name)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "Someone".to_string());
        let conversation_id = conversation.id.to_hex();
        self.notifications
            .send_notification(
                &input.target_id,
                &sender_name,
                message.preview(),
                notification_data(&[("type", "chat"), ("conversationId", &conversation_id)]),
            )
            .await;

        Ok(message)
    }

    /// Mark everything the other participant sent as seen, returning how
    /// many stored messages changed.
    pub async fn mark_read(&self, id: ObjectId, uid: &str) -> Result<u64> {
        self.participant_conversation(id, uid).await?;
        let modified = self.chat.mark_read(id, uid).await?;

        let path = messages_path(id);
        match self.realtime.get(&path).await {
            Ok(Some(messages)) => {
                if let Some(updates) = seen_updates(&messages, uid) {
                    if let Err(e) = self.realtime.update(&path, updates).await {
                        warn!(%path, error = %e, "Failed to mirror read receipts");
                    }
                }
            }
            Ok(None) => {}
            Err(e) => warn!(%path, error = %e, "Failed to read mirrored messages"),
        }

        Ok(modified)
    }

    pub async fn conversations(&self, uid: &str) -> Result<Vec<ConversationView>> {
        let conversations = self.chat.conversations_for(uid).await?;
        let others: Vec<String> = conversations
            .iter()
            .filter_map(|c| c.other_participant(uid))
            .map(String::from)
            .collect();
        let profiles = self.profiles.find_by_users(&others).await?;
        let profile_of = |id: &str| profiles.iter().find(|p| p.user_id == id);

        Ok(conversations
            .into_iter()
            .map(|conversation| {
                let other = conversation.other_participant(uid).unwrap_or_default().to_string();
                let profile = profile_of(&other);
                ConversationView {
                    other_name: profile
                        .map(|p| p.name.clone())
                        .filter(|n| !n.is_empty())
                        .unwrap_or_else(|| "Unknown User".to_string()),
                    other_photo: profile
                        .and_then(Profile::first_photo)
                        .unwrap_or_default()
                        .to_string(),
                    other_user_id: other,
                    conversation,
                }
            })
            .collect())
    }

    pub async fn messages(&self, id: ObjectId, uid: &str) -> Result<Vec<Message>> {
        self.participant_conversation(id, uid).await?;
        self.chat.messages(id, MESSAGE_PAGE).await
    }
}
