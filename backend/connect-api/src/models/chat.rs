use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use super::connect::pair_key;

pub const CONVERSATION_COLLECTION: &str = "conversations";
pub const MESSAGE_COLLECTION: &str = "messages";

/// Text shown as the conversation preview for image messages
pub const PHOTO_PREVIEW: &str = "Sent a photo";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub participants: Vec<String>,
    #[serde(default)]
    pub pair_key: String,
    #[serde(default)]
    pub last_message: String,
    pub last_message_at: DateTime,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Conversation {
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        let (a, b) = (a.into(), b.into());
        let now = DateTime::now();
        Self {
            id: ObjectId::new(),
            pair_key: pair_key(&a, &b),
            participants: vec![a, b],
            last_message: String::new(),
            last_message_at: now,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_participant(&self, uid: &str) -> bool {
        self.participants.iter().any(|p| p == uid)
    }

    /// The participant that is not `uid`
    pub fn other_participant(&self, uid: &str) -> Option<&str> {
        self.participants
            .iter()
            .map(String::as_str)
            .find(|p| *p != uid)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Text,
    Image,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Text => "text",
            MessageType::Image => "image",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    #[default]
    Sent,
    Delivered,
    Seen,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Sent => "sent",
            MessageStatus::Delivered => "delivered",
            MessageStatus::Seen => "seen",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub conversation_id: ObjectId,
    pub sender_id: String,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "type", default)]
    pub message_type: MessageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub status: MessageStatus,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Message {
    pub fn new(
        conversation_id: ObjectId,
        sender_id: impl Into<String>,
        content: impl Into<String>,
        message_type: MessageType,
        image_url: Option<String>,
    ) -> Self {
        let now = DateTime::now();
        Self {
            id: ObjectId::new(),
            conversation_id,
            sender_id: sender_id.into(),
            content: content.into(),
            message_type,
            image_url,
            status: MessageStatus::Sent,
            read: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Conversation preview text for this message
    pub fn preview(&self) -> &str {
        match self.message_type {
            MessageType::Image => PHOTO_PREVIEW,
            MessageType::Text => &self.content,
        }
    }
}
