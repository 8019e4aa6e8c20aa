use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::Validate;

use crate::error::Result;
use crate::middleware::AuthUser;
use crate::models::{Conversation, Message, MessageStatus, MessageType};
use crate::services::{ChatService, ConversationView, SendMessage};
use crate::utils::{format_datetime, parse_object_id};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/start", post(start))
        .route("/send", post(send))
        .route("/read/:conversation_id", post(mark_read))
        .route("/conversations", get(conversations))
        .route("/messages/:conversation_id", get(messages))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub participants: Vec<String>,
    pub last_message: String,
    pub last_message_at: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Conversation> for ConversationResponse {
    fn from(c: Conversation) -> Self {
        Self {
            id: c.id.to_hex(),
            participants: c.participants,
            last_message: c.last_message,
            last_message_at: format_datetime(c.last_message_at),
            created_at: format_datetime(c.created_at),
            updated_at: format_datetime(c.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub content: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub image_url: Option<String>,
    pub status: MessageStatus,
    pub read: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Message> for MessageResponse {
    fn from(m: Message) -> Self {
        Self {
            id: m.id.to_hex(),
            conversation_id: m.conversation_id.to_hex(),
            sender_id: m.sender_id,
            content: m.content,
            message_type: m.message_type,
            image_url: m.image_url,
            status: m.status,
            read: m.read,
            created_at: format_datetime(m.created_at),
            updated_at: format_datetime(m.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OtherUser {
    pub id: String,
    pub name: String,
    pub photo: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: String,
    pub last_message: String,
    pub last_message_at: String,
    pub other_user: OtherUser,
}

impl From<ConversationView> for ConversationSummary {
    fn from(view: ConversationView) -> Self {
        Self {
            id: view.conversation.id.to_hex(),
            last_message: view.conversation.last_message,
            last_message_at: format_datetime(view.conversation.last_message_at),
            other_user: OtherUser {
                id: view.other_user_id,
                name: view.other_name,
                photo: view.other_photo,
            },
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StartChatRequest {
    #[validate(length(min = 1))]
    pub target_id: String,
}

async fn start(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<StartChatRequest>,
) -> Result<Json<ConversationResponse>> {
    payload.validate()?;
    let conversation = ChatService::new(&state)
        .start(&auth.uid, &payload.target_id)
        .await?;
    Ok(Json(conversation.into()))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[validate(length(min = 1))]
    pub target_id: String,
    #[validate(length(max = 5000))]
    #[serde(default)]
    pub content: String,
    #[serde(default, rename = "type")]
    pub message_type: MessageType,
    pub image_url: Option<String>,
}

async fn send(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<Json<MessageResponse>> {
    payload.validate()?;
    let message = ChatService::new(&state)
        .send(
            &auth.uid,
            SendMessage {
                target_id: payload.target_id,
                content: payload.content,
                message_type: payload.message_type,
                image_url: payload.image_url,
            },
        )
        .await?;
    Ok(Json(message.into()))
}

async fn mark_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(conversation_id): Path<String>,
) -> Result<Json<Value>> {
    let id = parse_object_id(&conversation_id, "conversation")?;
    ChatService::new(&state).mark_read(id, &auth.uid).await?;
    Ok(Json(json!({ "success": true })))
}

async fn conversations(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<ConversationSummary>>> {
    let views = ChatService::new(&state).conversations(&auth.uid).await?;
    Ok(Json(views.into_iter().map(Into::into).collect()))
}

async fn messages(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(conversation_id): Path<String>,
) -> Result<Json<Vec<MessageResponse>>> {
    let id = parse_object_id(&conversation_id, "conversation")?;
    let messages = ChatService::new(&state).messages(id, &auth.uid).await?;
    Ok(Json(messages.into_iter().map(Into::into).collect()))
}
