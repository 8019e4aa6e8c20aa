use axum::{
    extract::{Path, State},
    routing::{get, put},
    Extension, Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::error::Result;
use crate::middleware::AuthUser;
use crate::models::Notification;
use crate::services::NotificationService;
use crate::utils::{format_datetime, parse_object_id};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/read-all", put(mark_all_read))
        .route("/:id/read", put(mark_read))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub body: String,
    pub data: BTreeMap<String, String>,
    pub is_read: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Notification> for NotificationResponse {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id.to_hex(),
            user_id: n.user_id,
            title: n.title,
            body: n.body,
            data: n.data,
            is_read: n.is_read,
            created_at: format_datetime(n.created_at),
            updated_at: format_datetime(n.updated_at),
        }
    }
}

async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<NotificationResponse>>> {
    let notifications = NotificationService::new(&state).list(&auth.uid).await?;
    Ok(Json(notifications.into_iter().map(Into::into).collect()))
}

async fn mark_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<NotificationResponse>> {
    let id = parse_object_id(&id, "notification")?;
    let notification = NotificationService::new(&state)
        .mark_read(id, &auth.uid)
        .await?;
    Ok(Json(notification.into()))
}

async fn mark_all_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Value>> {
    let modified = NotificationService::new(&state)
        .mark_all_read(&auth.uid)
        .await?;
    Ok(Json(json!({ "success": true, "modifiedCount": modified })))
}
