use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::profile::ProfileResponse;
use crate::error::Result;
use crate::middleware::AuthUser;
use crate::models::SwipeAction;
use crate::services::{ConnectService, SwipeOutcome};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/candidates", get(candidates))
        .route("/swipe", post(swipe))
}

async fn candidates(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<ProfileResponse>>> {
    let profiles = ConnectService::new(&state).candidates(&auth.uid).await?;
    Ok(Json(profiles.into_iter().map(Into::into).collect()))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SwipeRequest {
    #[validate(length(min = 1))]
    pub target_id: String,
    pub action: SwipeAction,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwipeResponse {
    #[serde(rename = "match")]
    pub matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<String>,
}

impl From<SwipeOutcome> for SwipeResponse {
    fn from(outcome: SwipeOutcome) -> Self {
        Self {
            matched: outcome.matched,
            match_id: outcome.match_id.map(|id| id.to_hex()),
            conversation_id: outcome.conversation_id.map(|id| id.to_hex()),
            users: outcome.users,
        }
    }
}

async fn swipe(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<SwipeRequest>,
) -> Result<Json<SwipeResponse>> {
    payload.validate()?;
    let outcome = ConnectService::new(&state)
        .swipe(&auth.uid, &payload.target_id, payload.action)
        .await?;
    Ok(Json(outcome.into()))
}
