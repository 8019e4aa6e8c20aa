use axum::{extract::State, routing::get, Extension, Json, Router};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::{Location, PrivacySettings, Profile};
use crate::services::{ProfileInput, ProfileService};
use crate::utils::format_datetime;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(get_profile).put(upsert_profile))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub bio: String,
    pub interests: Vec<String>,
    pub photos: Vec<String>,
    pub cover_photo: Option<String>,
    pub location: Option<Location>,
    pub department: String,
    pub friend_ids: Vec<String>,
    pub student_id: String,
    pub year: String,
    pub section: String,
    pub linkedin_url: String,
    pub facebook_url: String,
    pub privacy: PrivacySettings,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Profile> for ProfileResponse {
    fn from(p: Profile) -> Self {
        Self {
            id: p.id.to_hex(),
            user_id: p.user_id,
            name: p.name,
            bio: p.bio,
            interests: p.interests,
            photos: p.photos,
            cover_photo: p.cover_photo,
            location: p.location,
            department: p.department,
            friend_ids: p.friend_ids,
            student_id: p.student_id,
            year: p.year,
            section: p.section,
            linkedin_url: p.linkedin_url,
            facebook_url: p.facebook_url,
            privacy: p.privacy,
            created_at: format_datetime(p.created_at),
            updated_at: format_datetime(p.updated_at),
        }
    }
}

/// `null` when the caller has not created a profile yet
async fn get_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Option<ProfileResponse>>> {
    match ProfileService::new(&state).get(&auth.uid).await {
        Ok(profile) => Ok(Json(Some(profile.into()))),
        Err(AppError::NotFound(_)) => Ok(Json(None)),
        Err(e) => Err(e),
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpsertProfileRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 500))]
    #[serde(default)]
    pub bio: String,
    pub department: String,
    pub interests: Option<Vec<String>>,
}

async fn upsert_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<UpsertProfileRequest>,
) -> Result<Json<ProfileResponse>> {
    payload.validate()?;
    let profile = ProfileService::new(&state)
        .upsert(
            &auth.uid,
            ProfileInput {
                name: payload.name,
                bio: payload.bio,
                department: payload.department,
                interests: payload.interests,
            },
        )
        .await?;
    Ok(Json(profile.into()))
}
