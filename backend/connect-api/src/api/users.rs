use axum::{
    extract::{Path, State},
    routing::{get, patch, post, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::{PrivacySettings, User, UserRole, UserStatus, Verification};
use crate::services::{AccountView, OnboardingProfile, PublicProfile, UserService};
use crate::utils::format_datetime;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(me))
        .route("/sync", post(sync))
        .route("/welcome", patch(welcome_seen))
        .route("/profile", patch(update_profile))
        .route("/verification", patch(submit_verification))
        .route("/device-token", put(set_device_token))
        .route("/presence", post(set_presence))
        .route("/:user_id", get(public_profile))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub firebase_uid: String,
    pub email: String,
    pub status: UserStatus,
    pub role: UserRole,
    pub is_verified: bool,
    pub onboarding_completed: bool,
    pub welcome_seen: bool,
    pub name: Option<String>,
    pub department: Option<String>,
    pub bio: Option<String>,
    pub verification: Verification,
    pub linkedin_url: Option<String>,
    pub facebook_url: Option<String>,
    pub profile_image: Option<String>,
    pub is_online: bool,
    pub last_seen: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id.to_hex(),
            is_verified: u.is_verified(),
            firebase_uid: u.firebase_uid,
            email: u.email,
            status: u.status,
            role: u.role,
            onboarding_completed: u.onboarding_completed,
            welcome_seen: u.welcome_seen,
            name: u.name,
            department: u.department,
            bio: u.bio,
            verification: u.verification,
            linkedin_url: u.linkedin_url,
            facebook_url: u.facebook_url,
            profile_image: u.profile_image,
            is_online: u.is_online,
            last_seen: u.last_seen.map(format_datetime),
            created_at: format_datetime(u.created_at),
            updated_at: format_datetime(u.updated_at),
        }
    }
}

/// The caller's account merged with their profile
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub photo_url: String,
    pub student_id: String,
    pub year: String,
    pub section: String,
    pub cover_photo: String,
    pub friend_ids: Vec<String>,
}

impl From<AccountView> for MeResponse {
    fn from(view: AccountView) -> Self {
        let mut user = UserResponse::from(view.user);
        let Some(profile) = view.profile else {
            return Self {
                user,
                photo_url: String::new(),
                student_id: String::new(),
                year: String::new(),
                section: String::new(),
                cover_photo: String::new(),
                friend_ids: Vec::new(),
            };
        };

        if !profile.name.is_empty() {
            user.name = Some(profile.name.clone());
        }
        if !profile.department.is_empty() {
            user.department = Some(profile.department.clone());
        }
        if !profile.bio.is_empty() {
            user.bio = Some(profile.bio.clone());
        }
        Self {
            user,
            photo_url: profile.first_photo().unwrap_or_default().to_string(),
            student_id: profile.student_id,
            year: profile.year,
            section: profile.section,
            cover_photo: profile.cover_photo.unwrap_or_default(),
            friend_ids: profile.friend_ids,
        }
    }
}

async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<MeResponse>> {
    let view = UserService::new(&state).me(&auth.uid).await?;
    Ok(Json(view.into()))
}

async fn public_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<String>,
) -> Result<Json<PublicProfile>> {
    let profile = UserService::new(&state)
        .public_profile(&auth.uid, &user_id)
        .await?;
    Ok(Json(profile))
}

#[derive(Debug, Deserialize, Validate)]
pub struct SyncRequest {
    #[validate(email)]
    pub email: Option<String>,
}

async fn sync(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<SyncRequest>,
) -> Result<Json<UserResponse>> {
    payload.validate()?;
    let email = payload
        .email
        .or(auth.email)
        .ok_or_else(|| AppError::BadRequest("Email is required".to_string()))?;
    let user = UserService::new(&state).sync(&auth.uid, &email).await?;
    Ok(Json(user.into()))
}

async fn welcome_seen(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<UserResponse>> {
    let user = UserService::new(&state).mark_welcome_seen(&auth.uid).await?;
    Ok(Json(user.into()))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub department: String,
    #[validate(length(max = 500))]
    pub bio: Option<String>,
    #[validate(length(max = 50))]
    pub student_id: Option<String>,
    #[validate(length(max = 20))]
    pub year: Option<String>,
    #[validate(length(max = 20))]
    pub section: Option<String>,
    pub photo: Option<String>,
    pub cover_photo: Option<String>,
    pub linkedin_url: Option<String>,
    pub facebook_url: Option<String>,
    pub privacy: Option<PrivacySettings>,
}

async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>> {
    payload.validate()?;
    let input = OnboardingProfile {
        name: payload.name,
        department: payload.department,
        bio: payload.bio,
        student_id: payload.student_id,
        year: payload.year,
        section: payload.section,
        photo: payload.photo,
        cover_photo: payload.cover_photo,
        linkedin_url: payload.linkedin_url,
        facebook_url: payload.facebook_url,
        privacy: payload.privacy,
    };
    let user = UserService::new(&state)
        .update_profile(&auth.uid, input)
        .await?;
    Ok(Json(user.into()))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRequest {
    #[validate(length(min = 1))]
    pub id_card_url: String,
    #[validate(length(min = 1))]
    pub selfie_url: String,
}

async fn submit_verification(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<VerificationRequest>,
) -> Result<Json<UserResponse>> {
    payload.validate()?;
    let user = UserService::new(&state)
        .submit_verification(&auth.uid, payload.id_card_url, payload.selfie_url)
        .await?;
    Ok(Json(user.into()))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DeviceTokenRequest {
    #[validate(length(min = 1))]
    pub fcm_token: String,
}

async fn set_device_token(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<DeviceTokenRequest>,
) -> Result<Json<UserResponse>> {
    payload.validate()?;
    let user = UserService::new(&state)
        .set_device_token(&auth.uid, payload.fcm_token)
        .await?;
    Ok(Json(user.into()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceRequest {
    pub is_online: bool,
}

async fn set_presence(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<PresenceRequest>,
) -> Result<Json<UserResponse>> {
    let user = UserService::new(&state)
        .set_presence(&auth.uid, payload.is_online)
        .await?;
    Ok(Json(user.into()))
}
