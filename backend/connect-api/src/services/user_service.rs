// User service - account lifecycle and privacy-filtered public profiles
use bson::DateTime;
use serde::Serialize;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::{
    is_valid_department, prepend_photo, PrivacyLevel, PrivacySettings, Profile, ProfileUpdate, SwipeAction,
    User, UserStatus, UserUpdate, VerificationUpdate,
};
use crate::repository::{ConnectRepository, PostRepository, ProfileRepository, UserRepository};
use crate::utils::format_datetime;
use crate::AppState;

/// The caller's own account with whatever profile they have
#[derive(Debug, Clone)]
pub struct AccountView {
    pub user: User,
    pub profile: Option<Profile>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    None,
    Pending,
    Friend,
}

/// Another user's profile as seen by the requester
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub user_id: String,
    pub name: String,
    pub photo: String,
    pub cover_photo: String,
    pub posts_count: u64,
    pub friends_count: usize,
    pub is_verified: bool,
    pub status: UserStatus,
    pub is_friend: bool,
    pub is_self: bool,
    pub connection_status: ConnectionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interests: Option<Vec<String>>,
    pub linkedin_url: String,
    pub facebook_url: String,
    pub joined_at: String,
}

impl PublicProfile {
    pub fn build(
        user: &User,
        profile: Option<&Profile>,
        requester: &str,
        posts_count: u64,
        pending_like: bool,
    ) -> Self {
        let is_self = requester == user.firebase_uid;
        let is_friend = profile.map_or(false, |p| p.is_friend(requester));
        let connection_status = if is_friend {
            ConnectionStatus::Friend
        } else if pending_like {
            ConnectionStatus::Pending
        } else {
            ConnectionStatus::None
        };

        let default_privacy = PrivacySettings::default();
        let privacy = profile.map_or(&default_privacy, |p| &p.privacy);
        let visible = |level: PrivacyLevel| level.allows(is_self, is_friend);
        let text = |value: Option<&String>| value.cloned().unwrap_or_default();

        Self {
            user_id: user.firebase_uid.clone(),
            name: profile
                .map(|p| p.name.clone())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| "User".to_string()),
            photo: profile
                .and_then(Profile::first_photo)
                .unwrap_or_default()
                .to_string(),
            cover_photo: profile
                .and_then(|p| p.cover_photo.clone())
                .unwrap_or_default(),
            posts_count,
            friends_count: profile.map_or(0, |p| p.friend_ids.len()),
            is_verified: user.is_verified(),
            status: user.status,
            is_friend,
            is_self,
            connection_status,
            bio: visible(privacy.bio).then(|| text(profile.map(|p| &p.bio))),
            department: visible(privacy.department).then(|| text(profile.map(|p| &p.department))),
            student_id: visible(privacy.student_id).then(|| text(profile.map(|p| &p.student_id))),
            year: visible(privacy.year).then(|| text(profile.map(|p| &p.year))),
            section: visible(privacy.section).then(|| text(profile.map(|p| &p.section))),
            email: visible(privacy.email).then(|| user.email.clone()),
            location: visible(privacy.location).then(|| {
                profile
                    .and_then(|p| p.location.as_ref())
                    .and_then(|l| l.address.clone())
                    .unwrap_or_default()
            }),
            interests: visible(privacy.interests)
                .then(|| profile.map(|p| p.interests.clone()).unwrap_or_default()),
            linkedin_url: text(profile.map(|p| &p.linkedin_url)),
            facebook_url: text(profile.map(|p| &p.facebook_url)),
            joined_at: format_datetime(user.created_at),
        }
    }
}

/// Onboarding / edit-profile form
#[derive(Debug, Clone, Default)]
pub struct OnboardingProfile {
    pub name: String,
    pub department: String,
    pub bio: Option<String>,
    pub student_id: Option<String>,
    pub year: Option<String>,
    pub section: Option<String>,
    pub photo: Option<String>,
    pub cover_photo: Option<String>,
    pub linkedin_url: Option<String>,
    pub facebook_url: Option<String>,
    pub privacy: Option<PrivacySettings>,
}

pub struct UserService {
    users: Arc<dyn UserRepository>,
    profiles: Arc<dyn ProfileRepository>,
    posts: Arc<dyn PostRepository>,
    connect: Arc<dyn ConnectRepository>,
}

fn user_not_found() -> AppError {
    AppError::NotFound("User not found".to_string())
}

impl UserService {
    pub fn new(state: &AppState) -> Self {
        Self {
            users: state.repos.users.clone(),
            profiles: state.repos.profiles.clone(),
            posts: state.repos.posts.clone(),
            connect: state.repos.connect.clone(),
        }
    }

    pub async fn me(&self, uid: &str) -> Result<AccountView> {
        let user = self
            .users
            .find_by_uid(uid)
            .await?
            .ok_or_else(user_not_found)?;
        let profile = self.profiles.find_by_user(uid).await?;
        Ok(AccountView { user, profile })
    }

    pub async fn public_profile(&self, requester: &str, target: &str) -> Result<PublicProfile> {
        let user = self
            .users
            .find_by_uid(target)
            .await?
            .ok_or_else(user_not_found)?;
        let profile = self.profiles.find_by_user(target).await?;
        let posts_count = self.posts.count_by_user(target).await?;

        let is_friend = profile.as_ref().map_or(false, |p| p.is_friend(requester));
        let pending_like = if is_friend {
            false
        } else {
            self.connect
                .find_swipe(requester, target)
                .await?
                .map_or(false, |s| s.action == SwipeAction::Like)
        };

        Ok(PublicProfile::build(
            &user,
            profile.as_ref(),
            requester,
            posts_count,
            pending_like,
        ))
    }

    pub async fn sync(&self, uid: &str, email: &str) -> Result<User> {
        let user = self.users.sync(uid, email).await?;
        tracing::info!(uid, "User synced");
        Ok(user)
    }

    async fn update(&self, uid: &str, update: UserUpdate) -> Result<User> {
        self.users
            .update_by_uid(uid, update)
            .await?
            .ok_or_else(user_not_found)
    }

    pub async fn mark_welcome_seen(&self, uid: &str) -> Result<User> {
        self.update(
            uid,
            UserUpdate {
                welcome_seen: Some(true),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn update_profile(&self, uid: &str, input: OnboardingProfile) -> Result<User> {
        if !is_valid_department(&input.department) {
            return Err(AppError::BadRequest(format!(
                "Invalid department: {}",
                input.department
            )));
        }

        let photo = input.photo.filter(|p| !p.is_empty());
        let user = self
            .update(
                uid,
                UserUpdate {
                    name: Some(input.name.clone()),
                    department: Some(input.department.clone()),
                    onboarding_completed: Some(true),
                    profile_image: photo.clone(),
                    ..Default::default()
                },
            )
            .await?;

        let photos = match &photo {
            Some(photo) => {
                let existing = self
                    .profiles
                    .find_by_user(uid)
                    .await?
                    .map(|p| p.photos)
                    .unwrap_or_default();
                Some(prepend_photo(&existing, photo))
            }
            None => None,
        };

        self.profiles
            .upsert(
                uid,
                ProfileUpdate {
                    name: Some(input.name),
                    department: Some(input.department),
                    bio: Some(input.bio.unwrap_or_default()),
                    student_id: Some(input.student_id.unwrap_or_default()),
                    year: Some(input.year.unwrap_or_default()),
                    section: Some(input.section.unwrap_or_default()),
                    linkedin_url: Some(input.linkedin_url.unwrap_or_default()),
                    facebook_url: Some(input.facebook_url.unwrap_or_default()),
                    cover_photo: input.cover_photo.filter(|c| !c.is_empty()),
                    privacy: input.privacy,
                    photos,
                    interests: None,
                },
            )
            .await?;

        tracing::info!(uid, "Profile updated");
        Ok(user)
    }

    pub async fn submit_verification(
        &self,
        uid: &str,
        id_card_url: String,
        selfie_url: String,
    ) -> Result<User> {
        self.update(
            uid,
            UserUpdate {
                verification: Some(VerificationUpdate::Submitted {
                    id_card_url,
                    selfie_url,
                }),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn set_device_token(&self, uid: &str, token: String) -> Result<User> {
        self.update(
            uid,
            UserUpdate {
                notification_token: Some(token),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn set_presence(&self, uid: &str, is_online: bool) -> Result<User> {
        self.update(
            uid,
            UserUpdate {
                is_online: Some(is_online),
                last_seen: Some(DateTime::now()),
                ..Default::default()
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Location;
    use crate::testing::TestContext;

    fn onboarding(name: &str, department: &str, photo: Option<&str>) -> OnboardingProfile {
        OnboardingProfile {
            name: name.to_string(),
            department: department.to_string(),
            photo: photo.map(String::from),
            ..Default::default()
        }
    }

    fn private_profile(uid: &str) -> Profile {
        let mut profile = Profile::new(uid);
        profile.name = "Nadia".into();
        profile.bio = "bio".into();
        profile.department = "Law".into();
        profile.student_id = "2021-1-60".into();
        profile.location = Some(Location {
            lat: 22.8,
            lng: 89.5,
            address: Some("Khulna".into()),
        });
        profile.privacy.bio = PrivacyLevel::Private;
        profile.privacy.student_id = PrivacyLevel::Friends;
        profile.privacy.email = PrivacyLevel::Friends;
        profile
    }

    #[test]
    fn test_public_profile_hides_private_fields_from_strangers() {
        let user = User::new("nadia", "nadia@nwu.ac.bd");
        let profile = private_profile("nadia");
        let view = PublicProfile::build(&user, Some(&profile), "stranger", 2, false);

        assert!(view.bio.is_none());
        assert!(view.student_id.is_none());
        assert!(view.email.is_none());
        assert_eq!(view.department.as_deref(), Some("Law"));
        assert_eq!(view.location.as_deref(), Some("Khulna"));
        assert_eq!(view.connection_status, ConnectionStatus::None);
        assert!(!view.is_self);
        assert_eq!(view.posts_count, 2);
    }

    #[test]
    fn test_public_profile_friends_see_friend_fields() {
        let user = User::new("nadia", "nadia@nwu.ac.bd");
        let mut profile = private_profile("nadia");
        profile.friend_ids.push("friend".into());
        let view = PublicProfile::build(&user, Some(&profile), "friend", 0, false);

        assert!(view.is_friend);
        assert_eq!(view.connection_status, ConnectionStatus::Friend);
        assert_eq!(view.student_id.as_deref(), Some("2021-1-60"));
        assert_eq!(view.email.as_deref(), Some("nadia@nwu.ac.bd"));
        assert!(view.bio.is_none());
        assert_eq!(view.friends_count, 1);
    }

    #[test]
    fn test_public_profile_owner_sees_everything() {
        let user = User::new("nadia", "nadia@nwu.ac.bd");
        let profile = private_profile("nadia");
        let view = PublicProfile::build(&user, Some(&profile), "nadia", 0, false);
        assert!(view.is_self);
        assert_eq!(view.bio.as_deref(), Some("bio"));
    }

    #[test]
    fn test_public_profile_without_profile() {
        let user = User::new("ghost", "ghost@nwu.ac.bd");
        let view = PublicProfile::build(&user, None, "someone", 0, true);
        assert_eq!(view.name, "User");
        assert_eq!(view.photo, "");
        assert_eq!(view.connection_status, ConnectionStatus::Pending);
        assert_eq!(view.department.as_deref(), Some(""));
        assert!(!view.is_verified);
    }

    #[tokio::test]
    async fn test_pending_connection_status_from_like() {
        let ctx = TestContext::new();
        ctx.user("a").await;
        ctx.user("b").await;
        ctx.state
            .repos
            .connect
            .upsert_swipe("a", "b", SwipeAction::Like)
            .await
            .unwrap();
        let view = UserService::new(&ctx.state)
            .public_profile("a", "b")
            .await
            .unwrap();
        assert_eq!(view.connection_status, ConnectionStatus::Pending);
    }

    #[tokio::test]
    async fn test_public_profile_unknown_user() {
        let ctx = TestContext::new();
        let result = UserService::new(&ctx.state).public_profile("a", "nobody").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_profile_sets_user_and_profile() {
        let ctx = TestContext::new();
        ctx.user("a").await;
        let service = UserService::new(&ctx.state);

        let user = service
            .update_profile("a", onboarding("Arif", "CSE", Some("p1")))
            .await
            .unwrap();
        assert!(user.onboarding_completed);
        assert_eq!(user.name.as_deref(), Some("Arif"));
        assert_eq!(user.profile_image.as_deref(), Some("p1"));

        let profile = ctx.state.repos.profiles.find_by_user("a").await.unwrap().unwrap();
        assert_eq!(profile.name, "Arif");
        assert_eq!(profile.department, "CSE");
        assert_eq!(profile.photos, vec!["p1".to_string()]);
        assert_eq!(profile.bio, "");
    }

    #[tokio::test]
    async fn test_update_profile_prepends_photos() {
        let ctx = TestContext::new();
        ctx.user("a").await;
        let service = UserService::new(&ctx.state);
        for photo in ["p1", "p2", "p3", "p4", "p5", "p6", "p6"] {
            service
                .update_profile("a", onboarding("Arif", "CSE", Some(photo)))
                .await
                .unwrap();
        }
        let profile = ctx.state.repos.profiles.find_by_user("a").await.unwrap().unwrap();
        assert_eq!(profile.photos, vec!["p6", "p5", "p4", "p3", "p2"]);
    }

    #[tokio::test]
    async fn test_update_profile_rejects_unknown_department() {
        let ctx = TestContext::new();
        ctx.user("a").await;
        let result = UserService::new(&ctx.state)
            .update_profile("a", onboarding("Arif", "Astrology", None))
            .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_update_profile_unknown_user() {
        let ctx = TestContext::new();
        let result = UserService::new(&ctx.state)
            .update_profile("nobody", onboarding("Arif", "CSE", None))
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_presence_and_device_token() {
        let ctx = TestContext::new();
        ctx.user("a").await;
        let service = UserService::new(&ctx.state);

        let user = service.set_presence("a", true).await.unwrap();
        assert!(user.is_online);
        assert!(user.last_seen.is_some());

        let user = service.set_device_token("a", "fcm-123".into()).await.unwrap();
        assert_eq!(user.notification_token.as_deref(), Some("fcm-123"));
    }

    #[tokio::test]
    async fn test_welcome_and_verification() {
        let ctx = TestContext::new();
        ctx.user("a").await;
        let service = UserService::new(&ctx.state);

        assert!(service.mark_welcome_seen("a").await.unwrap().welcome_seen);

        ctx.state
            .repos
            .users
            .update_by_uid(
                "a",
                UserUpdate {
                    verification: Some(VerificationUpdate::Rejected {
                        reason: Some("blurry".into()),
                    }),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let user = service
            .submit_verification("a", "id.png".into(), "me.png".into())
            .await
            .unwrap();
        assert!(user.verification.submitted);
        assert_eq!(user.verification.id_card_url.as_deref(), Some("id.png"));
        assert!(user.verification.rejection_reason.is_none());
    }

    #[tokio::test]
    async fn test_sync_creates_pending_user() {
        let ctx = TestContext::new();
        let service = UserService::new(&ctx.state);
        let user = service.sync("new", "new@nwu.ac.bd").await.unwrap();
        assert_eq!(user.status, UserStatus::Pending);
        assert!(!user.verification.submitted);
        let again = service.sync("new", "new@nwu.ac.bd").await.unwrap();
        assert_eq!(again.id, user.id);
    }
}
