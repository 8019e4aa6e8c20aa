use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::{is_valid_department, Profile, ProfileUpdate};
use crate::repository::ProfileRepository;
use crate::AppState;

/// Basic profile edit (`PUT /profile`)
#[derive(Debug, Clone, Default)]
pub struct ProfileInput {
    pub name: String,
    pub bio: String,
    pub department: String,
    pub interests: Option<Vec<String>>,
}

pub struct ProfileService {
    profiles: Arc<dyn ProfileRepository>,
}

impl ProfileService {
    pub fn new(state: &AppState) -> Self {
        Self {
            profiles: state.repos.profiles.clone(),
        }
    }

    pub async fn get(&self, uid: &str) -> Result<Profile> {
        self.profiles
            .find_by_user(uid)
            .await?
            .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))
    }

    pub async fn upsert(&self, uid: &str, input: ProfileInput) -> Result<Profile> {
        if !is_valid_department(&input.department) {
            return Err(AppError::BadRequest(format!(
                "Invalid department: {}",
                input.department
            )));
        }

        let profile = self
            .profiles
            .upsert(
                uid,
                ProfileUpdate {
                    name: Some(input.name),
                    bio: Some(input.bio),
                    department: Some(input.department),
                    interests: input.interests,
                    ..Default::default()
                },
            )
            .await?;
        tracing::debug!(uid, "Profile saved");
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestContext;

    fn input(name: &str, department: &str) -> ProfileInput {
        ProfileInput {
            name: name.to_string(),
            bio: "hello".to_string(),
            department: department.to_string(),
            interests: None,
        }
    }

    #[tokio::test]
    async fn test_get_missing_profile() {
        let ctx = TestContext::new();
        let result = ProfileService::new(&ctx.state).get("nobody").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_upsert_creates_then_updates() {
        let ctx = TestContext::new();
        let service = ProfileService::new(&ctx.state);

        let created = service.upsert("a", input("Arif", "CSE")).await.unwrap();
        assert_eq!(created.user_id, "a");
        assert_eq!(created.bio, "hello");

        let mut update = input("Arif Hossain", "EEE");
        update.interests = Some(vec!["chess".into()]);
        let updated = service.upsert("a", update).await.unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.name, "Arif Hossain");
        assert_eq!(updated.department, "EEE");
        assert_eq!(updated.interests, vec!["chess".to_string()]);

        assert_eq!(service.get("a").await.unwrap().name, "Arif Hossain");
    }

    #[tokio::test]
    async fn test_upsert_keeps_unlisted_fields() {
        let ctx = TestContext::new();
        let mut existing = ctx.profile("a", "Arif", "CSE").await;
        existing.photos = vec!["p1".into()];
        ctx.store.put_profile(existing).await;

        let updated = ProfileService::new(&ctx.state)
            .upsert("a", input("Arif", "CSE"))
            .await
            .unwrap();
        assert_eq!(updated.photos, vec!["p1".to_string()]);
    }

    #[tokio::test]
    async fn test_upsert_rejects_unknown_department() {
        let ctx = TestContext::new();
        let result = ProfileService::new(&ctx.state)
            .upsert("a", input("Arif", "Alchemy"))
            .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
}
