use async_trait::async_trait;
use bson::{doc, DateTime};
use mongodb::{options::ReturnDocument, Collection};

use super::collect;
use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{profile::PROFILE_COLLECTION, Profile, ProfileUpdate};
use crate::repository::ProfileRepository;

pub struct MongoProfileRepository {
    profiles: Collection<Profile>,
}

impl MongoProfileRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            profiles: db.collection(PROFILE_COLLECTION),
        }
    }
}

#[async_trait]
impl ProfileRepository for MongoProfileRepository {
    async fn find_by_user(&self, uid: &str) -> Result<Option<Profile>> {
        Ok(self.profiles.find_one(doc! { "userId": uid }).await?)
    }

    async fn find_by_users(&self, uids: &[String]) -> Result<Vec<Profile>> {
        if uids.is_empty() {
            return Ok(Vec::new());
        }
        let cursor = self
            .profiles
            .find(doc! { "userId": { "$in": uids.to_vec() } })
            .await?;
        collect(cursor).await
    }

    async fn upsert(&self, uid: &str, update: ProfileUpdate) -> Result<Profile> {
        let set = update.set_document(DateTime::now())?;
        let on_insert = update.insert_defaults(uid, &set)?;

        self.profiles
            .find_one_and_update(
                doc! { "userId": uid },
                doc! { "$set": set, "$setOnInsert": on_insert },
            )
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("profile upsert returned nothing")))
    }

    async fn add_friend(&self, uid: &str, friend_uid: &str) -> Result<()> {
        self.profiles
            .update_one(
                doc! { "userId": uid },
                doc! {
                    "$addToSet": { "friendIds": friend_uid },
                    "$set": { "updatedAt": DateTime::now() },
                },
            )
            .await?;
        Ok(())
    }

    async fn sample_excluding(&self, exclude: &[String], size: i64) -> Result<Vec<Profile>> {
        let pipeline = vec![
            doc! { "$match": { "userId": { "$nin": exclude.to_vec() } } },
            doc! { "$sample": { "size": size } },
        ];
        let cursor = self.profiles.aggregate(pipeline).await?;
        collect(cursor.with_type::<Profile>()).await
    }
}
