use async_trait::async_trait;
use bson::{doc, oid::ObjectId, DateTime};
use mongodb::{options::ReturnDocument, Collection};

use super::collect;
use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{user::USER_COLLECTION, User, UserUpdate};
use crate::repository::UserRepository;

pub struct MongoUserRepository {
    users: Collection<User>,
}

impl MongoUserRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            users: db.collection(USER_COLLECTION),
        }
    }
}

#[async_trait]
impl UserRepository for MongoUserRepository {
    async fn find_by_uid(&self, uid: &str) -> Result<Option<User>> {
        Ok(self.users.find_one(doc! { "firebaseUid": uid }).await?)
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<User>> {
        Ok(self.users.find_one(doc! { "_id": id }).await?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.users.find_one(doc! { "email": email }).await?)
    }

    async fn find_by_uids(&self, uids: &[String]) -> Result<Vec<User>> {
        if uids.is_empty() {
            return Ok(Vec::new());
        }
        let cursor = self
            .users
            .find(doc! { "firebaseUid": { "$in": uids.to_vec() } })
            .await?;
        collect(cursor).await
    }

    async fn sync(&self, uid: &str, email: &str) -> Result<User> {
        let now = DateTime::now();
        let mut on_insert = bson::to_document(&User::new(uid, email))?;
        for key in ["firebaseUid", "email", "updatedAt"] {
            on_insert.remove(key);
        }

        self.users
            .find_one_and_update(
                doc! { "firebaseUid": uid },
                doc! {
                    "$set": { "email": email, "updatedAt": now },
                    "$setOnInsert": on_insert,
                },
            )
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("user upsert returned nothing")))
    }

    async fn update_by_uid(&self, uid: &str, update: UserUpdate) -> Result<Option<User>> {
        Ok(self
            .users
            .find_one_and_update(
                doc! { "firebaseUid": uid },
                update.to_update_document(DateTime::now()),
            )
            .return_document(ReturnDocument::After)
            .await?)
    }

    async fn update_by_id(&self, id: ObjectId, update: UserUpdate) -> Result<Option<User>> {
        Ok(self
            .users
            .find_one_and_update(doc! { "_id": id }, update.to_update_document(DateTime::now()))
            .return_document(ReturnDocument::After)
            .await?)
    }

    async fn list(&self, skip: u64, limit: i64) -> Result<Vec<User>> {
        let cursor = self
            .users
            .find(doc! {})
            .sort(doc! { "createdAt": -1 })
            .skip(skip)
            .limit(limit)
            .await?;
        collect(cursor).await
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.users.count_documents(doc! {}).await?)
    }

    async fn count_online(&self) -> Result<u64> {
        Ok(self.users.count_documents(doc! { "isOnline": true }).await?)
    }

    async fn pending_verifications(&self) -> Result<Vec<User>> {
        let cursor = self
            .users
            .find(doc! { "status": "pending", "verification.submitted": true })
            .sort(doc! { "updatedAt": -1 })
            .await?;
        collect(cursor).await
    }

    async fn count_pending_verifications(&self) -> Result<u64> {
        Ok(self
            .users
            .count_documents(doc! { "status": "pending", "verification.submitted": true })
            .await?)
    }

    async fn count_created_between(&self, start: DateTime, end: DateTime) -> Result<u64> {
        Ok(self
            .users
            .count_documents(doc! { "createdAt": { "$gte": start, "$lt": end } })
            .await?)
    }

    async fn list_not_banned(&self) -> Result<Vec<User>> {
        let cursor = self
            .users
            .find(doc! { "status": { "$ne": "banned" } })
            .await?;
        collect(cursor).await
    }
}
