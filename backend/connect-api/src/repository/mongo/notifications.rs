use async_trait::async_trait;
use bson::{doc, oid::ObjectId, DateTime};
use mongodb::{options::ReturnDocument, Collection};

use super::collect;
use crate::db::Database;
use crate::error::Result;
use crate::models::{notification::NOTIFICATION_COLLECTION, Notification};
use crate::repository::NotificationRepository;

pub struct MongoNotificationRepository {
    notifications: Collection<Notification>,
}

impl MongoNotificationRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            notifications: db.collection(NOTIFICATION_COLLECTION),
        }
    }
}

#[async_trait]
impl NotificationRepository for MongoNotificationRepository {
    async fn insert(&self, notification: Notification) -> Result<Notification> {
        self.notifications.insert_one(&notification).await?;
        Ok(notification)
    }

    async fn list_for_user(&self, uid: &str, limit: i64) -> Result<Vec<Notification>> {
        let cursor = self
            .notifications
            .find(doc! { "userId": uid })
            .sort(doc! { "createdAt": -1 })
            .limit(limit)
            .await?;
        collect(cursor).await
    }

    async fn mark_read(&self, id: ObjectId, uid: &str) -> Result<Option<Notification>> {
        Ok(self
            .notifications
            .find_one_and_update(
                doc! { "_id": id, "userId": uid },
                doc! { "$set": { "isRead": true, "updatedAt": DateTime::now() } },
            )
            .return_document(ReturnDocument::After)
            .await?)
    }

    async fn mark_all_read(&self, uid: &str) -> Result<u64> {
        let result = self
            .notifications
            .update_many(
                doc! { "userId": uid, "isRead": false },
                doc! { "$set": { "isRead": true, "updatedAt": DateTime::now() } },
            )
            .await?;
        Ok(result.modified_count)
    }
}
