use async_trait::async_trait;
use bson::{doc, oid::ObjectId, DateTime};
use mongodb::{options::ReturnDocument, Collection};

use super::collect;
use crate::db::Database;
use crate::error::{is_duplicate_key, AppError, Result};
use crate::models::{
    chat::{CONVERSATION_COLLECTION, MESSAGE_COLLECTION},
    Conversation, Message, MessageStatus,
};
use crate::repository::ChatRepository;

pub struct MongoChatRepository {
    conversations: Collection<Conversation>,
    messages: Collection<Message>,
}

impl MongoChatRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            conversations: db.collection(CONVERSATION_COLLECTION),
            messages: db.collection(MESSAGE_COLLECTION),
        }
    }
}

#[async_trait]
impl ChatRepository for MongoChatRepository {
    async fn get_or_create_conversation(&self, a: &str, b: &str) -> Result<Conversation> {
        let candidate = Conversation::new(a, b);
        let filter = doc! { "pairKey": candidate.pair_key.as_str() };
        let mut on_insert = bson::to_document(&candidate)?;
        on_insert.remove("pairKey");

        let upserted = self
            .conversations
            .find_one_and_update(filter.clone(), doc! { "$setOnInsert": on_insert })
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await;
        match upserted {
            Ok(Some(c)) => Ok(c),
            Err(e) if is_duplicate_key(&e) => self
                .conversations
                .find_one(filter)
                .await?
                .ok_or_else(|| {
                    AppError::Internal(anyhow::anyhow!("conversation vanished after conflict"))
                }),
            Ok(None) => Err(AppError::Internal(anyhow::anyhow!(
                "conversation upsert returned nothing"
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_conversation(&self, id: ObjectId) -> Result<Option<Conversation>> {
        Ok(self.conversations.find_one(doc! { "_id": id }).await?)
    }

    async fn set_last_message(&self, id: ObjectId, text: &str, at: DateTime) -> Result<()> {
        self.conversations
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "lastMessage": text, "lastMessageAt": at, "updatedAt": at } },
            )
            .await?;
        Ok(())
    }

    async fn conversations_for(&self, uid: &str) -> Result<Vec<Conversation>> {
        let cursor = self
            .conversations
            .find(doc! { "participants": uid })
            .sort(doc! { "lastMessageAt": -1 })
            .await?;
        collect(cursor).await
    }

    async fn insert_message(&self, message: Message) -> Result<Message> {
        self.messages.insert_one(&message).await?;
        Ok(message)
    }

    async fn messages(&self, conversation_id: ObjectId, limit: i64) -> Result<Vec<Message>> {
        let cursor = self
            .messages
            .find(doc! { "conversationId": conversation_id })
            .sort(doc! { "createdAt": 1 })
            .limit(limit)
            .await?;
        collect(cursor).await
    }

    async fn mark_read(&self, conversation_id: ObjectId, reader: &str) -> Result<u64> {
        let result = self
            .messages
            .update_many(
                doc! {
                    "conversationId": conversation_id,
                    "senderId": { "$ne": reader },
                    "read": false,
                },
                doc! {
                    "$set": {
                        "read": true,
                        "status": MessageStatus::Seen.as_str(),
                        "updatedAt": DateTime::now(),
                    }
                },
            )
            .await?;
        Ok(result.modified_count)
    }
}
