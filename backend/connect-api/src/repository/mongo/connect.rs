use async_trait::async_trait;
use bson::{doc, oid::ObjectId, DateTime};
use mongodb::{options::ReturnDocument, Collection};

use super::collect;
use crate::db::Database;
use crate::error::{is_duplicate_key, AppError, Result};
use crate::models::{
    connect::{MATCH_COLLECTION, SWIPE_COLLECTION},
    Match, Swipe, SwipeAction,
};
use crate::repository::ConnectRepository;

pub struct MongoConnectRepository {
    swipes: Collection<Swipe>,
    matches: Collection<Match>,
}

impl MongoConnectRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            swipes: db.collection(SWIPE_COLLECTION),
            matches: db.collection(MATCH_COLLECTION),
        }
    }
}

#[async_trait]
impl ConnectRepository for MongoConnectRepository {
    async fn upsert_swipe(&self, swiper: &str, target: &str, action: SwipeAction) -> Result<Swipe> {
        let now = DateTime::now();
        self.swipes
            .find_one_and_update(
                doc! { "swiperId": swiper, "targetId": target },
                doc! {
                    "$set": { "action": action.as_str(), "updatedAt": now },
                    "$setOnInsert": { "_id": ObjectId::new(), "createdAt": now },
                },
            )
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("swipe upsert returned nothing")))
    }

    async fn find_swipe(&self, swiper: &str, target: &str) -> Result<Option<Swipe>> {
        Ok(self
            .swipes
            .find_one(doc! { "swiperId": swiper, "targetId": target })
            .await?)
    }

    async fn swiped_targets(
        &self,
        swiper: &str,
        action: Option<SwipeAction>,
    ) -> Result<Vec<String>> {
        let mut filter = doc! { "swiperId": swiper };
        if let Some(action) = action {
            filter.insert("action", action.as_str());
        }
        let swipes = collect(self.swipes.find(filter).await?).await?;
        Ok(swipes.into_iter().map(|s| s.target_id).collect())
    }

    async fn get_or_create_match(&self, a: &str, b: &str) -> Result<Match> {
        let candidate = Match::new(a, b);
        let filter = doc! { "pairKey": candidate.pair_key.as_str() };
        let mut on_insert = bson::to_document(&candidate)?;
        on_insert.remove("pairKey");

        let upserted = self
            .matches
            .find_one_and_update(filter.clone(), doc! { "$setOnInsert": on_insert })
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await;
        match upserted {
            Ok(Some(m)) => Ok(m),
            // A concurrent upsert for the same pair won the unique index
            Err(e) if is_duplicate_key(&e) => self
                .matches
                .find_one(filter)
                .await?
                .ok_or_else(|| AppError::Internal(anyhow::anyhow!("match vanished after conflict"))),
            Ok(None) => Err(AppError::Internal(anyhow::anyhow!("match upsert returned nothing"))),
            Err(e) => Err(e.into()),
        }
    }

    async fn set_match_conversation(
        &self,
        id: ObjectId,
        conversation_id: ObjectId,
    ) -> Result<()> {
        self.matches
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "conversationId": conversation_id, "updatedAt": DateTime::now() } },
            )
            .await?;
        Ok(())
    }
}
