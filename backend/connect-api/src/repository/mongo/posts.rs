use async_trait::async_trait;
use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::{options::ReturnDocument, Collection};

use super::collect;
use crate::db::Database;
use crate::error::Result;
use crate::models::{post::POST_COLLECTION, Comment, EditRecord, FeedViewer, Post, Reply};
use crate::repository::PostRepository;

pub struct MongoPostRepository {
    posts: Collection<Post>,
}

impl MongoPostRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            posts: db.collection(POST_COLLECTION),
        }
    }

    async fn update_and_fetch(&self, filter: Document, update: Document) -> Result<Option<Post>> {
        Ok(self
            .posts
            .find_one_and_update(filter, update)
            .return_document(ReturnDocument::After)
            .await?)
    }
}

fn live_posts_of(uid: &str) -> Document {
    doc! { "userId": uid, "isArchived": { "$ne": true } }
}

#[async_trait]
impl PostRepository for MongoPostRepository {
    async fn insert(&self, post: Post) -> Result<Post> {
        self.posts.insert_one(&post).await?;
        Ok(post)
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<Post>> {
        Ok(self.posts.find_one(doc! { "_id": id }).await?)
    }

    async fn sample_visible(&self, viewer: &FeedViewer, size: i64) -> Result<Vec<Post>> {
        let pipeline = vec![
            doc! { "$match": viewer.to_filter() },
            doc! { "$sample": { "size": size } },
        ];
        let cursor = self.posts.aggregate(pipeline).await?;
        collect(cursor.with_type::<Post>()).await
    }

    async fn list_by_user(&self, uid: &str, skip: u64, limit: i64) -> Result<Vec<Post>> {
        let cursor = self
            .posts
            .find(live_posts_of(uid))
            .sort(doc! { "createdAt": -1 })
            .skip(skip)
            .limit(limit)
            .await?;
        collect(cursor).await
    }

    async fn count_by_user(&self, uid: &str) -> Result<u64> {
        Ok(self.posts.count_documents(live_posts_of(uid)).await?)
    }

    async fn set_like(&self, id: ObjectId, uid: &str, liked: bool) -> Result<Option<Post>> {
        let update = if liked {
            doc! { "$addToSet": { "likes": uid } }
        } else {
            doc! { "$pull": { "likes": uid } }
        };
        self.update_and_fetch(doc! { "_id": id }, update).await
    }

    async fn push_comment(&self, id: ObjectId, comment: Comment) -> Result<Option<Post>> {
        let comment = bson::to_bson(&comment)?;
        self.update_and_fetch(doc! { "_id": id }, doc! { "$push": { "comments": comment } })
            .await
    }

    async fn push_reply(
        &self,
        id: ObjectId,
        comment_id: ObjectId,
        reply: Reply,
    ) -> Result<Option<Post>> {
        let reply = bson::to_bson(&reply)?;
        self.update_and_fetch(
            doc! { "_id": id, "comments._id": comment_id },
            doc! { "$push": { "comments.$.replies": reply } },
        )
        .await
    }

    async fn delete_owned(&self, id: ObjectId, uid: &str) -> Result<bool> {
        let result = self
            .posts
            .delete_one(doc! { "_id": id, "userId": uid })
            .await?;
        Ok(result.deleted_count > 0)
    }

    async fn set_archived_owned(
        &self,
        id: ObjectId,
        uid: &str,
        archived: bool,
    ) -> Result<Option<Post>> {
        self.update_and_fetch(
            doc! { "_id": id, "userId": uid },
            doc! { "$set": { "isArchived": archived, "updatedAt": DateTime::now() } },
        )
        .await
    }

    async fn edit_owned(
        &self,
        id: ObjectId,
        uid: &str,
        content: &str,
        previous: EditRecord,
    ) -> Result<Option<Post>> {
        let previous = bson::to_bson(&previous)?;
        self.update_and_fetch(
            doc! { "_id": id, "userId": uid },
            doc! {
                "$push": { "editHistory": previous },
                "$set": { "content": content, "updatedAt": DateTime::now() },
            },
        )
        .await
    }
}
