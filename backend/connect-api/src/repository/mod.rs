//! Persistence seams. Every aggregate is reached through one of these
//! traits so services work the same against MongoDB and the in-memory
//! store used by tests.

#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod mongo;

use async_trait::async_trait;
use bson::{oid::ObjectId, DateTime};
use std::sync::Arc;

use crate::db::Database;
use crate::error::Result;
use crate::models::{
    AuditLog, Comment, Conversation, EditRecord, FeedViewer, Match, Message, Notification, Post,
    Profile, ProfileUpdate, Reply, Report, ReportStatus, Swipe, SwipeAction, User, UserUpdate,
};

#[cfg(any(test, feature = "test-utils"))]
pub use memory::InMemoryStore;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_uid(&self, uid: &str) -> Result<Option<User>>;

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<User>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_by_uids(&self, uids: &[String]) -> Result<Vec<User>>;

    /// Create the user on first sign-in or refresh the email.
    /// An email held by another account is a conflict.
    async fn sync(&self, uid: &str, email: &str) -> Result<User>;

    async fn update_by_uid(&self, uid: &str, update: UserUpdate) -> Result<Option<User>>;

    async fn update_by_id(&self, id: ObjectId, update: UserUpdate) -> Result<Option<User>>;

    /// Newest first
    async fn list(&self, skip: u64, limit: i64) -> Result<Vec<User>>;

    async fn count(&self) -> Result<u64>;

    async fn count_online(&self) -> Result<u64>;

    /// Pending users who have submitted verification documents
    async fn pending_verifications(&self) -> Result<Vec<User>>;

    async fn count_pending_verifications(&self) -> Result<u64>;

    async fn count_created_between(&self, start: DateTime, end: DateTime) -> Result<u64>;

    /// Every user who is not banned
    async fn list_not_banned(&self) -> Result<Vec<User>>;
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn find_by_user(&self, uid: &str) -> Result<Option<Profile>>;

    async fn find_by_users(&self, uids: &[String]) -> Result<Vec<Profile>>;

    /// Insert or update the profile for `uid`; missing fields take defaults on insert
    async fn upsert(&self, uid: &str, update: ProfileUpdate) -> Result<Profile>;

    /// Add `friend_uid` to the friend set of `uid`
    async fn add_friend(&self, uid: &str, friend_uid: &str) -> Result<()>;

    /// Random sample of profiles whose owner is not in `exclude`
    async fn sample_excluding(&self, exclude: &[String], size: i64) -> Result<Vec<Profile>>;
}

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn insert(&self, post: Post) -> Result<Post>;

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<Post>>;

    /// Random sample of posts the viewer may see
    async fn sample_visible(&self, viewer: &FeedViewer, size: i64) -> Result<Vec<Post>>;

    /// A user's non-archived posts, newest first
    async fn list_by_user(&self, uid: &str, skip: u64, limit: i64) -> Result<Vec<Post>>;

    async fn count_by_user(&self, uid: &str) -> Result<u64>;

    async fn set_like(&self, id: ObjectId, uid: &str, liked: bool) -> Result<Option<Post>>;

    async fn push_comment(&self, id: ObjectId, comment: Comment) -> Result<Option<Post>>;

    /// `None` when the post or the comment does not exist
    async fn push_reply(
        &self,
        id: ObjectId,
        comment_id: ObjectId,
        reply: Reply,
    ) -> Result<Option<Post>>;

    /// Owner-scoped mutations return `false`/`None` when `uid` is not the author
    async fn delete_owned(&self, id: ObjectId, uid: &str) -> Result<bool>;

    async fn set_archived_owned(
        &self,
        id: ObjectId,
        uid: &str,
        archived: bool,
    ) -> Result<Option<Post>>;

    async fn edit_owned(
        &self,
        id: ObjectId,
        uid: &str,
        content: &str,
        previous: EditRecord,
    ) -> Result<Option<Post>>;
}

#[async_trait]
pub trait ConnectRepository: Send + Sync {
    /// One swipe per (swiper, target); the latest action wins
    async fn upsert_swipe(&self, swiper: &str, target: &str, action: SwipeAction) -> Result<Swipe>;

    async fn find_swipe(&self, swiper: &str, target: &str) -> Result<Option<Swipe>>;

    /// Targets swiped by `swiper`, optionally only with `action`
    async fn swiped_targets(&self, swiper: &str, action: Option<SwipeAction>)
        -> Result<Vec<String>>;

    /// The match for the pair, created atomically if there is none
    async fn get_or_create_match(&self, a: &str, b: &str) -> Result<Match>;

    async fn set_match_conversation(&self, id: ObjectId, conversation_id: ObjectId)
        -> Result<()>;
}

#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// The conversation between `a` and `b`, created atomically if there is none
    async fn get_or_create_conversation(&self, a: &str, b: &str) -> Result<Conversation>;

    async fn find_conversation(&self, id: ObjectId) -> Result<Option<Conversation>>;

    async fn set_last_message(&self, id: ObjectId, text: &str, at: DateTime) -> Result<()>;

    /// Most recent first
    async fn conversations_for(&self, uid: &str) -> Result<Vec<Conversation>>;

    async fn insert_message(&self, message: Message) -> Result<Message>;

    /// Oldest first
    async fn messages(&self, conversation_id: ObjectId, limit: i64) -> Result<Vec<Message>>;

    /// Mark unread messages not sent by `reader` as seen; returns how many changed
    async fn mark_read(&self, conversation_id: ObjectId, reader: &str) -> Result<u64>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn insert(&self, notification: Notification) -> Result<Notification>;

    /// Newest first
    async fn list_for_user(&self, uid: &str, limit: i64) -> Result<Vec<Notification>>;

    async fn mark_read(&self, id: ObjectId, uid: &str) -> Result<Option<Notification>>;

    async fn mark_all_read(&self, uid: &str) -> Result<u64>;
}

#[async_trait]
pub trait ModerationRepository: Send + Sync {
    async fn insert_report(&self, report: Report) -> Result<Report>;

    /// Newest first
    async fn list_reports(&self) -> Result<Vec<Report>>;

    async fn set_report_status(&self, id: ObjectId, status: ReportStatus)
        -> Result<Option<Report>>;

    async fn count_open_reports(&self) -> Result<u64>;

    async fn insert_audit_log(&self, entry: AuditLog) -> Result<AuditLog>;

    /// Newest first
    async fn recent_audit_logs(&self, limit: i64) -> Result<Vec<AuditLog>>;
}

/// Every repository the services need, behind trait objects
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub connect: Arc<dyn ConnectRepository>,
    pub chat: Arc<dyn ChatRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
    pub moderation: Arc<dyn ModerationRepository>,
}

impl Repositories {
    pub fn mongo(db: &Database) -> Self {
        Self {
            users: Arc::new(mongo::MongoUserRepository::new(db)),
            profiles: Arc::new(mongo::MongoProfileRepository::new(db)),
            posts: Arc::new(mongo::MongoPostRepository::new(db)),
            connect: Arc::new(mongo::MongoConnectRepository::new(db)),
            chat: Arc::new(mongo::MongoChatRepository::new(db)),
            notifications: Arc::new(mongo::MongoNotificationRepository::new(db)),
            moderation: Arc::new(mongo::MongoModerationRepository::new(db)),
        }
    }

    #[cfg(any(test, feature = "test-utils"))]
    pub fn from_store(store: Arc<InMemoryStore>) -> Self {
        Self {
            users: store.clone(),
            profiles: store.clone(),
            posts: store.clone(),
            connect: store.clone(),
            chat: store.clone(),
            notifications: store.clone(),
            moderation: store,
        }
    }
}
