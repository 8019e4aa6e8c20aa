//! In-process store implementing every repository trait. Backs the test
//! suite; only built with the `test-utils` feature or under `cfg(test)`.

use async_trait::async_trait;
use bson::{oid::ObjectId, DateTime};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use tokio::sync::RwLock;

use super::{
    ChatRepository, ConnectRepository, ModerationRepository, NotificationRepository,
    PostRepository, ProfileRepository, UserRepository,
};
use crate::error::{AppError, Result};
use crate::models::{
    AuditLog, Comment, Conversation, EditRecord, FeedViewer, Match, Message, MessageStatus,
    Notification, Post, Profile, ProfileUpdate, Reply, Report, ReportStatus, Swipe, SwipeAction,
    User, UserStatus, UserUpdate,
};

#[derive(Default)]
pub struct InMemoryStore {
    users: RwLock<Vec<User>>,
    profiles: RwLock<Vec<Profile>>,
    posts: RwLock<Vec<Post>>,
    swipes: RwLock<Vec<Swipe>>,
    matches: RwLock<Vec<Match>>,
    conversations: RwLock<Vec<Conversation>>,
    messages: RwLock<Vec<Message>>,
    notifications: RwLock<Vec<Notification>>,
    reports: RwLock<Vec<Report>>,
    audit_logs: RwLock<Vec<AuditLog>>,
}

impl InMemoryStore {
    /// Store a user document as-is (test fixtures)
    pub async fn put_user(&self, user: User) {
        let mut users = self.users.write().await;
        users.retain(|u| u.firebase_uid != user.firebase_uid);
        users.push(user);
    }

    /// Store a profile document as-is (test fixtures)
    pub async fn put_profile(&self, profile: Profile) {
        let mut profiles = self.profiles.write().await;
        profiles.retain(|p| p.user_id != profile.user_id);
        profiles.push(profile);
    }

    pub async fn matches(&self) -> Vec<Match> {
        self.matches.read().await.clone()
    }

    pub async fn swipes(&self) -> Vec<Swipe> {
        self.swipes.read().await.clone()
    }
}

fn sample<T: Clone>(items: Vec<&T>, size: i64) -> Vec<T> {
    let mut rng = StdRng::from_entropy();
    items
        .choose_multiple(&mut rng, size.max(0) as usize)
        .map(|item| (*item).clone())
        .collect()
}

fn page<T: Clone>(items: Vec<&T>, skip: u64, limit: i64) -> Vec<T> {
    items
        .into_iter()
        .skip(skip as usize)
        .take(limit.max(0) as usize)
        .cloned()
        .collect()
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn find_by_uid(&self, uid: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.firebase_uid == uid).cloned())
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_uids(&self, uids: &[String]) -> Result<Vec<User>> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .filter(|u| uids.contains(&u.firebase_uid))
            .cloned()
            .collect())
    }

    async fn sync(&self, uid: &str, email: &str) -> Result<User> {
        let mut users = self.users.write().await;
        if users
            .iter()
            .any(|u| u.email == email && u.firebase_uid != uid)
        {
            return Err(AppError::Conflict("Resource already exists".to_string()));
        }
        if let Some(user) = users.iter_mut().find(|u| u.firebase_uid == uid) {
            user.email = email.to_string();
            user.updated_at = DateTime::now();
            return Ok(user.clone());
        }
        let user = User::new(uid, email);
        users.push(user.clone());
        Ok(user)
    }

    async fn update_by_uid(&self, uid: &str, update: UserUpdate) -> Result<Option<User>> {
        let mut users = self.users.write().await;
        Ok(users.iter_mut().find(|u| u.firebase_uid == uid).map(|user| {
            update.apply(user, DateTime::now());
            user.clone()
        }))
    }

    async fn update_by_id(&self, id: ObjectId, update: UserUpdate) -> Result<Option<User>> {
        let mut users = self.users.write().await;
        Ok(users.iter_mut().find(|u| u.id == id).map(|user| {
            update.apply(user, DateTime::now());
            user.clone()
        }))
    }

    async fn list(&self, skip: u64, limit: i64) -> Result<Vec<User>> {
        let users = self.users.read().await;
        let mut sorted: Vec<&User> = users.iter().collect();
        sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(page(sorted, skip, limit))
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.users.read().await.len() as u64)
    }

    async fn count_online(&self) -> Result<u64> {
        let users = self.users.read().await;
        Ok(users.iter().filter(|u| u.is_online).count() as u64)
    }

    async fn pending_verifications(&self) -> Result<Vec<User>> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .filter(|u| u.status == UserStatus::Pending && u.verification.submitted)
            .cloned()
            .collect())
    }

    async fn count_pending_verifications(&self) -> Result<u64> {
        Ok(self.pending_verifications().await?.len() as u64)
    }

    async fn count_created_between(&self, start: DateTime, end: DateTime) -> Result<u64> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .filter(|u| u.created_at >= start && u.created_at < end)
            .count() as u64)
    }

    async fn list_not_banned(&self) -> Result<Vec<User>> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .filter(|u| u.status != UserStatus::Banned)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ProfileRepository for InMemoryStore {
    async fn find_by_user(&self, uid: &str) -> Result<Option<Profile>> {
        let profiles = self.profiles.read().await;
        Ok(profiles.iter().find(|p| p.user_id == uid).cloned())
    }

    async fn find_by_users(&self, uids: &[String]) -> Result<Vec<Profile>> {
        let profiles = self.profiles.read().await;
        Ok(profiles
            .iter()
            .filter(|p| uids.contains(&p.user_id))
            .cloned()
            .collect())
    }

    async fn upsert(&self, uid: &str, update: ProfileUpdate) -> Result<Profile> {
        let mut profiles = self.profiles.write().await;
        let now = DateTime::now();
        if let Some(profile) = profiles.iter_mut().find(|p| p.user_id == uid) {
            update.apply(profile, now);
            return Ok(profile.clone());
        }
        let mut profile = Profile::new(uid);
        update.apply(&mut profile, now);
        profiles.push(profile.clone());
        Ok(profile)
    }

    async fn add_friend(&self, uid: &str, friend_uid: &str) -> Result<()> {
        let mut profiles = self.profiles.write().await;
        if let Some(profile) = profiles.iter_mut().find(|p| p.user_id == uid) {
            if !profile.is_friend(friend_uid) {
                profile.friend_ids.push(friend_uid.to_string());
            }
        }
        Ok(())
    }

    async fn sample_excluding(&self, exclude: &[String], size: i64) -> Result<Vec<Profile>> {
        let profiles = self.profiles.read().await;
        let pool: Vec<&Profile> = profiles
            .iter()
            .filter(|p| !exclude.contains(&p.user_id))
            .collect();
        Ok(sample(pool, size))
    }
}

#[async_trait]
impl PostRepository for InMemoryStore {
    async fn insert(&self, post: Post) -> Result<Post> {
        self.posts.write().await.push(post.clone());
        Ok(post)
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<Post>> {
        let posts = self.posts.read().await;
        Ok(posts.iter().find(|p| p.id == id).cloned())
    }

    async fn sample_visible(&self, viewer: &FeedViewer, size: i64) -> Result<Vec<Post>> {
        let posts = self.posts.read().await;
        let pool: Vec<&Post> = posts.iter().filter(|p| viewer.can_see(p)).collect();
        Ok(sample(pool, size))
    }

    async fn list_by_user(&self, uid: &str, skip: u64, limit: i64) -> Result<Vec<Post>> {
        let posts = self.posts.read().await;
        let mut own: Vec<&Post> = posts
            .iter()
            .filter(|p| p.user_id == uid && !p.is_archived)
            .collect();
        own.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(page(own, skip, limit))
    }

    async fn count_by_user(&self, uid: &str) -> Result<u64> {
        let posts = self.posts.read().await;
        Ok(posts
            .iter()
            .filter(|p| p.user_id == uid && !p.is_archived)
            .count() as u64)
    }

    async fn set_like(&self, id: ObjectId, uid: &str, liked: bool) -> Result<Option<Post>> {
        let mut posts = self.posts.write().await;
        Ok(posts.iter_mut().find(|p| p.id == id).map(|post| {
            post.likes.retain(|u| u != uid);
            if liked {
                post.likes.push(uid.to_string());
            }
            post.clone()
        }))
    }

    async fn push_comment(&self, id: ObjectId, comment: Comment) -> Result<Option<Post>> {
        let mut posts = self.posts.write().await;
        Ok(posts.iter_mut().find(|p| p.id == id).map(|post| {
            post.comments.push(comment);
            post.clone()
        }))
    }

    async fn push_reply(
        &self,
        id: ObjectId,
        comment_id: ObjectId,
        reply: Reply,
    ) -> Result<Option<Post>> {
        let mut posts = self.posts.write().await;
        let Some(post) = posts.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        let Some(comment) = post.comments.iter_mut().find(|c| c.id == comment_id) else {
            return Ok(None);
        };
        comment.replies.push(reply);
        Ok(Some(post.clone()))
    }

    async fn delete_owned(&self, id: ObjectId, uid: &str) -> Result<bool> {
        let mut posts = self.posts.write().await;
        let before = posts.len();
        posts.retain(|p| !(p.id == id && p.user_id == uid));
        Ok(posts.len() < before)
    }

    async fn set_archived_owned(
        &self,
        id: ObjectId,
        uid: &str,
        archived: bool,
    ) -> Result<Option<Post>> {
        let mut posts = self.posts.write().await;
        Ok(posts
            .iter_mut()
            .find(|p| p.id == id && p.user_id == uid)
            .map(|post| {
                post.is_archived = archived;
                post.updated_at = DateTime::now();
                post.clone()
            }))
    }

    async fn edit_owned(
        &self,
        id: ObjectId,
        uid: &str,
        content: &str,
        previous: EditRecord,
    ) -> Result<Option<Post>> {
        let mut posts = self.posts.write().await;
        Ok(posts
            .iter_mut()
            .find(|p| p.id == id && p.user_id == uid)
            .map(|post| {
                post.edit_history.push(previous);
                post.content = content.to_string();
                post.updated_at = DateTime::now();
                post.clone()
            }))
    }
}

#[async_trait]
impl ConnectRepository for InMemoryStore {
    async fn upsert_swipe(&self, swiper: &str, target: &str, action: SwipeAction) -> Result<Swipe> {
        let mut swipes = self.swipes.write().await;
        let now = DateTime::now();
        if let Some(swipe) = swipes
            .iter_mut()
            .find(|s| s.swiper_id == swiper && s.target_id == target)
        {
            swipe.action = action;
            swipe.updated_at = now;
            return Ok(swipe.clone());
        }
        let swipe = Swipe {
            id: ObjectId::new(),
            swiper_id: swiper.to_string(),
            target_id: target.to_string(),
            action,
            created_at: now,
            updated_at: now,
        };
        swipes.push(swipe.clone());
        Ok(swipe)
    }

    async fn find_swipe(&self, swiper: &str, target: &str) -> Result<Option<Swipe>> {
        let swipes = self.swipes.read().await;
        Ok(swipes
            .iter()
            .find(|s| s.swiper_id == swiper && s.target_id == target)
            .cloned())
    }

    async fn swiped_targets(
        &self,
        swiper: &str,
        action: Option<SwipeAction>,
    ) -> Result<Vec<String>> {
        let swipes = self.swipes.read().await;
        Ok(swipes
            .iter()
            .filter(|s| s.swiper_id == swiper && action.map_or(true, |a| s.action == a))
            .map(|s| s.target_id.clone())
            .collect())
    }

    async fn get_or_create_match(&self, a: &str, b: &str) -> Result<Match> {
        let mut matches = self.matches.write().await;
        if let Some(existing) = matches.iter().find(|m| m.involves(a, b)) {
            return Ok(existing.clone());
        }
        let created = Match::new(a, b);
        matches.push(created.clone());
        Ok(created)
    }

    async fn set_match_conversation(
        &self,
        id: ObjectId,
        conversation_id: ObjectId,
    ) -> Result<()> {
        let mut matches = self.matches.write().await;
        if let Some(m) = matches.iter_mut().find(|m| m.id == id) {
            m.conversation_id = Some(conversation_id);
            m.updated_at = DateTime::now();
        }
        Ok(())
    }
}

#[async_trait]
impl ChatRepository for InMemoryStore {
    async fn get_or_create_conversation(&self, a: &str, b: &str) -> Result<Conversation> {
        let mut conversations = self.conversations.write().await;
        if let Some(existing) = conversations
            .iter()
            .find(|c| c.participants.len() == 2 && c.has_participant(a) && c.has_participant(b))
        {
            return Ok(existing.clone());
        }
        let created = Conversation::new(a, b);
        conversations.push(created.clone());
        Ok(created)
    }

    async fn find_conversation(&self, id: ObjectId) -> Result<Option<Conversation>> {
        let conversations = self.conversations.read().await;
        Ok(conversations.iter().find(|c| c.id == id).cloned())
    }

    async fn set_last_message(&self, id: ObjectId, text: &str, at: DateTime) -> Result<()> {
        let mut conversations = self.conversations.write().await;
        if let Some(c) = conversations.iter_mut().find(|c| c.id == id) {
            c.last_message = text.to_string();
            c.last_message_at = at;
            c.updated_at = at;
        }
        Ok(())
    }

    async fn conversations_for(&self, uid: &str) -> Result<Vec<Conversation>> {
        let conversations = self.conversations.read().await;
        let mut mine: Vec<Conversation> = conversations
            .iter()
            .filter(|c| c.has_participant(uid))
            .cloned()
            .collect();
        mine.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));
        Ok(mine)
    }

    async fn insert_message(&self, message: Message) -> Result<Message> {
        self.messages.write().await.push(message.clone());
        Ok(message)
    }

    async fn messages(&self, conversation_id: ObjectId, limit: i64) -> Result<Vec<Message>> {
        let messages = self.messages.read().await;
        let mut thread: Vec<&Message> = messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .collect();
        thread.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(page(thread, 0, limit))
    }

    async fn mark_read(&self, conversation_id: ObjectId, reader: &str) -> Result<u64> {
        let mut messages = self.messages.write().await;
        let mut changed = 0;
        for message in messages
            .iter_mut()
            .filter(|m| m.conversation_id == conversation_id && m.sender_id != reader && !m.read)
        {
            message.read = true;
            message.status = MessageStatus::Seen;
            changed += 1;
        }
        Ok(changed)
    }
}

#[async_trait]
impl NotificationRepository for InMemoryStore {
    async fn insert(&self, notification: Notification) -> Result<Notification> {
        self.notifications.write().await.push(notification.clone());
        Ok(notification)
    }

    async fn list_for_user(&self, uid: &str, limit: i64) -> Result<Vec<Notification>> {
        let notifications = self.notifications.read().await;
        let mut mine: Vec<&Notification> =
            notifications.iter().filter(|n| n.user_id == uid).collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(page(mine, 0, limit))
    }

    async fn mark_read(&self, id: ObjectId, uid: &str) -> Result<Option<Notification>> {
        let mut notifications = self.notifications.write().await;
        Ok(notifications
            .iter_mut()
            .find(|n| n.id == id && n.user_id == uid)
            .map(|n| {
                n.is_read = true;
                n.updated_at = DateTime::now();
                n.clone()
            }))
    }

    async fn mark_all_read(&self, uid: &str) -> Result<u64> {
        let mut notifications = self.notifications.write().await;
        let mut changed = 0;
        for n in notifications
            .iter_mut()
            .filter(|n| n.user_id == uid && !n.is_read)
        {
            n.is_read = true;
            changed += 1;
        }
        Ok(changed)
    }
}

#[async_trait]
impl ModerationRepository for InMemoryStore {
    async fn insert_report(&self, report: Report) -> Result<Report> {
        self.reports.write().await.push(report.clone());
        Ok(report)
    }

    async fn list_reports(&self) -> Result<Vec<Report>> {
        let reports = self.reports.read().await;
        let mut all = reports.clone();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn set_report_status(
        &self,
        id: ObjectId,
        status: ReportStatus,
    ) -> Result<Option<Report>> {
        let mut reports = self.reports.write().await;
        Ok(reports.iter_mut().find(|r| r.id == id).map(|r| {
            r.status = status;
            r.updated_at = DateTime::now();
            r.clone()
        }))
    }

    async fn count_open_reports(&self) -> Result<u64> {
        let reports = self.reports.read().await;
        Ok(reports
            .iter()
            .filter(|r| r.status == ReportStatus::Open)
            .count() as u64)
    }

    async fn insert_audit_log(&self, entry: AuditLog) -> Result<AuditLog> {
        self.audit_logs.write().await.push(entry.clone());
        Ok(entry)
    }

    async fn recent_audit_logs(&self, limit: i64) -> Result<Vec<AuditLog>> {
        let logs = self.audit_logs.read().await;
        let mut all: Vec<&AuditLog> = logs.iter().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(page(all, 0, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sync_is_idempotent() {
        let store = InMemoryStore::default();
        let first = store.sync("uid-1", "a@nwu.ac.bd").await.unwrap();
        let second = store.sync("uid-1", "a@nwu.ac.bd").await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(UserRepository::count(&store).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_sync_updates_email() {
        let store = InMemoryStore::default();
        store.sync("uid-1", "old@nwu.ac.bd").await.unwrap();
        let user = store.sync("uid-1", "new@nwu.ac.bd").await.unwrap();
        assert_eq!(user.email, "new@nwu.ac.bd");
    }

    #[tokio::test]
    async fn test_sync_rejects_duplicate_email() {
        let store = InMemoryStore::default();
        store.sync("uid-1", "a@nwu.ac.bd").await.unwrap();
        assert!(matches!(
            store.sync("uid-2", "a@nwu.ac.bd").await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_repeated_swipe_updates() {
        let store = InMemoryStore::default();
        store.upsert_swipe("a", "b", SwipeAction::Pass).await.unwrap();
        store.upsert_swipe("a", "b", SwipeAction::Like).await.unwrap();
        let swipes = store.swipes().await;
        assert_eq!(swipes.len(), 1);
        assert_eq!(swipes[0].action, SwipeAction::Like);
        assert_eq!(
            store.swiped_targets("a", Some(SwipeAction::Pass)).await.unwrap(),
            Vec::<String>::new()
        );
    }

    #[tokio::test]
    async fn test_add_friend_has_set_semantics() {
        let store = InMemoryStore::default();
        store.put_profile(Profile::new("a")).await;
        store.add_friend("a", "b").await.unwrap();
        store.add_friend("a", "b").await.unwrap();
        let profile = store.find_by_user("a").await.unwrap().unwrap();
        assert_eq!(profile.friend_ids, vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn test_sample_respects_size_and_exclusions() {
        let store = InMemoryStore::default();
        for i in 0..10 {
            store.put_profile(Profile::new(format!("u{}", i))).await;
        }
        let exclude = vec!["u0".to_string(), "u1".to_string()];
        let sampled = store.sample_excluding(&exclude, 5).await.unwrap();
        assert_eq!(sampled.len(), 5);
        assert!(sampled.iter().all(|p| !exclude.contains(&p.user_id)));
    }

    #[tokio::test]
    async fn test_owner_scoped_delete() {
        let store = InMemoryStore::default();
        let post = PostRepository::insert(
            &store,
            Post::new("a", "hi", vec![], Default::default(), "CSE"),
        )
        .await
        .unwrap();
        assert!(!store.delete_owned(post.id, "b").await.unwrap());
        assert!(store.delete_owned(post.id, "a").await.unwrap());
        assert!(PostRepository::find_by_id(&store, post.id)
            .await
            .unwrap()
            .is_none());
    }
}
