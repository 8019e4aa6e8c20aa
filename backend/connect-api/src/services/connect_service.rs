// Connect service - candidate discovery and mutual-like matching
use bson::oid::ObjectId;
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{AppError, Result};
use crate::gateways::{server_timestamp, RealtimeStore};
use crate::models::{Profile, SwipeAction, FALLBACK_DEPARTMENT};
use crate::repository::{ConnectRepository, ProfileRepository};
use crate::services::{notification_data, ChatService, NotificationService};
use crate::AppState;

const CANDIDATE_SAMPLE_SIZE: i64 = 20;
const MAX_CANDIDATES: usize = 20;
/// Below this many unseen profiles, previously passed users come back.
const MIN_PRIMARY_POOL: usize = 5;

/// Same-department profiles first, each group in uniformly random order
pub fn rank_candidates<R: Rng + ?Sized>(
    candidates: Vec<Profile>,
    department: &str,
    rng: &mut R,
) -> Vec<Profile> {
    let (mut same, mut other): (Vec<Profile>, Vec<Profile>) = candidates
        .into_iter()
        .partition(|p| p.department == department);
    same.shuffle(rng);
    other.shuffle(rng);
    same.into_iter()
        .chain(other)
        .take(MAX_CANDIDATES)
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct SwipeOutcome {
    pub matched: bool,
    pub match_id: Option<ObjectId>,
    pub conversation_id: Option<ObjectId>,
    pub users: Vec<String>,
}

fn display_name(profile: Option<&Profile>, fallback: &str) -> String {
    profile
        .map(|p| p.name.clone())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

fn room_member(uid: &str, profile: Option<&Profile>) -> Value {
    json!({
        "id": uid,
        "name": profile.map(|p| p.name.as_str()).unwrap_or_default(),
        "photo": profile.and_then(Profile::first_photo).unwrap_or_default(),
        "department": profile.map(|p| p.department.as_str()).unwrap_or_default(),
    })
}

pub struct ConnectService {
    connect: Arc<dyn ConnectRepository>,
    profiles: Arc<dyn ProfileRepository>,
    realtime: Arc<dyn RealtimeStore>,
    chat: ChatService,
    notifications: NotificationService,
}

impl ConnectService {
    pub fn new(state: &AppState) -> Self {
        Self {
            connect: state.repos.connect.clone(),
            profiles: state.repos.profiles.clone(),
            realtime: state.realtime.clone(),
            chat: ChatService::new(state),
            notifications: NotificationService::new(state),
        }
    }

    pub async fn candidates(&self, uid: &str) -> Result<Vec<Profile>> {
        let own = self.profiles.find_by_user(uid).await?;
        let (department, friends) = match own {
            Some(p) if !p.department.is_empty() => (p.department, p.friend_ids),
            Some(p) => (FALLBACK_DEPARTMENT.to_string(), p.friend_ids),
            None => (FALLBACK_DEPARTMENT.to_string(), Vec::new()),
        };

        let mut permanent = friends;
        permanent.push(uid.to_string());

        let mut unseen_exclusions = permanent.clone();
        unseen_exclusions.extend(self.connect.swiped_targets(uid, None).await?);
        let mut pool = self
            .profiles
            .sample_excluding(&unseen_exclusions, CANDIDATE_SAMPLE_SIZE)
            .await?;

        if pool.len() < MIN_PRIMARY_POOL {
            let mut fallback_exclusions = permanent;
            fallback_exclusions.extend(
                self.connect
                    .swiped_targets(uid, Some(SwipeAction::Like))
                    .await?,
            );
            let fallback = self
                .profiles
                .sample_excluding(&fallback_exclusions, CANDIDATE_SAMPLE_SIZE)
                .await?;
            for profile in fallback {
                if !pool.iter().any(|p| p.user_id == profile.user_id) {
                    pool.push(profile);
                }
            }
        }

        let mut rng = StdRng::from_entropy();
        Ok(rank_candidates(pool, &department, &mut rng))
    }

    pub async fn swipe(&self, uid: &str, target: &str, action: SwipeAction) -> Result<SwipeOutcome> {
        if uid == target {
            return Err(AppError::BadRequest("Cannot swipe on yourself".to_string()));
        }

        self.connect.upsert_swipe(uid, target, action).await?;
        if action == SwipeAction::Pass {
            return Ok(SwipeOutcome::default());
        }

        let reciprocated = self
            .connect
            .find_swipe(target, uid)
            .await?
            .map_or(false, |s| s.action == SwipeAction::Like);

        if !reciprocated {
            let swiper = self.profiles.find_by_user(uid).await?;
            self.notifications
                .send_notification(
                    target,
                    "New Connection Request",
                    &format!("{} wants to connect with you.", display_name(swiper.as_ref(), "Someone")),
                    notification_data(&[("type", "request"), ("targetId", uid)]),
                )
                .await;
            return Ok(SwipeOutcome::default());
        }

        self.complete_match(uid, target).await
    }

    async fn complete_match(&self, uid: &str, target: &str) -> Result<SwipeOutcome> {
        let matched = self.connect.get_or_create_match(uid, target).await?;

        let conversation = self.chat.get_or_create_conversation(uid, target).await?;
        if matched.conversation_id != Some(conversation.id) {
            self.connect
                .set_match_conversation(matched.id, conversation.id)
                .await?;
        }

        self.profiles.add_friend(uid, target).await?;
        self.profiles.add_friend(target, uid).await?;

        let users = vec![uid.to_string(), target.to_string()];
        let profiles = self.profiles.find_by_users(&users).await?;
        let profile_of = |id: &str| profiles.iter().find(|p| p.user_id == id);

        // Merge into the room node so mirrored messages survive a re-match
        let room_path = format!("chats/{}", conversation.id.to_hex());
        let room = json!({
            "matchId": matched.id.to_hex(),
            "conversationId": conversation.id.to_hex(),
            "timestamp": server_timestamp(),
            "users": [room_member(uid, profile_of(uid)), room_member(target, profile_of(target))],
            "info/active": true,
        });
        if let Err(e) = self.realtime.update(&room_path, room).await {
            warn!(path = %room_path, error = %e, "Failed to create realtime room");
        }

        for (recipient, other) in [(uid, target), (target, uid)] {
            self.notifications
                .send_notification(
                    recipient,
                    "It's a Match! 🎉",
                    &format!(
                        "You and {} liked each other!",
                        display_name(profile_of(other), "someone")
                    ),
                    notification_data(&[("type", "match"), ("targetId", other)]),
                )
                .await;
        }

        info!(match_id = %matched.id, "Match created");
        Ok(SwipeOutcome {
            matched: true,
            match_id: Some(matched.id),
            conversation_id: Some(conversation.id),
            users,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Match, Swipe};
    use crate::repository::{ChatRepository, InMemoryStore};
    use crate::testing::TestContext;
    use async_trait::async_trait;
    use std::time::Duration;

    /// Store wrapper that stalls between steps so two swipes interleave
    struct SlowConnect(Arc<InMemoryStore>);

    #[async_trait]
    impl ConnectRepository for SlowConnect {
        async fn upsert_swipe(&self, swiper: &str, target: &str, action: SwipeAction) -> Result<Swipe> {
            let swipe = self.0.upsert_swipe(swiper, target, action).await?;
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(swipe)
        }

        async fn find_swipe(&self, swiper: &str, target: &str) -> Result<Option<Swipe>> {
            self.0.find_swipe(swiper, target).await
        }

        async fn swiped_targets(
            &self,
            swiper: &str,
            action: Option<SwipeAction>,
        ) -> Result<Vec<String>> {
            self.0.swiped_targets(swiper, action).await
        }

        async fn get_or_create_match(&self, a: &str, b: &str) -> Result<Match> {
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.0.get_or_create_match(a, b).await
        }

        async fn set_match_conversation(
            &self,
            id: ObjectId,
            conversation_id: ObjectId,
        ) -> Result<()> {
            self.0.set_match_conversation(id, conversation_id).await
        }
    }

    fn profile(uid: &str, department: &str) -> Profile {
        let mut p = Profile::new(uid);
        p.department = department.to_string();
        p
    }

    #[test]
    fn test_rank_candidates_department_first() {
        let mut rng = StdRng::seed_from_u64(7);
        let candidates = vec![
            profile("a", "Law"),
            profile("b", "CSE"),
            profile("c", "Law"),
            profile("d", "CSE"),
            profile("e", "EEE"),
        ];
        let ranked = rank_candidates(candidates, "CSE", &mut rng);
        assert_eq!(ranked.len(), 5);
        assert!(ranked[..2].iter().all(|p| p.department == "CSE"));
        assert!(ranked[2..].iter().all(|p| p.department != "CSE"));
    }

    #[test]
    fn test_rank_candidates_truncates() {
        let mut rng = StdRng::seed_from_u64(1);
        let candidates = (0..30).map(|i| profile(&i.to_string(), "CSE")).collect();
        assert_eq!(rank_candidates(candidates, "CSE", &mut rng).len(), 20);
    }

    #[tokio::test]
    async fn test_candidates_exclude_self_friends_and_swiped() {
        let ctx = TestContext::new();
        let mut me = ctx.profile("me", "Me", "CSE").await;
        me.friend_ids.push("friend".into());
        ctx.store.put_profile(me).await;
        ctx.profile("friend", "Friend", "CSE").await;
        for i in 0..8 {
            ctx.profile(&format!("u{}", i), "User", "Law").await;
        }
        let service = ConnectService::new(&ctx.state);
        service.swipe("me", "u0", SwipeAction::Pass).await.unwrap();
        service.swipe("me", "u1", SwipeAction::Like).await.unwrap();

        let ids: Vec<String> = service
            .candidates("me")
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.user_id)
            .collect();
        assert_eq!(ids.len(), 6);
        for excluded in ["me", "friend", "u0", "u1"] {
            assert!(!ids.iter().any(|id| id == excluded), "{} leaked", excluded);
        }
    }

    #[tokio::test]
    async fn test_candidates_fallback_brings_back_passed() {
        let ctx = TestContext::new();
        ctx.profile("me", "Me", "CSE").await;
        for uid in ["p1", "p2", "l1"] {
            ctx.profile(uid, "User", "CSE").await;
        }
        let service = ConnectService::new(&ctx.state);
        service.swipe("me", "p1", SwipeAction::Pass).await.unwrap();
        service.swipe("me", "p2", SwipeAction::Pass).await.unwrap();
        service.swipe("me", "l1", SwipeAction::Like).await.unwrap();

        let mut ids: Vec<String> = service
            .candidates("me")
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.user_id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["p1", "p2"]);
    }

    #[tokio::test]
    async fn test_swipe_self_rejected() {
        let ctx = TestContext::new();
        let result = ConnectService::new(&ctx.state)
            .swipe("me", "me", SwipeAction::Like)
            .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_one_sided_like_sends_request() {
        let ctx = TestContext::new();
        ctx.user("b").await;
        ctx.profile("a", "Arif", "CSE").await;
        let outcome = ConnectService::new(&ctx.state)
            .swipe("a", "b", SwipeAction::Like)
            .await
            .unwrap();
        assert!(!outcome.matched);

        let sent = ctx.push.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].title, "New Connection Request");
        assert_eq!(sent[0].body, "Arif wants to connect with you.");
        assert_eq!(sent[0].data["type"], "request");
        assert_eq!(sent[0].data["targetId"], "a");
    }

    #[tokio::test]
    async fn test_mutual_like_creates_one_match() {
        let ctx = TestContext::new();
        ctx.user("a").await;
        ctx.user("b").await;
        ctx.profile("a", "Arif", "CSE").await;
        ctx.profile("b", "Bithi", "EEE").await;
        let service = ConnectService::new(&ctx.state);

        service.swipe("a", "b", SwipeAction::Like).await.unwrap();
        let outcome = service.swipe("b", "a", SwipeAction::Like).await.unwrap();
        assert!(outcome.matched);
        assert_eq!(outcome.users, vec!["b".to_string(), "a".to_string()]);

        let matches = ctx.store.matches().await;
        assert_eq!(matches.len(), 1);
        let conversation_id = outcome.conversation_id.unwrap();
        assert_eq!(matches[0].conversation_id, Some(conversation_id));
        assert!(ctx
            .state
            .repos
            .chat
            .find_conversation(conversation_id)
            .await
            .unwrap()
            .is_some());

        let a = ctx.state.repos.profiles.find_by_user("a").await.unwrap().unwrap();
        let b = ctx.state.repos.profiles.find_by_user("b").await.unwrap().unwrap();
        assert_eq!(a.friend_ids, vec!["b".to_string()]);
        assert_eq!(b.friend_ids, vec!["a".to_string()]);

        let room = ctx
            .realtime
            .get(&format!("chats/{}", conversation_id.to_hex()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(room["info"]["active"], true);
        assert_eq!(room["matchId"], outcome.match_id.unwrap().to_hex());
        assert_eq!(room["users"][0]["id"], "b");

        let sent = ctx.push.sent().await;
        let matches: Vec<_> = sent.iter().filter(|m| m.data["type"] == "match").collect();
        assert_eq!(matches.len(), 2);
        let to_a = matches.iter().find(|m| m.token == "device-a").unwrap();
        assert_eq!(to_a.body, "You and Bithi liked each other!");
        assert_eq!(to_a.data["targetId"], "b");

        // Liking again reuses the match and keeps friendship a set
        service.swipe("b", "a", SwipeAction::Like).await.unwrap();
        assert_eq!(ctx.store.matches().await.len(), 1);
        let a = ctx.state.repos.profiles.find_by_user("a").await.unwrap().unwrap();
        assert_eq!(a.friend_ids.len(), 1);
    }

    #[tokio::test]
    async fn test_repeat_swipe_updates_action() {
        let ctx = TestContext::new();
        let service = ConnectService::new(&ctx.state);
        service.swipe("a", "b", SwipeAction::Like).await.unwrap();
        service.swipe("a", "b", SwipeAction::Pass).await.unwrap();
        let swipes = ctx.store.swipes().await;
        assert_eq!(swipes.len(), 1);
        assert_eq!(swipes[0].action, SwipeAction::Pass);
    }

    #[tokio::test]
    async fn test_simultaneous_mutual_likes_share_one_match() {
        let mut ctx = TestContext::new();
        ctx.user("a").await;
        ctx.user("b").await;
        ctx.state.repos.connect = Arc::new(SlowConnect(ctx.store.clone()));

        let first = ConnectService::new(&ctx.state);
        let second = ConnectService::new(&ctx.state);
        let (ab, ba) = tokio::join!(
            first.swipe("a", "b", SwipeAction::Like),
            second.swipe("b", "a", SwipeAction::Like)
        );
        let (ab, ba) = (ab.unwrap(), ba.unwrap());

        assert!(ab.matched && ba.matched);
        assert_eq!(ab.match_id, ba.match_id);
        assert_eq!(ab.conversation_id, ba.conversation_id);
        assert_eq!(ctx.store.matches().await.len(), 1);
        assert_eq!(
            ctx.state.repos.chat.conversations_for("a").await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_match_text_without_profiles() {
        let ctx = TestContext::new();
        ctx.user("a").await;
        ctx.user("b").await;
        let service = ConnectService::new(&ctx.state);

        service.swipe("a", "b", SwipeAction::Like).await.unwrap();
        service.swipe("b", "a", SwipeAction::Like).await.unwrap();

        let sent = ctx.push.sent().await;
        assert_eq!(sent[0].body, "Someone wants to connect with you.");
        assert_eq!(sent[1].body, "You and someone liked each other!");
        assert_eq!(sent[2].body, "You and someone liked each other!");
    }
}
