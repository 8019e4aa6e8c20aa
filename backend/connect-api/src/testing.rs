//! In-process fakes for the external gateways plus a ready-made
//! [`TestContext`]. Used by unit tests and the integration suite.

use async_trait::async_trait;
use chrono::Utc;
use firebase_shared::PushMessage;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::gateways::{IdentityVerifier, PushGateway, RealtimeStore, VerifiedIdentity};
use crate::models::{Profile, User, UserRole, UserStatus};
use crate::repository::{InMemoryStore, Repositories, UserRepository};
use crate::AppState;

/// Accepts only tokens registered with [`StaticVerifier::allow`]
#[derive(Default)]
pub struct StaticVerifier {
    identities: RwLock<HashMap<String, VerifiedIdentity>>,
}

impl StaticVerifier {
    pub async fn allow(&self, token: &str, uid: &str, email: Option<&str>) {
        self.identities.write().await.insert(
            token.to_string(),
            VerifiedIdentity {
                uid: uid.to_string(),
                email: email.map(String::from),
            },
        );
    }
}

#[async_trait]
impl IdentityVerifier for StaticVerifier {
    async fn verify(&self, token: &str) -> anyhow::Result<VerifiedIdentity> {
        self.identities
            .read()
            .await
            .get(token)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("unknown token"))
    }
}

/// Records every push instead of sending it
#[derive(Default)]
pub struct RecordingPush {
    sent: RwLock<Vec<PushMessage>>,
    fail: bool,
}

impl RecordingPush {
    /// A gateway whose every send fails
    pub fn failing() -> Self {
        Self {
            sent: RwLock::new(Vec::new()),
            fail: true,
        }
    }

    pub async fn sent(&self) -> Vec<PushMessage> {
        self.sent.read().await.clone()
    }
}

#[async_trait]
impl PushGateway for RecordingPush {
    async fn send(&self, message: PushMessage) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("push gateway unavailable");
        }
        self.sent.write().await.push(message);
        Ok(())
    }
}

/// JSON tree with Realtime Database path semantics. Writing `null`
/// removes a node and server timestamps resolve to the current time.
#[derive(Default)]
pub struct InMemoryRealtime {
    root: RwLock<Value>,
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn resolve_timestamps(value: Value, now: i64) -> Value {
    match value {
        Value::Object(map) if map.len() == 1 && map.get(".sv") == Some(&Value::from("timestamp")) => {
            Value::from(now)
        }
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, resolve_timestamps(v, now)))
                .collect(),
        ),
        other => other,
    }
}

fn write(node: &mut Value, path: &[&str], value: Value) {
    let Some((head, rest)) = path.split_first() else {
        *node = value;
        return;
    };
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        let child = map.entry(head.to_string()).or_insert(Value::Null);
        write(child, rest, value);
        if child.is_null() {
            map.remove(*head);
        }
    }
}

fn read<'a>(node: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(node, |n, segment| n.get(*segment))
}

#[async_trait]
impl RealtimeStore for InMemoryRealtime {
    async fn set(&self, path: &str, value: Value) -> anyhow::Result<()> {
        let value = resolve_timestamps(value, Utc::now().timestamp_millis());
        write(&mut *self.root.write().await, &segments(path), value);
        Ok(())
    }

    async fn update(&self, path: &str, updates: Value) -> anyhow::Result<()> {
        let Value::Object(updates) = updates else {
            anyhow::bail!("update payload must be an object");
        };
        let now = Utc::now().timestamp_millis();
        let mut root = self.root.write().await;
        for (relative, value) in updates {
            let full = format!("{}/{}", path, relative);
            write(&mut root, &segments(&full), resolve_timestamps(value, now));
        }
        Ok(())
    }

    async fn get(&self, path: &str) -> anyhow::Result<Option<Value>> {
        let root = self.root.read().await;
        Ok(read(&root, &segments(path))
            .filter(|v| !v.is_null())
            .cloned())
    }
}

/// App state wired to the in-memory store and fakes, with handles to each
pub struct TestContext {
    pub state: AppState,
    pub store: Arc<InMemoryStore>,
    pub verifier: Arc<StaticVerifier>,
    pub push: Arc<RecordingPush>,
    pub realtime: Arc<InMemoryRealtime>,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::with_push(RecordingPush::default())
    }
}

impl TestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_push(push: RecordingPush) -> Self {
        let store = Arc::new(InMemoryStore::default());
        let verifier = Arc::new(StaticVerifier::default());
        let push = Arc::new(push);
        let realtime = Arc::new(InMemoryRealtime::default());
        let state = AppState {
            repos: Repositories::from_store(store.clone()),
            identity: verifier.clone(),
            push: push.clone(),
            realtime: realtime.clone(),
        };
        Self {
            state,
            store,
            verifier,
            push,
            realtime,
        }
    }

    /// Bearer token accepted for `uid`
    pub fn token(uid: &str) -> String {
        format!("token-{}", uid)
    }

    /// Signed-in user with a push token and an accepted bearer token
    pub async fn user(&self, uid: &str) -> User {
        let email = format!("{}@nwu.ac.bd", uid);
        let mut user = User::new(uid, &email);
        user.notification_token = Some(format!("device-{}", uid));
        self.store.put_user(user.clone()).await;
        self.verifier
            .allow(&Self::token(uid), uid, Some(&email))
            .await;
        user
    }

    pub async fn admin(&self, uid: &str) -> User {
        let mut user = self.user(uid).await;
        user.role = UserRole::Admin;
        user.status = UserStatus::Admin;
        self.store.put_user(user.clone()).await;
        user
    }

    pub async fn profile(&self, uid: &str, name: &str, department: &str) -> Profile {
        let mut profile = Profile::new(uid);
        profile.name = name.to_string();
        profile.department = department.to_string();
        self.store.put_profile(profile.clone()).await;
        profile
    }

    pub async fn stored_user(&self, uid: &str) -> Option<User> {
        self.store.find_by_uid(uid).await.ok().flatten()
    }
}
