//! External collaborators: identity verification, push delivery and the
//! realtime database mirror. Firebase implementations live in
//! `firebase-shared`; `testing` has in-process fakes.

use async_trait::async_trait;
use firebase_shared::{
    FcmClient, IdTokenVerifier, PushMessage, RealtimeDatabaseClient, ServiceAccountKey,
    TokenProvider,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::FirebaseConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedIdentity {
    pub uid: String,
    pub email: Option<String>,
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> anyhow::Result<VerifiedIdentity>;
}

#[async_trait]
pub trait PushGateway: Send + Sync {
    async fn send(&self, message: PushMessage) -> anyhow::Result<()>;
}

#[async_trait]
pub trait RealtimeStore: Send + Sync {
    /// Replace the node at `path`
    async fn set(&self, path: &str, value: Value) -> anyhow::Result<()>;

    /// Multi-path update; keys of `updates` are paths relative to `path`
    async fn update(&self, path: &str, updates: Value) -> anyhow::Result<()>;

    async fn get(&self, path: &str) -> anyhow::Result<Option<Value>>;
}

/// Placeholder resolved to the database clock on write
pub fn server_timestamp() -> Value {
    RealtimeDatabaseClient::server_timestamp()
}

#[async_trait]
impl IdentityVerifier for IdTokenVerifier {
    async fn verify(&self, token: &str) -> anyhow::Result<VerifiedIdentity> {
        let claims = IdTokenVerifier::verify(self, token).await?;
        Ok(VerifiedIdentity {
            uid: claims.sub,
            email: claims.email,
        })
    }
}

#[async_trait]
impl PushGateway for FcmClient {
    async fn send(&self, message: PushMessage) -> anyhow::Result<()> {
        let result = FcmClient::send(self, &message).await?;
        debug!(message_id = %result.message_id, "Push delivered to FCM");
        Ok(())
    }
}

#[async_trait]
impl RealtimeStore for RealtimeDatabaseClient {
    async fn set(&self, path: &str, value: Value) -> anyhow::Result<()> {
        Ok(RealtimeDatabaseClient::set(self, path, &value).await?)
    }

    async fn update(&self, path: &str, updates: Value) -> anyhow::Result<()> {
        Ok(RealtimeDatabaseClient::update(self, path, &updates).await?)
    }

    async fn get(&self, path: &str) -> anyhow::Result<Option<Value>> {
        Ok(RealtimeDatabaseClient::get(self, path).await?)
    }
}

/// Push delivery when no service account is configured
pub struct DisabledPush;

#[async_trait]
impl PushGateway for DisabledPush {
    async fn send(&self, message: PushMessage) -> anyhow::Result<()> {
        debug!(title = %message.title, "Push disabled; message dropped");
        Ok(())
    }
}

/// Realtime mirror when no service account or database URL is configured
pub struct DisabledRealtime;

#[async_trait]
impl RealtimeStore for DisabledRealtime {
    async fn set(&self, path: &str, _value: Value) -> anyhow::Result<()> {
        debug!(path, "Realtime mirror disabled; set skipped");
        Ok(())
    }

    async fn update(&self, path: &str, _updates: Value) -> anyhow::Result<()> {
        debug!(path, "Realtime mirror disabled; update skipped");
        Ok(())
    }

    async fn get(&self, _path: &str) -> anyhow::Result<Option<Value>> {
        Ok(None)
    }
}

pub struct Gateways {
    pub identity: Arc<dyn IdentityVerifier>,
    pub push: Arc<dyn PushGateway>,
    pub realtime: Arc<dyn RealtimeStore>,
}

impl Gateways {
    /// Firebase-backed gateways. Without a service account, push and the
    /// realtime mirror become logged no-ops.
    pub async fn firebase(config: &FirebaseConfig) -> anyhow::Result<Self> {
        let identity: Arc<dyn IdentityVerifier> =
            Arc::new(IdTokenVerifier::new(config.project_id.clone()));

        let Some(path) = &config.service_account_path else {
            warn!("FIREBASE__SERVICE_ACCOUNT_PATH not set; push and realtime mirroring disabled");
            return Ok(Self {
                identity,
                push: Arc::new(DisabledPush),
                realtime: Arc::new(DisabledRealtime),
            });
        };

        let key = ServiceAccountKey::from_file(path).await?;
        let tokens = Arc::new(TokenProvider::new(key));
        info!(project_id = %tokens.project_id(), "Firebase service account loaded");

        let realtime: Arc<dyn RealtimeStore> = match &config.database_url {
            Some(url) => Arc::new(RealtimeDatabaseClient::new(url.clone(), tokens.clone())),
            None => {
                warn!("FIREBASE__DATABASE_URL not set; realtime mirroring disabled");
                Arc::new(DisabledRealtime)
            }
        };

        Ok(Self {
            identity,
            push: Arc::new(FcmClient::new(tokens)),
            realtime,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn test_firebase_without_service_account_is_disabled() {
        let gateways = Gateways::firebase(&FirebaseConfig {
            project_id: "nwu-connect".into(),
            service_account_path: None,
            database_url: None,
        })
        .await
        .unwrap();

        gateways
            .push
            .send(PushMessage {
                token: "t".into(),
                title: "x".into(),
                body: "y".into(),
                data: BTreeMap::new(),
            })
            .await
            .unwrap();
        gateways
            .realtime
            .set("chats/abc", serde_json::json!({ "a": 1 }))
            .await
            .unwrap();
        assert!(gateways.realtime.get("chats/abc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_service_account_file_fails() {
        let result = Gateways::firebase(&FirebaseConfig {
            project_id: "nwu-connect".into(),
            service_account_path: Some("/nonexistent/service-account.json".into()),
            database_url: None,
        })
        .await;
        assert!(result.is_err());
    }
}
