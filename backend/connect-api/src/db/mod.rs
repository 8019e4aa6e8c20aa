use bson::{doc, Document};
use mongodb::{
    options::{ClientOptions, IndexOptions},
    Client, Collection, IndexModel,
};
use std::time::Duration;

use crate::config::Config;
use crate::models::{
    audit_log::AUDIT_LOG_COLLECTION,
    chat::{CONVERSATION_COLLECTION, MESSAGE_COLLECTION},
    connect::{MATCH_COLLECTION, SWIPE_COLLECTION},
    notification::NOTIFICATION_COLLECTION,
    post::POST_COLLECTION,
    profile::PROFILE_COLLECTION,
    report::REPORT_COLLECTION,
    user::USER_COLLECTION,
};

#[derive(Clone)]
pub struct Database {
    pub client: Client,
    pub db: mongodb::Database,
}

impl Database {
    pub async fn connect(config: &Config) -> anyhow::Result<Self> {
        let mut options = ClientOptions::parse(&config.mongo.uri).await?;
        options.app_name = Some("connect-api".to_string());
        options.max_pool_size = Some(config.mongo.max_pool_size);
        options.server_selection_timeout = Some(Duration::from_millis(
            config.mongo.server_selection_timeout_ms,
        ));

        let client = Client::with_options(options)?;
        let db = client.database(&config.mongo.database);

        db.run_command(doc! { "ping": 1 }).await?;
        tracing::info!(database = %config.mongo.database, "MongoDB connection established");

        Ok(Self { client, db })
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection::<T>(name)
    }

    pub async fn ensure_indexes(&self) -> anyhow::Result<()> {
        tracing::info!("Ensuring MongoDB indexes...");
        let unique = || Some(IndexOptions::builder().unique(true).build());

        // Sparse so documents written before pair keys existed do not collide
        let unique_pair = || Some(IndexOptions::builder().unique(true).sparse(true).build());

        let indexes: [(&str, Document, Option<IndexOptions>); 11] = [
            (USER_COLLECTION, doc! { "firebaseUid": 1 }, unique()),
            (USER_COLLECTION, doc! { "email": 1 }, unique()),
            (PROFILE_COLLECTION, doc! { "userId": 1 }, unique()),
            (SWIPE_COLLECTION, doc! { "swiperId": 1, "targetId": 1 }, unique()),
            (POST_COLLECTION, doc! { "createdAt": -1 }, None),
            (CONVERSATION_COLLECTION, doc! { "participants": 1 }, None),
            (CONVERSATION_COLLECTION, doc! { "pairKey": 1 }, unique_pair()),
            (MESSAGE_COLLECTION, doc! { "conversationId": 1, "createdAt": 1 }, None),
            (NOTIFICATION_COLLECTION, doc! { "userId": 1, "createdAt": -1 }, None),
            (MATCH_COLLECTION, doc! { "users": 1 }, None),
            (MATCH_COLLECTION, doc! { "pairKey": 1 }, unique_pair()),
        ];

        for (collection, keys, options) in indexes {
            let model = IndexModel::builder().keys(keys).options(options).build();
            self.collection::<Document>(collection)
                .create_index(model)
                .await?;
        }

        for collection in [REPORT_COLLECTION, AUDIT_LOG_COLLECTION] {
            let model = IndexModel::builder()
                .keys(doc! { "createdAt": -1 })
                .build();
            self.collection::<Document>(collection)
                .create_index(model)
                .await?;
        }

        tracing::info!("MongoDB indexes ready");
        Ok(())
    }
}
