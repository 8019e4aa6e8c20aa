use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const NOTIFICATION_COLLECTION: &str = "notifications";

/// Inbox item; also the payload of the matching push message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user_id: String,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
    #[serde(default)]
    pub is_read: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Notification {
    pub fn new(
        user_id: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
        data: BTreeMap<String, String>,
    ) -> Self {
        let now = DateTime::now();
        Self {
            id: ObjectId::new(),
            user_id: user_id.into(),
            title: title.into(),
            body: body.into(),
            data,
            is_read: false,
            created_at: now,
            updated_at: now,
        }
    }
}
