use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

pub const SWIPE_COLLECTION: &str = "swipes";
pub const MATCH_COLLECTION: &str = "matches";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeAction {
    Like,
    Pass,
}

impl SwipeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwipeAction::Like => "like",
            SwipeAction::Pass => "pass",
        }
    }
}

/// A directed like/pass from `swiper_id` to `target_id`; one per pair
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Swipe {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub swiper_id: String,
    pub target_id: String,
    pub action: SwipeAction,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// Order-independent key for a pair of uids, unique per pair
pub fn pair_key(a: &str, b: &str) -> String {
    if a <= b {
        format!("{}|{}", a, b)
    } else {
        format!("{}|{}", b, a)
    }
}

/// A mutual like
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub users: Vec<String>,
    #[serde(default)]
    pub pair_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_time: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Match {
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        let (a, b) = (a.into(), b.into());
        let now = DateTime::now();
        Self {
            id: ObjectId::new(),
            pair_key: pair_key(&a, &b),
            users: vec![a, b],
            conversation_id: None,
            last_message: None,
            last_message_time: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn involves(&self, a: &str, b: &str) -> bool {
        self.users.iter().any(|u| u == a) && self.users.iter().any(|u| u == b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_key_is_order_independent() {
        assert_eq!(pair_key("bithi", "arif"), "arif|bithi");
        assert_eq!(pair_key("arif", "bithi"), pair_key("bithi", "arif"));
        assert_eq!(Match::new("b", "a").pair_key, "a|b");
    }
}
