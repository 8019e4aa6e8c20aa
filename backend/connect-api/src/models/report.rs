use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

pub const REPORT_COLLECTION: &str = "reports";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    #[default]
    Open,
    Resolved,
    Dismissed,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Open => "open",
            ReportStatus::Resolved => "resolved",
            ReportStatus::Dismissed => "dismissed",
        }
    }
}

/// A user-filed report against another user. Both sides are Firebase uids.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub reporter: String,
    pub reported_user: String,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: ReportStatus,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Report {
    pub fn new(
        reporter: impl Into<String>,
        reported_user: impl Into<String>,
        reason: impl Into<String>,
        description: Option<String>,
    ) -> Self {
        let now = DateTime::now();
        Self {
            id: ObjectId::new(),
            reporter: reporter.into(),
            reported_user: reported_user.into(),
            reason: reason.into(),
            description,
            status: ReportStatus::Open,
            created_at: now,
            updated_at: now,
        }
    }
}
