use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

pub const AUDIT_LOG_COLLECTION: &str = "auditlogs";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub action: String,
    pub details: String,
    /// Admin Firebase uid
    pub performed_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug)]
pub struct CreateAuditLog {
    pub action: AuditAction,
    pub details: String,
    pub performed_by: String,
    pub metadata: Option<serde_json::Value>,
}

impl From<CreateAuditLog> for AuditLog {
    fn from(entry: CreateAuditLog) -> Self {
        let now = DateTime::now();
        Self {
            id: ObjectId::new(),
            action: entry.action.as_str().to_string(),
            details: entry.details,
            performed_by: entry.performed_by,
            metadata: entry.metadata,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    ApproveUser,
    RejectUser,
    BanUser,
    UnbanUser,
    ResolveReport,
    DismissReport,
    Broadcast,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::ApproveUser => "approve_user",
            AuditAction::RejectUser => "reject_user",
            AuditAction::BanUser => "ban_user",
            AuditAction::UnbanUser => "unban_user",
            AuditAction::ResolveReport => "resolve_report",
            AuditAction::DismissReport => "dismiss_report",
            AuditAction::Broadcast => "broadcast",
        }
    }
}
