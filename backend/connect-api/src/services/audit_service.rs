use std::sync::Arc;

use crate::error::Result;
use crate::models::{AuditLog, CreateAuditLog};
use crate::repository::ModerationRepository;
use crate::AppState;

pub struct AuditService {
    moderation: Arc<dyn ModerationRepository>,
}

impl AuditService {
    pub fn new(state: &AppState) -> Self {
        Self {
            moderation: state.repos.moderation.clone(),
        }
    }

    pub async fn log(&self, entry: CreateAuditLog) -> Result<AuditLog> {
        self.moderation.insert_audit_log(entry.into()).await
    }

    /// Write an entry, logging instead of failing
    pub async fn record(&self, entry: CreateAuditLog) {
        let action = entry.action.as_str();
        if let Err(e) = self.log(entry).await {
            tracing::error!(action, error = %e, "Failed to write audit log");
        }
    }

    pub async fn recent(&self, limit: i64) -> Result<Vec<AuditLog>> {
        self.moderation.recent_audit_logs(limit).await
    }
}
