use async_trait::async_trait;
use bson::{doc, oid::ObjectId, DateTime};
use mongodb::{options::ReturnDocument, Collection};

use super::collect;
use crate::db::Database;
use crate::error::Result;
use crate::models::{
    audit_log::AUDIT_LOG_COLLECTION, report::REPORT_COLLECTION, AuditLog, Report, ReportStatus,
};
use crate::repository::ModerationRepository;

pub struct MongoModerationRepository {
    reports: Collection<Report>,
    audit_logs: Collection<AuditLog>,
}

impl MongoModerationRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            reports: db.collection(REPORT_COLLECTION),
            audit_logs: db.collection(AUDIT_LOG_COLLECTION),
        }
    }
}

#[async_trait]
impl ModerationRepository for MongoModerationRepository {
    async fn insert_report(&self, report: Report) -> Result<Report> {
        self.reports.insert_one(&report).await?;
        Ok(report)
    }

    async fn list_reports(&self) -> Result<Vec<Report>> {
        let cursor = self
            .reports
            .find(doc! {})
            .sort(doc! { "createdAt": -1 })
            .await?;
        collect(cursor).await
    }

    async fn set_report_status(
        &self,
        id: ObjectId,
        status: ReportStatus,
    ) -> Result<Option<Report>> {
        Ok(self
            .reports
            .find_one_and_update(
                doc! { "_id": id },
                doc! { "$set": { "status": status.as_str(), "updatedAt": DateTime::now() } },
            )
            .return_document(ReturnDocument::After)
            .await?)
    }

    async fn count_open_reports(&self) -> Result<u64> {
        Ok(self
            .reports
            .count_documents(doc! { "status": ReportStatus::Open.as_str() })
            .await?)
    }

    async fn insert_audit_log(&self, entry: AuditLog) -> Result<AuditLog> {
        self.audit_logs.insert_one(&entry).await?;
        Ok(entry)
    }

    async fn recent_audit_logs(&self, limit: i64) -> Result<Vec<AuditLog>> {
        let cursor = self
            .audit_logs
            .find(doc! {})
            .sort(doc! { "createdAt": -1 })
            .limit(limit)
            .await?;
        collect(cursor).await
    }
}
