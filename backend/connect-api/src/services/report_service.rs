use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::Report;
use crate::repository::{ModerationRepository, UserRepository};
use crate::AppState;

#[derive(Debug, Clone)]
pub struct NewReport {
    pub reported_user_id: String,
    pub reason: String,
    pub description: Option<String>,
}

pub struct ReportService {
    users: Arc<dyn UserRepository>,
    moderation: Arc<dyn ModerationRepository>,
}

impl ReportService {
    pub fn new(state: &AppState) -> Self {
        Self {
            users: state.repos.users.clone(),
            moderation: state.repos.moderation.clone(),
        }
    }

    pub async fn file_report(&self, reporter: &str, input: NewReport) -> Result<Report> {
        if reporter == input.reported_user_id {
            return Err(AppError::BadRequest("You cannot report yourself".to_string()));
        }
        if self.users.find_by_uid(&input.reported_user_id).await?.is_none() {
            return Err(AppError::NotFound("Reported user not found".to_string()));
        }

        let report = self
            .moderation
            .insert_report(Report::new(
                reporter,
                input.reported_user_id,
                input.reason,
                input.description.filter(|d| !d.is_empty()),
            ))
            .await?;
        tracing::info!(report_id = %report.id, reporter, "Report filed");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReportStatus;
    use crate::testing::TestContext;

    fn report_on(uid: &str) -> NewReport {
        NewReport {
            reported_user_id: uid.to_string(),
            reason: "spam".to_string(),
            description: Some(String::new()),
        }
    }

    #[tokio::test]
    async fn test_file_report() {
        let ctx = TestContext::new();
        ctx.user("bad").await;
        let report = ReportService::new(&ctx.state)
            .file_report("me", report_on("bad"))
            .await
            .unwrap();
        assert_eq!(report.status, ReportStatus::Open);
        assert_eq!(report.reporter, "me");
        assert!(report.description.is_none());
        assert_eq!(ctx.state.repos.moderation.count_open_reports().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_report_rejections() {
        let ctx = TestContext::new();
        let service = ReportService::new(&ctx.state);
        assert!(matches!(
            service.file_report("me", report_on("me")).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            service.file_report("me", report_on("ghost")).await,
            Err(AppError::NotFound(_))
        ));
    }
}
