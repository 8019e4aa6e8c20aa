// Admin service - moderation, verification review and platform statistics
use bson::oid::ObjectId;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::error::{AppError, Result};
use crate::models::{
    AuditAction, AuditLog, CreateAuditLog, Report, ReportStatus, User, UserStatus, UserUpdate,
    VerificationUpdate,
};
use crate::repository::{ModerationRepository, UserRepository};
use crate::services::{notification_data, AuditService, NotificationService};
use crate::utils::month_windows;
use crate::AppState;

const DEFAULT_USER_PAGE: i64 = 20;
const MAX_USER_PAGE: i64 = 100;
const MAX_GROWTH_MONTHS: u32 = 24;
const AUDIT_LOG_LIMIT: i64 = 100;
const BROADCAST_CONCURRENCY: usize = 16;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub total_users: u64,
    pub pending_verifications: u64,
    pub active_reports: u64,
    pub online_now: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GrowthPoint {
    pub name: String,
    pub total: u64,
}

/// Minimal user reference embedded in moderation views
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: Option<String>,
    pub email: String,
    pub profile_image: Option<String>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_hex(),
            name: user.name.clone(),
            email: user.email.clone(),
            profile_image: user.profile_image.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReportView {
    pub report: Report,
    pub reporter: Option<UserSummary>,
    pub reported_user: Option<UserSummary>,
}

#[derive(Debug, Clone)]
pub struct AuditLogView {
    pub entry: AuditLog,
    pub performed_by: Option<UserSummary>,
}

/// Look up users by uid once and hand out summaries
struct Directory(Vec<User>);

impl Directory {
    fn summary(&self, uid: &str) -> Option<UserSummary> {
        self.0
            .iter()
            .find(|u| u.firebase_uid == uid)
            .map(UserSummary::from)
    }
}

fn user_not_found() -> AppError {
    AppError::NotFound("User not found".to_string())
}

pub struct AdminService {
    users: Arc<dyn UserRepository>,
    moderation: Arc<dyn ModerationRepository>,
    notifications: NotificationService,
    audit: AuditService,
}

impl AdminService {
    pub fn new(state: &AppState) -> Self {
        Self {
            users: state.repos.users.clone(),
            moderation: state.repos.moderation.clone(),
            notifications: NotificationService::new(state),
            audit: AuditService::new(state),
        }
    }

    async fn directory(&self, mut uids: Vec<String>) -> Result<Directory> {
        uids.sort();
        uids.dedup();
        Ok(Directory(self.users.find_by_uids(&uids).await?))
    }

    pub async fn stats(&self) -> Result<AdminStats> {
        Ok(AdminStats {
            total_users: self.users.count().await?,
            pending_verifications: self.users.count_pending_verifications().await?,
            active_reports: self.moderation.count_open_reports().await?,
            online_now: self.users.count_online().await?,
        })
    }

    /// Sign-ups per calendar month, oldest first
    pub async fn growth(&self, months: Option<u32>) -> Result<Vec<GrowthPoint>> {
        let months = months.unwrap_or(6).clamp(1, MAX_GROWTH_MONTHS);
        let mut points = Vec::with_capacity(months as usize);
        for window in month_windows(Utc::now(), months) {
            let total = self
                .users
                .count_created_between(
                    bson::DateTime::from_chrono(window.start),
                    bson::DateTime::from_chrono(window.end),
                )
                .await?;
            points.push(GrowthPoint {
                name: window.label,
                total,
            });
        }
        Ok(points)
    }

    pub async fn verifications(&self) -> Result<Vec<User>> {
        self.users.pending_verifications().await
    }

    pub async fn list_users(&self, limit: Option<i64>, skip: Option<u64>) -> Result<(Vec<User>, u64)> {
        let limit = limit.unwrap_or(DEFAULT_USER_PAGE).clamp(1, MAX_USER_PAGE);
        let users = self.users.list(skip.unwrap_or(0), limit).await?;
        let total = self.users.count().await?;
        Ok((users, total))
    }

    async fn update_user(&self, id: ObjectId, update: UserUpdate) -> Result<User> {
        self.users
            .update_by_id(id, update)
            .await?
            .ok_or_else(user_not_found)
    }

    async fn notify_verification(&self, user: &User, status: &str, title: &str, body: &str) {
        self.notifications
            .send_notification(
                &user.firebase_uid,
                title,
                body,
                notification_data(&[("type", "verification"), ("status", status)]),
            )
            .await;
    }

    async fn audit_user(&self, admin: &str, action: AuditAction, verb: &str, user: &User) {
        self.audit
            .record(CreateAuditLog {
                action,
                details: format!("{} user {}", verb, user.email),
                performed_by: admin.to_string(),
                metadata: Some(json!({
                    "userId": user.id.to_hex(),
                    "firebaseUid": user.firebase_uid,
                })),
            })
            .await;
    }

    pub async fn approve(&self, admin: &str, id: ObjectId) -> Result<User> {
        let user = self
            .update_user(
                id,
                UserUpdate {
                    status: Some(UserStatus::Approved),
                    ..Default::default()
                },
            )
            .await?;
        self.notify_verification(
            &user,
            "approved",
            "Verification Approved",
            "Your account has been verified. Welcome aboard!",
        )
        .await;
        self.audit_user(admin, AuditAction::ApproveUser, "Approved", &user)
            .await;
        info!(user_id = %id, admin, "User approved");
        Ok(user)
    }

    pub async fn reject(&self, admin: &str, id: ObjectId, reason: Option<String>) -> Result<User> {
        let reason = reason.filter(|r| !r.trim().is_empty());
        let user = self
            .update_user(
                id,
                UserUpdate {
                    verification: Some(VerificationUpdate::Rejected {
                        reason: reason.clone(),
                    }),
                    ..Default::default()
                },
            )
            .await?;
        let body = match &reason {
            Some(reason) => format!("Your verification was rejected: {}", reason),
            None => "Your verification was rejected. Please submit your documents again."
                .to_string(),
        };
        self.notify_verification(&user, "rejected", "Verification Rejected", &body)
            .await;
        self.audit_user(admin, AuditAction::RejectUser, "Rejected", &user)
            .await;
        Ok(user)
    }

    pub async fn ban(&self, admin: &str, id: ObjectId) -> Result<User> {
        let target = self.users.find_by_id(id).await?.ok_or_else(user_not_found)?;
        if target.is_admin() {
            return Err(AppError::Forbidden);
        }
        let user = self
            .update_user(
                id,
                UserUpdate {
                    status: Some(UserStatus::Banned),
                    ..Default::default()
                },
            )
            .await?;
        self.audit_user(admin, AuditAction::BanUser, "Banned", &user)
            .await;
        info!(user_id = %id, admin, "User banned");
        Ok(user)
    }

    pub async fn unban(&self, admin: &str, id: ObjectId) -> Result<User> {
        let user = self
            .update_user(
                id,
                UserUpdate {
                    status: Some(UserStatus::Approved),
                    ..Default::default()
                },
            )
            .await?;
        self.audit_user(admin, AuditAction::UnbanUser, "Unbanned", &user)
            .await;
        Ok(user)
    }

    pub async fn reports(&self) -> Result<Vec<ReportView>> {
        let reports = self.moderation.list_reports().await?;
        let directory = self
            .directory(
                reports
                    .iter()
                    .flat_map(|r| [r.reporter.clone(), r.reported_user.clone()])
                    .collect(),
            )
            .await?;
        Ok(reports
            .into_iter()
            .map(|report| ReportView {
                reporter: directory.summary(&report.reporter),
                reported_user: directory.summary(&report.reported_user),
                report,
            })
            .collect())
    }

    async fn set_report_status(
        &self,
        admin: &str,
        id: ObjectId,
        status: ReportStatus,
        action: AuditAction,
    ) -> Result<Report> {
        let report = self
            .moderation
            .set_report_status(id, status)
            .await?
            .ok_or_else(|| AppError::NotFound("Report not found".to_string()))?;
        self.audit
            .record(CreateAuditLog {
                action,
                details: format!(
                    "Marked report against {} as {}",
                    report.reported_user,
                    status.as_str()
                ),
                performed_by: admin.to_string(),
                metadata: Some(json!({
                    "reportId": report.id.to_hex(),
                    "reportedUser": report.reported_user,
                })),
            })
            .await;
        Ok(report)
    }

    pub async fn resolve_report(&self, admin: &str, id: ObjectId) -> Result<Report> {
        self.set_report_status(admin, id, ReportStatus::Resolved, AuditAction::ResolveReport)
            .await
    }

    pub async fn dismiss_report(&self, admin: &str, id: ObjectId) -> Result<Report> {
        self.set_report_status(admin, id, ReportStatus::Dismissed, AuditAction::DismissReport)
            .await
    }

    /// Notify every user who is not banned; returns how many were targeted
    pub async fn broadcast(&self, admin: &str, title: &str, message: &str) -> Result<usize> {
        let recipients = self.users.list_not_banned().await?;
        let count = recipients.len();

        stream::iter(recipients)
            .for_each_concurrent(BROADCAST_CONCURRENCY, |user| async move {
                self.notifications
                    .send_notification(
                        &user.firebase_uid,
                        title,
                        message,
                        notification_data(&[("type", "broadcast")]),
                    )
                    .await;
            })
            .await;

        self.audit
            .record(CreateAuditLog {
                action: AuditAction::Broadcast,
                details: format!("Broadcast \"{}\" to {} users", title, count),
                performed_by: admin.to_string(),
                metadata: Some(json!({ "title": title, "message": message, "sentTo": count })),
            })
            .await;
        info!(admin, sent_to = count, "Broadcast sent");
        Ok(count)
    }

    pub async fn audit_logs(&self) -> Result<Vec<AuditLogView>> {
        let entries = self.audit.recent(AUDIT_LOG_LIMIT).await?;
        let directory = self
            .directory(entries.iter().map(|e| e.performed_by.clone()).collect())
            .await?;
        Ok(entries
            .into_iter()
            .map(|entry| AuditLogView {
                performed_by: directory.summary(&entry.performed_by),
                entry,
            })
            .collect())
    }
}
