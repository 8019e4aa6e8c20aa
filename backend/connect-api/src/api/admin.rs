use axum::{
    extract::{Path, Query, State},
    routing::{get, patch},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::Validate;

use super::reports::ReportResponse;
use super::users::UserResponse;
use crate::error::Result;
use crate::middleware::AuthUser;
use crate::models::ReportStatus;
use crate::services::{
    AdminService, AdminStats, AuditLogView, GrowthPoint, ReportView, UserSummary,
};
use crate::utils::{format_datetime, parse_object_id};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/stats", get(stats))
        .route("/stats/growth", get(growth))
        .route("/verifications", get(verifications))
        .route("/users", get(list_users))
        .route("/users/:id/approve", patch(approve_user))
        .route("/users/:id/reject", patch(reject_user))
        .route("/users/:id/ban", patch(ban_user))
        .route("/users/:id/unban", patch(unban_user))
        .route("/reports", get(reports))
        .route("/reports/:id/resolve", patch(resolve_report))
        .route("/reports/:id/dismiss", patch(dismiss_report))
        .route("/broadcast", patch(broadcast))
        .route("/audit-logs", get(audit_logs))
}

async fn stats(State(state): State<AppState>) -> Result<Json<AdminStats>> {
    Ok(Json(AdminService::new(&state).stats().await?))
}

#[derive(Debug, Deserialize)]
pub struct GrowthQuery {
    pub months: Option<u32>,
}

async fn growth(
    State(state): State<AppState>,
    Query(query): Query<GrowthQuery>,
) -> Result<Json<Vec<GrowthPoint>>> {
    Ok(Json(AdminService::new(&state).growth(query.months).await?))
}

async fn verifications(State(state): State<AppState>) -> Result<Json<Vec<UserResponse>>> {
    let users = AdminService::new(&state).verifications().await?;
    Ok(Json(users.into_iter().map(Into::into).collect()))
}

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub limit: Option<i64>,
    pub skip: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Vec<UserResponse>,
    pub total: u64,
}

async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<UserListResponse>> {
    let (users, total) = AdminService::new(&state)
        .list_users(query.limit, query.skip)
        .await?;
    Ok(Json(UserListResponse {
        users: users.into_iter().map(Into::into).collect(),
        total,
    }))
}

async fn approve_user(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>> {
    let id = parse_object_id(&id, "user")?;
    let user = AdminService::new(&state).approve(&admin.uid, id).await?;
    Ok(Json(user.into()))
}

#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    pub reason: Option<String>,
}

async fn reject_user(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Option<Json<RejectRequest>>,
) -> Result<Json<UserResponse>> {
    let id = parse_object_id(&id, "user")?;
    let reason = payload.and_then(|Json(p)| p.reason);
    let user = AdminService::new(&state)
        .reject(&admin.uid, id, reason)
        .await?;
    Ok(Json(user.into()))
}

async fn ban_user(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>> {
    let id = parse_object_id(&id, "user")?;
    let user = AdminService::new(&state).ban(&admin.uid, id).await?;
    Ok(Json(user.into()))
}

async fn unban_user(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>> {
    let id = parse_object_id(&id, "user")?;
    let user = AdminService::new(&state).unban(&admin.uid, id).await?;
    Ok(Json(user.into()))
}

/// Report with both parties resolved to user summaries
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminReportResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub reporter: Option<UserSummary>,
    pub reported_user: Option<UserSummary>,
    pub reason: String,
    pub description: Option<String>,
    pub status: ReportStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ReportView> for AdminReportResponse {
    fn from(view: ReportView) -> Self {
        let report = view.report;
        Self {
            id: report.id.to_hex(),
            reporter: view.reporter,
            reported_user: view.reported_user,
            reason: report.reason,
            description: report.description,
            status: report.status,
            created_at: format_datetime(report.created_at),
            updated_at: format_datetime(report.updated_at),
        }
    }
}

async fn reports(State(state): State<AppState>) -> Result<Json<Vec<AdminReportResponse>>> {
    let reports = AdminService::new(&state).reports().await?;
    Ok(Json(reports.into_iter().map(Into::into).collect()))
}

async fn resolve_report(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<ReportResponse>> {
    let id = parse_object_id(&id, "report")?;
    let report = AdminService::new(&state)
        .resolve_report(&admin.uid, id)
        .await?;
    Ok(Json(report.into()))
}

async fn dismiss_report(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<ReportResponse>> {
    let id = parse_object_id(&id, "report")?;
    let report = AdminService::new(&state)
        .dismiss_report(&admin.uid, id)
        .await?;
    Ok(Json(report.into()))
}

#[derive(Debug, Deserialize, Validate)]
pub struct BroadcastRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 2000))]
    pub message: String,
}

async fn broadcast(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    Json(payload): Json<BroadcastRequest>,
) -> Result<Json<Value>> {
    payload.validate()?;
    let sent_to = AdminService::new(&state)
        .broadcast(&admin.uid, &payload.title, &payload.message)
        .await?;
    Ok(Json(json!({ "success": true, "sentTo": sent_to })))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub action: String,
    pub details: String,
    pub performed_by: Option<UserSummary>,
    pub metadata: Option<Value>,
    pub created_at: String,
}

impl From<AuditLogView> for AuditLogResponse {
    fn from(view: AuditLogView) -> Self {
        Self {
            id: view.entry.id.to_hex(),
            action: view.entry.action,
            details: view.entry.details,
            performed_by: view.performed_by,
            metadata: view.entry.metadata,
            created_at: format_datetime(view.entry.created_at),
        }
    }
}

async fn audit_logs(State(state): State<AppState>) -> Result<Json<Vec<AuditLogResponse>>> {
    let logs = AdminService::new(&state).audit_logs().await?;
    Ok(Json(logs.into_iter().map(Into::into).collect()))
}
