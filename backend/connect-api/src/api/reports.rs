use axum::{extract::State, routing::post, Extension, Json, Router};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::Result;
use crate::middleware::AuthUser;
use crate::models::{Report, ReportStatus};
use crate::services::{NewReport, ReportService};
use crate::utils::format_datetime;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/", post(file_report))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub reporter: String,
    pub reported_user: String,
    pub reason: String,
    pub description: Option<String>,
    pub status: ReportStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Report> for ReportResponse {
    fn from(r: Report) -> Self {
        Self {
            id: r.id.to_hex(),
            reporter: r.reporter,
            reported_user: r.reported_user,
            reason: r.reason,
            description: r.description,
            status: r.status,
            created_at: format_datetime(r.created_at),
            updated_at: format_datetime(r.updated_at),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportRequest {
    #[validate(length(min = 1))]
    pub reported_user_id: String,
    #[validate(length(min = 1, max = 200))]
    pub reason: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

async fn file_report(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<CreateReportRequest>,
) -> Result<Json<ReportResponse>> {
    payload.validate()?;
    let report = ReportService::new(&state)
        .file_report(
            &auth.uid,
            NewReport {
                reported_user_id: payload.reported_user_id,
                reason: payload.reason,
                description: payload.description,
            },
        )
        .await?;
    Ok(Json(report.into()))
}
