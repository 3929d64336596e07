use appbuild::{BuildRecord, BuildRequest, BuildStatus, LogEntry};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::{error::ApiError, mirror::StatusReport, state::SharedState};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildCreatedResponse {
    pub success: bool,
    pub build_id: String,
    pub provider_job_id: String,
    pub status: BuildStatus,
    pub message: &'static str,
}

/// Response contract for status queries.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildView {
    pub success: bool,
    pub id: String,
    pub provider_job_id: String,
    pub status: BuildStatus,
    pub website_url: String,
    pub app_name: String,
    pub package_name: String,
    pub build_type: &'static str,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub duration: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_detail_url: Option<String>,
    pub logs: Vec<LogEntry>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub status_unavailable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unavailable_reason: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub demo: bool,
}

impl From<StatusReport> for BuildView {
    fn from(report: StatusReport) -> Self {
        let StatusReport {
            record,
            duration,
            unavailable,
            synthetic,
        } = report;
        let BuildRecord {
            id,
            provider_job_id,
            status,
            website_url,
            app_name,
            package_name,
            build_type,
            started_at,
            completed_at,
            download_url,
            provider_detail_url,
            logs,
            ..
        } = record;

        Self {
            success: true,
            id,
            provider_job_id,
            status,
            website_url,
            app_name,
            package_name,
            build_type: build_type.as_str(),
            started_at,
            completed_at,
            duration,
            download_url,
            provider_detail_url,
            logs,
            status_unavailable: unavailable.is_some(),
            unavailable_reason: unavailable,
            demo: synthetic,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildLogsResponse {
    pub success: bool,
    pub id: String,
    pub status: BuildStatus,
    pub logs: Vec<LogEntry>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadResponse {
    pub success: bool,
    pub download_url: String,
}

pub async fn create_build(
    State(state): State<SharedState>,
    body: Result<Json<BuildRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BuildCreatedResponse>), ApiError> {
    let Json(req) = body.map_err(|e| {
        warn!(detail = %e.body_text(), "build: unreadable request body");
        ApiError::Validation(vec!["Request body must be a JSON object".to_string()])
    })?;
    let spec = req.into_spec().map_err(ApiError::Validation)?;

    let record = state.submitter.submit(spec).await?;

    Ok((
        StatusCode::CREATED,
        Json(BuildCreatedResponse {
            success: true,
            build_id: record.id,
            provider_job_id: record.provider_job_id,
            status: record.status,
            message: "Build started successfully on Expo Cloud",
        }),
    ))
}

pub async fn get_build(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<BuildView>, ApiError> {
    let report = state.status.status(&id).await?;
    Ok(Json(report.into()))
}

pub async fn get_build_logs(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<BuildLogsResponse>, ApiError> {
    let record = state.status.status(&id).await?.record;
    Ok(Json(BuildLogsResponse {
        success: true,
        id: record.id,
        status: record.status,
        logs: record.logs,
    }))
}

pub async fn get_build_download(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<DownloadResponse>, ApiError> {
    let record = state.status.status(&id).await?.record;
    match (record.status, record.download_url) {
        (BuildStatus::Finished, Some(download_url)) => Ok(Json(DownloadResponse {
            success: true,
            download_url,
        })),
        (BuildStatus::Finished, None) => {
            Err(ApiError::Conflict("Build finished without an artifact".into()))
        }
        (status, _) => Err(ApiError::Conflict(format!("Build is not finished (status: {status})"))),
    }
}

/// `GET /api/build/` with an empty id segment.
pub async fn missing_id() -> ApiError {
    ApiError::BadRequest("Build ID is required".into())
}

pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
