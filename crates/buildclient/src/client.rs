use appbuild::{BuildRequest, BuildStatus, LogEntry};
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;

use crate::error::ClientError;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildStarted {
    pub build_id: String,
    pub provider_job_id: String,
    pub status: BuildStatus,
    #[serde(default)]
    pub message: Option<String>,
}

/// Body of `GET /api/build/:id`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildStatusView {
    pub id: String,
    #[serde(default)]
    pub provider_job_id: Option<String>,
    pub status: BuildStatus,
    pub website_url: String,
    pub app_name: String,
    pub package_name: String,
    pub build_type: String,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub provider_detail_url: Option<String>,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
    #[serde(default)]
    pub status_unavailable: bool,
    #[serde(default)]
    pub unavailable_reason: Option<String>,
    /// Set by gateways running in demo mode.
    #[serde(default)]
    pub demo: bool,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    errors: Vec<String>,
}

/// HTTP client for the gateway.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    base_url: String,
    client: reqwest::Client,
}

impl GatewayClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn start_build(&self, req: &BuildRequest) -> Result<BuildStarted, ClientError> {
        let url = format!("{}/api/build", self.base_url);
        let resp = self.client.post(url).json(req).send().await?;

        if resp.status().is_success() {
            return Ok(resp.json().await?);
        }

        let status = resp.status();
        let body: ErrorBody = resp.json().await.unwrap_or(ErrorBody {
            error: None,
            errors: Vec::new(),
        });
        if status == StatusCode::BAD_REQUEST && !body.errors.is_empty() {
            return Err(ClientError::Validation(body.errors));
        }
        Err(api_error(status, body))
    }

    pub async fn build_status(&self, build_id: &str) -> Result<BuildStatusView, ClientError> {
        let url = format!("{}/api/build/{}", self.base_url, build_id);
        let resp = self.client.get(url).send().await?;

        match resp.status() {
            s if s.is_success() => Ok(resp.json().await?),
            StatusCode::NOT_FOUND => Err(ClientError::NotFound(build_id.to_string())),
            s => {
                let body: ErrorBody = resp.json().await.unwrap_or(ErrorBody {
                    error: None,
                    errors: Vec::new(),
                });
                Err(api_error(s, body))
            }
        }
    }
}

fn api_error(status: StatusCode, body: ErrorBody) -> ClientError {
    let message = body
        .error
        .or_else(|| (!body.errors.is_empty()).then(|| body.errors.join("; ")))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());
    ClientError::Api {
        status: status.as_u16(),
        message,
    }
}
