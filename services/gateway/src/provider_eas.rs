use std::time::Duration;

use anyhow::Context;
use appbuild::BuildSpec;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;

use crate::{
    config::EasCredentials,
    provider::{BuildProvider, ProviderBuild, ProviderError, ProviderInfo},
};

/// Expo Application Services build API.
pub struct EasProvider {
    base_url: String,
    credentials: EasCredentials,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct Envelope {
    data: EasBuild,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EasBuild {
    id: String,
    status: String,
    #[serde(default)]
    artifacts: Option<EasArtifacts>,
    #[serde(default)]
    error: Option<EasBuildError>,
    #[serde(default)]
    completed_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EasArtifacts {
    #[serde(default)]
    build_url: Option<String>,
    #[serde(default)]
    application_archive_url: Option<String>,
}

#[derive(Deserialize)]
struct EasBuildError {
    #[serde(default)]
    message: Option<String>,
}

impl From<EasBuild> for ProviderBuild {
    fn from(b: EasBuild) -> Self {
        ProviderBuild {
            id: b.id,
            status: b.status,
            artifact_url: b
                .artifacts
                .and_then(|a| a.build_url.or(a.application_archive_url)),
            error_message: b.error.and_then(|e| e.message),
            completed_at: b.completed_at,
        }
    }
}

impl EasProvider {
    pub fn new(
        base_url: String,
        credentials: EasCredentials,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build EAS HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            client,
        })
    }

    async fn read_build(resp: reqwest::Response) -> Result<ProviderBuild, ProviderError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Rejected {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("").to_string(),
                body,
            });
        }
        let envelope: Envelope = resp.json().await?;
        Ok(envelope.data.into())
    }
}

#[async_trait]
impl BuildProvider for EasProvider {
    async fn create_build(&self, spec: &BuildSpec) -> Result<ProviderBuild, ProviderError> {
        // The template's app config reads these env values at build time.
        let body = json!({
            "projectId": self.credentials.project_id,
            "platform": "android",
            "profile": spec.build_type.profile(),
            "metadata": {
                "appVersion": "1.0.0",
                "appBuildVersion": "1",
                "gitCommitHash": "latest",
                "credentialsSource": "remote",
            },
            "env": {
                "APP_NAME": spec.app_name,
                "APP_PACKAGE": spec.package_name,
                "WEBSITE_URL": spec.website_url,
            }
        });

        let url = format!("{}/v2/builds", self.base_url);
        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.credentials.token)
            .json(&body)
            .send()
            .await?;
        Self::read_build(resp).await
    }

    async fn get_build(&self, job_id: &str) -> Result<ProviderBuild, ProviderError> {
        let url = format!("{}/v2/builds/{}", self.base_url, job_id);
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.credentials.token)
            .send()
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound(job_id.to_string()));
        }
        Self::read_build(resp).await
    }

    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: "eas".to_string(),
        }
    }
}
