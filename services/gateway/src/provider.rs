use appbuild::{BuildSpec, BuildStatus, ProviderSnapshot};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Identifies the provider on the health endpoint.
#[derive(Debug, Clone)]
pub struct ProviderInfo {
    pub name: String,
}

/// One job as the provider describes it, vocabulary untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderBuild {
    pub id: String,
    pub status: String,
    pub artifact_url: Option<String>,
    pub error_message: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ProviderBuild {
    /// Map onto the local state machine; `None` if the status is unknown.
    pub fn snapshot(&self) -> Option<ProviderSnapshot> {
        BuildStatus::from_provider(&self.status).map(|status| ProviderSnapshot {
            status,
            artifact_url: self.artifact_url.clone(),
            error_message: self.error_message.clone(),
            completed_at: self.completed_at,
        })
    }
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider rejected request: {status} {status_text}: {body}")]
    Rejected {
        status: u16,
        status_text: String,
        body: String,
    },

    #[error("provider has no job {0}")]
    NotFound(String),

    #[error("provider request timed out")]
    Timeout,

    #[error("provider request failed: {0}")]
    Transport(String),

    #[error("unexpected provider response: {0}")]
    Decode(String),
}

impl ProviderError {
    /// Expected to clear up on a later attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Timeout | ProviderError::Transport(_) => true,
            ProviderError::Rejected { status, .. } => *status >= 500 || *status == 429,
            ProviderError::NotFound(_) | ProviderError::Decode(_) => false,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout
        } else if e.is_decode() {
            ProviderError::Decode(e.to_string())
        } else {
            ProviderError::Transport(e.to_string())
        }
    }
}

/// Cloud service that runs native Android builds.
#[async_trait]
pub trait BuildProvider: Send + Sync {
    /// Start one Android build for a validated request.
    async fn create_build(&self, spec: &BuildSpec) -> Result<ProviderBuild, ProviderError>;
    async fn get_build(&self, job_id: &str) -> Result<ProviderBuild, ProviderError>;
    fn info(&self) -> ProviderInfo;
}
