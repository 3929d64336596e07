use std::sync::Arc;

use appbuild::{new_local_id, BuildRecord, BuildSpec, BuildStatus, ProviderSnapshot};
use chrono::Utc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
    provider::{BuildProvider, ProviderError},
    store::{BuildStore, StoreError},
};

#[derive(Debug, Error)]
pub enum SubmitError {
    /// Deployment is missing provider credentials.
    #[error("server misconfiguration: {0}")]
    Configuration(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Builds the informational link to the provider's build page.
#[derive(Debug, Clone, Default)]
pub struct DetailLinks {
    pub account: Option<String>,
    pub project_slug: Option<String>,
}

impl DetailLinks {
    pub fn url(&self, job_id: &str) -> String {
        match (&self.account, &self.project_slug) {
            (Some(account), Some(slug)) => {
                format!("https://expo.dev/accounts/{account}/projects/{slug}/builds/{job_id}")
            }
            _ => format!("https://expo.dev/builds/{job_id}"),
        }
    }
}

/// Turns validated requests into provider jobs and stored records.
pub struct Submitter {
    provider: Option<Arc<dyn BuildProvider>>,
    store: BuildStore,
    links: DetailLinks,
}

impl Submitter {
    pub fn new(
        provider: Option<Arc<dyn BuildProvider>>,
        store: BuildStore,
        links: DetailLinks,
    ) -> Self {
        Self {
            provider,
            store,
            links,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    pub async fn submit(&self, spec: BuildSpec) -> Result<BuildRecord, SubmitError> {
        let provider = self.provider.as_ref().ok_or_else(|| {
            SubmitError::Configuration("missing EXPO_TOKEN or EAS_PROJECT_ID".into())
        })?;

        let job = provider.create_build(&spec).await?;

        let initial = job.snapshot().unwrap_or_else(|| {
            warn!(
                job_id = %job.id,
                provider_status = %job.status,
                "submit: unknown initial status, assuming queued"
            );
            ProviderSnapshot::status_only(BuildStatus::Queued)
        });

        let record = BuildRecord::submitted(
            new_local_id(),
            job.id.clone(),
            &initial,
            &spec,
            Some(self.links.url(&job.id)),
            Utc::now(),
        );

        if let Err(e) = self.store.insert(&record).await {
            // The provider job exists but nobody can poll it; keep the id in the logs.
            error!(job_id = %job.id, error = %e, "submit: failed to persist build record");
            return Err(e.into());
        }

        info!(
            build_id = %record.id,
            job_id = %record.provider_job_id,
            profile = spec.build_type.profile(),
            status = %record.status,
            "submit: build queued"
        );
        Ok(record)
    }
}
