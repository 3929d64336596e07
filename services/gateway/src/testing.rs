use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex,
    },
};

use appbuild::BuildSpec;
use async_trait::async_trait;

use crate::provider::{BuildProvider, ProviderBuild, ProviderError, ProviderInfo};

/// Scriptable in-process provider.
#[derive(Default)]
pub struct FakeProvider {
    jobs: Mutex<HashMap<String, ProviderBuild>>,
    pub creates: AtomicUsize,
    pub gets: AtomicUsize,
    pub reject_creates: AtomicBool,
    pub outage: AtomicBool,
    /// Status reported by `create_build`; `"new"` when unset.
    pub initial_status: Mutex<Option<String>>,
}

impl FakeProvider {
    pub fn set_status(&self, job_id: &str, status: &str, artifact_url: Option<&str>) {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs.get_mut(job_id).expect("unknown fake job");
        job.status = status.to_string();
        job.artifact_url = artifact_url.map(str::to_string);
    }

    pub fn forget(&self, job_id: &str) {
        self.jobs.lock().unwrap().remove(job_id);
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BuildProvider for FakeProvider {
    async fn create_build(&self, _spec: &BuildSpec) -> Result<ProviderBuild, ProviderError> {
        let n = self.creates.fetch_add(1, Ordering::SeqCst) + 1;
        if self.reject_creates.load(Ordering::SeqCst) {
            return Err(ProviderError::Rejected {
                status: 403,
                status_text: "Forbidden".into(),
                body: r#"{"errors":[{"message":"bad token"}]}"#.into(),
            });
        }
        let job = ProviderBuild {
            id: format!("job-{n}"),
            status: self
                .initial_status
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| "new".into()),
            artifact_url: None,
            error_message: None,
            completed_at: None,
        };
        self.jobs.lock().unwrap().insert(job.id.clone(), job.clone());
        Ok(job)
    }

    async fn get_build(&self, job_id: &str) -> Result<ProviderBuild, ProviderError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.outage.load(Ordering::SeqCst) {
            return Err(ProviderError::Timeout);
        }
        self.jobs
            .lock()
            .unwrap()
            .get(job_id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(job_id.to_string()))
    }

    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: "fake".into(),
        }
    }
}
