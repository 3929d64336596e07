use std::sync::Arc;

use appbuild::{BuildRecord, BuildStatus, BuildType, LogEntry, LogLevel, Transition};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    config::StatusMode,
    provider::{BuildProvider, ProviderError},
    store::{BuildStore, StoreError},
};

#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("build {0} not found")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A record plus fields derived at query time.
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub record: BuildRecord,
    pub duration: String,
    /// Set when the provider could not be asked; `record` is the last known
    /// state.
    pub unavailable: Option<String>,
    pub synthetic: bool,
}

impl StatusReport {
    fn current(record: BuildRecord, now: DateTime<Utc>) -> Self {
        let duration = record.duration(now);
        Self {
            record,
            duration,
            unavailable: None,
            synthetic: false,
        }
    }

    fn stale(record: BuildRecord, now: DateTime<Utc>, reason: impl Into<String>) -> Self {
        Self {
            unavailable: Some(reason.into()),
            ..Self::current(record, now)
        }
    }
}

/// Where build status comes from. One implementation is picked at startup.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn status(&self, local_id: &str) -> Result<StatusReport, MirrorError>;
    fn mode(&self) -> StatusMode;
}

/// Mirrors the provider into the build store.
pub struct ProviderMirror {
    store: BuildStore,
    provider: Option<Arc<dyn BuildProvider>>,
}

impl ProviderMirror {
    pub fn new(store: BuildStore, provider: Option<Arc<dyn BuildProvider>>) -> Self {
        Self { store, provider }
    }

    /// Write `record` if the stored status is still `observed`; otherwise a
    /// concurrent poll got there first and its row is returned instead.
    async fn persist(
        &self,
        record: BuildRecord,
        observed: BuildStatus,
    ) -> Result<BuildRecord, MirrorError> {
        if self.store.compare_and_set(&record, observed).await? {
            return Ok(record);
        }
        self.store
            .get(&record.id)
            .await?
            .ok_or_else(|| MirrorError::NotFound(record.id.clone()))
    }
}

fn unavailable_reason(err: &ProviderError) -> &'static str {
    match err {
        ProviderError::NotFound(_) => "build provider has no record of this job",
        ProviderError::Timeout => "build provider timed out",
        _ => "build provider unavailable",
    }
}

#[async_trait]
impl StatusSource for ProviderMirror {
    async fn status(&self, local_id: &str) -> Result<StatusReport, MirrorError> {
        let mut record = self
            .store
            .get(local_id)
            .await?
            .ok_or_else(|| MirrorError::NotFound(local_id.to_string()))?;
        let now = Utc::now();

        if record.is_terminal() {
            return Ok(StatusReport::current(record, now));
        }

        let Some(provider) = &self.provider else {
            return Ok(StatusReport::stale(record, now, "build provider is not configured"));
        };

        let job = match provider.get_build(&record.provider_job_id).await {
            Ok(job) => job,
            Err(e) => {
                warn!(
                    build_id = %record.id,
                    job_id = %record.provider_job_id,
                    transient = e.is_transient(),
                    error = %e,
                    "mirror: provider lookup failed"
                );
                return Ok(StatusReport::stale(record, now, unavailable_reason(&e)));
            }
        };

        let observed = record.status;
        let Some(snapshot) = job.snapshot() else {
            warn!(
                build_id = %record.id,
                provider_status = %job.status,
                "mirror: unknown provider status"
            );
            let note = format!("Build provider reported unknown status \"{}\"", job.status);
            if record.note_warning(note, now) {
                record = self.persist(record, observed).await?;
            }
            return Ok(StatusReport::current(record, now));
        };

        match record.apply_snapshot(&snapshot, now) {
            Transition::Unchanged => {}
            Transition::Rejected { from, to } => {
                warn!(build_id = %record.id, %from, %to, "mirror: ignoring backward transition");
                let note = format!("Ignored provider status change from {from} to {to}");
                if record.note_warning(note, now) {
                    record = self.persist(record, observed).await?;
                }
            }
            Transition::Advanced { from, to } => {
                record = self.persist(record, observed).await?;
                info!(build_id = %record.id, %from, %to, "mirror: status advanced");
            }
        }

        Ok(StatusReport::current(record, now))
    }

    fn mode(&self) -> StatusMode {
        StatusMode::Live
    }
}

/// Synthetic completed build served for every id. Never reads the store.
#[derive(Debug, Default)]
pub struct DemoStatus;

const DEMO_BUILD_SECS: i64 = 30;

const DEMO_STEPS: &[(i64, LogLevel, &str)] = &[
    (0, LogLevel::Info, "Build queued successfully"),
    (2, LogLevel::Info, "Preparing build environment..."),
    (5, LogLevel::Info, "Processing app configuration..."),
    (8, LogLevel::Info, "Starting EAS Cloud build..."),
    (15, LogLevel::Info, "Compiling JavaScript bundle..."),
    (22, LogLevel::Info, "Building Android package..."),
    (27, LogLevel::Info, "Signing application..."),
    (30, LogLevel::Success, "Build completed successfully!"),
];

impl DemoStatus {
    pub fn record(local_id: &str, now: DateTime<Utc>) -> BuildRecord {
        let started_at = now - Duration::seconds(DEMO_BUILD_SECS);
        let logs = DEMO_STEPS
            .iter()
            .map(|(offset, level, message)| {
                LogEntry::new(started_at + Duration::seconds(*offset), *level, *message)
            })
            .collect();

        BuildRecord {
            id: local_id.to_string(),
            provider_job_id: local_id.to_string(),
            status: BuildStatus::Finished,
            website_url: "https://example.com".to_string(),
            app_name: "Demo App".to_string(),
            package_name: "com.demo.app".to_string(),
            build_type: BuildType::Apk,
            started_at,
            completed_at: Some(now),
            updated_at: now,
            download_url: Some(format!("https://expo.dev/artifacts/eas/{local_id}.apk")),
            provider_detail_url: Some(format!("https://expo.dev/builds/{local_id}")),
            logs,
        }
    }
}

#[async_trait]
impl StatusSource for DemoStatus {
    async fn status(&self, local_id: &str) -> Result<StatusReport, MirrorError> {
        let now = Utc::now();
        Ok(StatusReport {
            synthetic: true,
            ..StatusReport::current(Self::record(local_id, now), now)
        })
    }

    fn mode(&self) -> StatusMode {
        StatusMode::Demo
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use appbuild::BuildSpec;

    use super::*;
    use crate::{
        submitter::{DetailLinks, Submitter},
        testing::FakeProvider,
    };

    struct Fixture {
        provider: Arc<FakeProvider>,
        mirror: ProviderMirror,
        build_id: String,
        job_id: String,
    }

    async fn fixture() -> Fixture {
        let provider = Arc::new(FakeProvider::default());
        let store = BuildStore::in_memory().await.unwrap();
        let dyn_provider: Arc<dyn BuildProvider> = provider.clone();
        let submitter =
            Submitter::new(Some(dyn_provider.clone()), store.clone(), DetailLinks::default());
        let record = submitter
            .submit(BuildSpec {
                website_url: "https://example.com".into(),
                app_name: "Example".into(),
                package_name: "com.example.app".into(),
                build_type: BuildType::Apk,
            })
            .await
            .unwrap();

        Fixture {
            provider,
            mirror: ProviderMirror::new(store, Some(dyn_provider)),
            build_id: record.id,
            job_id: record.provider_job_id,
        }
    }

    #[tokio::test]
    async fn follows_provider_to_finished() {
        let f = fixture().await;

        let report = f.mirror.status(&f.build_id).await.unwrap();
        assert_eq!(report.record.status, BuildStatus::Queued);
        assert!(report.unavailable.is_none());

        f.provider.set_status(&f.job_id, "in-progress", None);
        let report = f.mirror.status(&f.build_id).await.unwrap();
        assert_eq!(report.record.status, BuildStatus::Building);
        assert_eq!(report.record.logs.len(), 2);

        f.provider
            .set_status(&f.job_id, "finished", Some("https://expo.dev/artifacts/eas/x.apk"));
        let report = f.mirror.status(&f.build_id).await.unwrap();
        assert_eq!(report.record.status, BuildStatus::Finished);
        assert_eq!(
            report.record.download_url.as_deref(),
            Some("https://expo.dev/artifacts/eas/x.apk")
        );
    }

    #[tokio::test]
    async fn terminal_records_are_frozen() {
        let f = fixture().await;
        f.provider.set_status(&f.job_id, "errored", None);
        let first = f.mirror.status(&f.build_id).await.unwrap();
        assert_eq!(first.record.status, BuildStatus::Error);
        let gets_after_terminal = f.provider.gets();

        // Provider changes its mind; the mirror must not.
        f.provider.set_status(&f.job_id, "finished", Some("https://late/artifact.apk"));
        for _ in 0..3 {
            let again = f.mirror.status(&f.build_id).await.unwrap();
            assert_eq!(again.record.status, first.record.status);
            assert_eq!(again.record.download_url, first.record.download_url);
            assert_eq!(again.record.logs, first.record.logs);
            assert_eq!(again.duration, first.duration);
        }
        assert_eq!(f.provider.gets(), gets_after_terminal);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let f = fixture().await;
        let err = f.mirror.status("nope").await.unwrap_err();
        assert!(matches!(err, MirrorError::NotFound(_)));
    }

    #[tokio::test]
    async fn provider_outage_is_labelled_not_fabricated() {
        let f = fixture().await;
        f.provider.outage.store(true, Ordering::SeqCst);

        let report = f.mirror.status(&f.build_id).await.unwrap();
        assert_eq!(report.record.status, BuildStatus::Queued);
        assert_eq!(report.unavailable.as_deref(), Some("build provider timed out"));
        assert!(!report.synthetic);
    }

    #[tokio::test]
    async fn vanished_provider_job_is_labelled() {
        let f = fixture().await;
        f.provider.forget(&f.job_id);

        let report = f.mirror.status(&f.build_id).await.unwrap();
        assert_eq!(report.record.status, BuildStatus::Queued);
        assert!(report.unavailable.is_some());
    }

    #[tokio::test]
    async fn unknown_provider_status_keeps_status_and_warns_once() {
        let f = fixture().await;
        f.provider.set_status(&f.job_id, "paused", None);

        for _ in 0..2 {
            let report = f.mirror.status(&f.build_id).await.unwrap();
            assert_eq!(report.record.status, BuildStatus::Queued);
            assert_eq!(report.record.logs.len(), 2);
            assert_eq!(report.record.logs[1].level, LogLevel::Warning);
        }
    }

    #[tokio::test]
    async fn backward_move_is_logged_as_warning() {
        let f = fixture().await;
        f.provider.set_status(&f.job_id, "in-progress", None);
        f.mirror.status(&f.build_id).await.unwrap();

        f.provider.set_status(&f.job_id, "in-queue", None);
        let report = f.mirror.status(&f.build_id).await.unwrap();
        assert_eq!(report.record.status, BuildStatus::Building);
        let last = report.record.logs.last().unwrap();
        assert_eq!(last.level, LogLevel::Warning);
        assert_eq!(last.message, "Ignored provider status change from building to queued");
    }

    #[tokio::test]
    async fn demo_source_serves_completed_build() {
        let report = DemoStatus.status("anything").await.unwrap();
        assert!(report.synthetic);
        assert_eq!(report.record.status, BuildStatus::Finished);
        assert_eq!(report.record.logs.len(), 8);
        assert_eq!(report.duration, "0m 30s");
        assert_eq!(
            report.record.download_url.as_deref(),
            Some("https://expo.dev/artifacts/eas/anything.apk")
        );
    }
}
