use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    request::{BuildSpec, BuildType},
    status::BuildStatus,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    #[serde(rename = "type")]
    pub level: LogLevel,
}

impl LogEntry {
    pub fn new(timestamp: DateTime<Utc>, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            message: message.into(),
            level,
        }
    }
}

/// What the provider currently reports for one job, already mapped onto the
/// local vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSnapshot {
    pub status: BuildStatus,
    pub artifact_url: Option<String>,
    pub error_message: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ProviderSnapshot {
    /// A bare status with no artifact, error or completion time.
    pub fn status_only(status: BuildStatus) -> Self {
        Self {
            status,
            artifact_url: None,
            error_message: None,
            completed_at: None,
        }
    }
}

/// Outcome of applying a provider snapshot to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Unchanged,
    Advanced { from: BuildStatus, to: BuildStatus },
    /// The provider reported a move the state machine does not allow.
    Rejected { from: BuildStatus, to: BuildStatus },
}

/// One submission, keyed by its local id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildRecord {
    pub id: String,
    pub provider_job_id: String,
    pub status: BuildStatus,
    pub website_url: String,
    pub app_name: String,
    pub package_name: String,
    pub build_type: BuildType,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub download_url: Option<String>,
    pub provider_detail_url: Option<String>,
    pub logs: Vec<LogEntry>,
}

impl BuildRecord {
    /// Record for a job the provider just accepted, seeded with a single
    /// queuing log entry.
    ///
    /// A job that is already terminal at creation is frozen right away, so
    /// its duration and artifact never change afterwards.
    pub fn submitted(
        id: String,
        provider_job_id: String,
        initial: &ProviderSnapshot,
        spec: &BuildSpec,
        provider_detail_url: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let status = initial.status;
        Self {
            id,
            provider_job_id,
            status,
            website_url: spec.website_url.clone(),
            app_name: spec.app_name.clone(),
            package_name: spec.package_name.clone(),
            build_type: spec.build_type,
            started_at: now,
            completed_at: status.is_terminal().then(|| initial.completed_at.unwrap_or(now)),
            updated_at: now,
            download_url: match status {
                BuildStatus::Finished => initial.artifact_url.clone(),
                _ => None,
            },
            provider_detail_url,
            logs: vec![LogEntry::new(now, LogLevel::Info, "Build queued on Expo EAS")],
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Fold a provider observation into the record.
    ///
    /// Terminal records are never touched. Each accepted move appends exactly
    /// one log entry.
    pub fn apply_snapshot(
        &mut self,
        snapshot: &ProviderSnapshot,
        now: DateTime<Utc>,
    ) -> Transition {
        let from = self.status;
        let to = snapshot.status;

        if from == to {
            return Transition::Unchanged;
        }
        if !from.can_transition_to(to) {
            return Transition::Rejected { from, to };
        }

        self.status = to;
        self.updated_at = now;

        match to {
            BuildStatus::Queued => {}
            BuildStatus::Building => {
                self.logs
                    .push(LogEntry::new(now, LogLevel::Info, "Build started on Expo Cloud"));
            }
            BuildStatus::Finished => {
                self.download_url = snapshot.artifact_url.clone();
                self.completed_at = Some(snapshot.completed_at.unwrap_or(now));
                self.logs
                    .push(LogEntry::new(now, LogLevel::Success, "Build completed successfully"));
            }
            BuildStatus::Error => {
                self.completed_at = Some(snapshot.completed_at.unwrap_or(now));
                let reason = snapshot
                    .error_message
                    .as_deref()
                    .unwrap_or("provider reported an error");
                self.logs
                    .push(LogEntry::new(now, LogLevel::Error, format!("Build failed: {reason}")));
            }
        }

        Transition::Advanced { from, to }
    }

    /// Append a warning entry unless the record is terminal or the newest
    /// entry already says the same thing. Returns whether the log grew.
    pub fn note_warning(&mut self, message: impl Into<String>, now: DateTime<Utc>) -> bool {
        let message = message.into();
        if self.is_terminal() || self.logs.last().is_some_and(|last| last.message == message) {
            return false;
        }
        self.logs.push(LogEntry::new(now, LogLevel::Warning, message));
        self.updated_at = now;
        true
    }

    /// Elapsed build time; frozen once the record is terminal.
    pub fn duration(&self, now: DateTime<Utc>) -> String {
        let end = match (self.is_terminal(), self.completed_at) {
            (true, Some(done)) => done,
            _ => now,
        };
        format_duration(end - self.started_at)
    }
}

/// `"{minutes}m {seconds}s"`, negative spans clamp to zero.
pub fn format_duration(span: Duration) -> String {
    let secs = span.num_seconds().max(0);
    format!("{}m {}s", secs / 60, secs % 60)
}
