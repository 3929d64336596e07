use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle of one build as mirrored from the provider.
///
/// `Queued -> Building -> {Finished, Error}`. The terminal states never
/// transition again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStatus {
    Queued,
    Building,
    Finished,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown build status: {0}")]
pub struct ParseStatusError(pub String);

impl BuildStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildStatus::Queued => "queued",
            BuildStatus::Building => "building",
            BuildStatus::Finished => "finished",
            BuildStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BuildStatus::Finished | BuildStatus::Error)
    }

    fn rank(&self) -> u8 {
        match self {
            BuildStatus::Queued => 0,
            BuildStatus::Building => 1,
            BuildStatus::Finished | BuildStatus::Error => 2,
        }
    }

    /// Whether the mirror may move a record from `self` to `next`.
    ///
    /// Moves are forward only; skipping `Building` is allowed because a fast
    /// provider can finish between two polls.
    pub fn can_transition_to(&self, next: BuildStatus) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }

    /// Map the provider's status vocabulary onto the local enum.
    ///
    /// Accepts both the REST (`in-progress`) and GraphQL (`IN_PROGRESS`)
    /// spellings. Returns `None` for values we do not recognise.
    pub fn from_provider(raw: &str) -> Option<BuildStatus> {
        let normalized = raw.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "new" | "in-queue" | "queued" | "pending" => Some(BuildStatus::Queued),
            "in-progress" | "building" | "pending-cancel" => Some(BuildStatus::Building),
            "finished" | "success" => Some(BuildStatus::Finished),
            "errored" | "error" | "failed" | "canceled" | "cancelled" => Some(BuildStatus::Error),
            _ => None,
        }
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(BuildStatus::Queued),
            "building" => Ok(BuildStatus::Building),
            "finished" => Ok(BuildStatus::Finished),
            "error" => Ok(BuildStatus::Error),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}
