use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{client::BuildStatusView, error::ClientError, GatewayClient};

const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);
// 5s * 180 = 15 minutes, longer than a typical cloud Android build.
const DEFAULT_MAX_ATTEMPTS: u32 = 180;

/// Anything that can report the current status of a build.
#[async_trait]
pub trait StatusFetch: Send + Sync {
    async fn fetch_status(&self, build_id: &str) -> Result<BuildStatusView, ClientError>;
}

#[async_trait]
impl StatusFetch for GatewayClient {
    async fn fetch_status(&self, build_id: &str) -> Result<BuildStatusView, ClientError> {
        self.build_status(build_id).await
    }
}

#[derive(Debug, Clone)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone)]
pub enum PollOutcome {
    /// A terminal status was observed.
    Terminal(BuildStatusView),
    /// `max_attempts` requests were made without reaching a terminal status.
    Exhausted { last: Option<BuildStatusView> },
    /// The token was cancelled; no request was started afterwards.
    Cancelled { last: Option<BuildStatusView> },
}

/// Poll `build_id` on a fixed interval until it reaches a terminal status.
///
/// The first request goes out immediately. Transient failures are logged and
/// retried on the next tick; an unknown build or a client error ends the
/// loop. `on_update` sees every successful response in order.
pub async fn poll_until_terminal<F, U>(
    fetcher: &F,
    build_id: &str,
    config: &PollConfig,
    cancel: &CancellationToken,
    mut on_update: U,
) -> Result<PollOutcome, ClientError>
where
    F: StatusFetch + ?Sized,
    U: FnMut(&BuildStatusView),
{
    let mut ticker = interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last = None;

    for attempt in 1..=config.max_attempts {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(PollOutcome::Cancelled { last }),
            _ = ticker.tick() => {}
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(PollOutcome::Cancelled { last }),
            r = fetcher.fetch_status(build_id) => r,
        };

        match result {
            Ok(view) => {
                debug!(build_id, attempt, status = %view.status, "poll: status");
                on_update(&view);
                if view.status.is_terminal() {
                    return Ok(PollOutcome::Terminal(view));
                }
                last = Some(view);
            }
            Err(e) if e.is_transient() => {
                warn!(build_id, attempt, error = %e, "poll: transient failure");
            }
            Err(e) => return Err(e),
        }
    }

    Ok(PollOutcome::Exhausted { last })
}
