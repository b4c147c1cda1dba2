//! Submit/poll job protocol.
//!
//! Long-running provider jobs move through [`PollState`]: a job is
//! submitted, then polled at a fixed interval until it succeeds, fails, is
//! canceled remotely, or the overall `max_wait` budget runs out. Nothing is
//! retried here; a transport error while polling ends the call.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::error::{AiError, AiResult};

/// Timing for polled jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Delay between status checks.
    #[serde(with = "millis")]
    pub interval: Duration,
    /// Overall budget from submit to terminal status.
    #[serde(with = "millis")]
    pub max_wait: Duration,
    /// Timeout applied to each HTTP request.
    #[serde(with = "millis")]
    pub request_timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_wait: Duration::from_secs(300),
            request_timeout: Duration::from_secs(30),
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::cast_possible_truncation)]
    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Lifecycle of a polled job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// Accepted by the provider, not yet checked.
    Submitted,
    /// At least one status check reported the job still running.
    Polling,
    /// Output is available.
    Succeeded,
    /// The provider reported a failure.
    Failed,
    /// The job was canceled remotely.
    Canceled,
    /// The local budget ran out.
    TimedOut,
}

impl PollState {
    /// Whether no further transitions happen.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::Failed | Self::Canceled | Self::TimedOut
        )
    }

    /// State after a status check returned `status`.
    ///
    /// Terminal states never move.
    #[must_use]
    pub fn after(self, status: &JobStatus) -> Self {
        if self.is_terminal() {
            return self;
        }
        match status {
            JobStatus::Pending => Self::Polling,
            JobStatus::Succeeded => Self::Succeeded,
            JobStatus::Failed(_) => Self::Failed,
            JobStatus::Canceled => Self::Canceled,
        }
    }
}

/// What one status check reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    /// Still queued or running.
    Pending,
    /// Finished with output.
    Succeeded,
    /// Finished with an error message.
    Failed(String),
    /// Canceled on the provider side.
    Canceled,
}

/// Poll `check` until the job reaches a terminal state.
///
/// `check` returns the job status plus whatever the caller needs from a
/// successful response. The first check runs immediately; later checks
/// are spaced by `config.interval`.
///
/// # Errors
///
/// - [`AiError::Provider`] if the job failed.
/// - [`AiError::RemoteCanceled`] if it was canceled remotely.
/// - [`AiError::Timeout`] once `config.max_wait` has elapsed.
/// - Any error returned by `check` itself.
pub async fn poll_until<T, F, Fut>(provider: &str, config: &PollConfig, mut check: F) -> AiResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AiResult<(JobStatus, Option<T>)>>,
{
    let started = Instant::now();
    let deadline = started + config.max_wait;
    let mut state = PollState::Submitted;
    let mut checks = 0u32;

    loop {
        let (status, output) = check().await?;
        checks += 1;
        state = state.after(&status);
        tracing::debug!("{provider}: check {checks} -> {state:?}");

        match (state, status) {
            (PollState::Succeeded, _) => {
                return output.ok_or_else(|| {
                    AiError::provider(provider, "job succeeded without output")
                });
            }
            (PollState::Failed, JobStatus::Failed(message)) => {
                return Err(AiError::provider(provider, message));
            }
            (PollState::Canceled, _) => return Err(AiError::RemoteCanceled(provider.to_string())),
            _ => {}
        }

        let now = Instant::now();
        if now >= deadline {
            tracing::warn!("{provider}: giving up after {checks} checks");
            return Err(AiError::Timeout {
                provider: provider.to_string(),
                waited: now - started,
            });
        }
        tokio::time::sleep(config.interval.min(deadline - now)).await;
    }
}
