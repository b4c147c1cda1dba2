//! Background execution of AI operations.

use std::future::Future;

use tokio::task::JoinHandle;

use crate::error::{AiError, AiResult};

/// An AI operation running on the tokio runtime.
///
/// [`AiTask::cancel`] stops the local task: no further polls are scheduled
/// and [`AiTask::join`] returns [`AiError::Canceled`]. A job already
/// submitted to a provider is not aborted remotely.
#[derive(Debug)]
pub struct AiTask<T> {
    handle: JoinHandle<AiResult<T>>,
}

impl<T: Send + 'static> AiTask<T> {
    /// Start `operation` in the background.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F>(operation: F) -> Self
    where
        F: Future<Output = AiResult<T>> + Send + 'static,
    {
        Self {
            handle: tokio::spawn(operation),
        }
    }

    /// Stop the operation at its next suspension point.
    pub fn cancel(&self) {
        tracing::debug!("Canceling AI task");
        self.handle.abort();
    }

    /// Whether the operation has finished, successfully or not.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the result.
    ///
    /// # Errors
    ///
    /// Returns the operation's error, [`AiError::Canceled`] after
    /// [`AiTask::cancel`], or [`AiError::Task`] if it panicked.
    pub async fn join(self) -> AiResult<T> {
        match self.handle.await {
            Ok(result) => result,
            Err(err) if err.is_cancelled() => Err(AiError::Canceled),
            Err(err) => Err(AiError::Task(err.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_join_returns_result() {
        let task = AiTask::spawn(async { Ok(7u32) });
        assert_eq!(task.join().await.expect("result"), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_pending_operation() {
        let task: AiTask<()> = AiTask::spawn(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        });
        task.cancel();
        assert!(matches!(task.join().await, Err(AiError::Canceled)));
    }
}
