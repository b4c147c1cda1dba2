//! AI error types.

use std::time::Duration;

use darkroom_core::EditorError;
use darkroom_renderer::RenderError;
use thiserror::Error;

use crate::feature::AiFeature;

/// Result type for AI operations.
pub type AiResult<T> = Result<T, AiError>;

/// Errors surfaced by AI operations.
///
/// Provider-side failures carry the provider name so callers can report
/// which backend rejected the call.
#[derive(Debug, Error)]
pub enum AiError {
    /// Nothing is registered for the feature and there is no default.
    #[error("No provider available for {0}")]
    NoProvider(AiFeature),

    /// The resolved provider does not implement the feature.
    #[error("{provider}: {feature} is not supported")]
    Unsupported {
        /// Provider name.
        provider: String,
        /// Requested feature.
        feature: AiFeature,
    },

    /// Provider constructed without credentials.
    #[error("{0}: missing API key")]
    MissingApiKey(String),

    /// The provider's base URL is malformed.
    #[error("{provider}: invalid URL: {message}")]
    InvalidUrl {
        /// Provider name.
        provider: String,
        /// Parse failure.
        message: String,
    },

    /// Transport failure (connection, request timeout, body read).
    #[error("{provider}: HTTP request failed: {source}")]
    Http {
        /// Provider name.
        provider: String,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// The remote side rejected the request or reported a failed job.
    #[error("{provider}: {message}")]
    Provider {
        /// Provider name.
        provider: String,
        /// Remote error description.
        message: String,
    },

    /// The job was canceled remotely.
    #[error("{0}: prediction was canceled")]
    RemoteCanceled(String),

    /// The poll budget ran out before the job finished.
    #[error("{provider}: timed out after {waited:?}")]
    Timeout {
        /// Provider name.
        provider: String,
        /// Time spent polling.
        waited: Duration,
    },

    /// The caller canceled the operation locally.
    #[error("Operation canceled")]
    Canceled,

    /// The background task running the operation panicked.
    #[error("AI task failed: {0}")]
    Task(String),

    /// The document changed while the operation was in flight.
    #[error("Result is stale: document changed from revision {captured} to {current}")]
    Stale {
        /// Revision when the request was submitted.
        captured: u64,
        /// Revision when the result arrived.
        current: u64,
    },

    /// Image decode/encode failure.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Applying the result to the document failed.
    #[error(transparent)]
    Editor(#[from] EditorError),
}

impl AiError {
    pub(crate) fn provider(provider: &str, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn http(provider: &str, source: reqwest::Error) -> Self {
        Self::Http {
            provider: provider.to_string(),
            source,
        }
    }

    /// Whether the error came from talking to a provider, as opposed to local state.
    #[must_use]
    pub fn is_provider_error(&self) -> bool {
        matches!(
            self,
            Self::Http { .. }
                | Self::Provider { .. }
                | Self::RemoteCanceled(_)
                | Self::Timeout { .. }
        )
    }
}
