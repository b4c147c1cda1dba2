//! AI configuration.
//!
//! Maps each feature to the provider and credentials that serve it:
//!
//! ```json
//! {
//!   "features": {
//!     "backgroundRemoval": { "provider": "removebg", "api_key": "..." },
//!     "upscale": { "provider": "replicate", "api_key": "...", "model_version": "..." }
//!   },
//!   "poll": { "interval": 1000, "max_wait": 300000, "request_timeout": 30000 }
//! }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::AiResult;
use crate::feature::AiFeature;
use crate::poll::PollConfig;
use crate::provider::{AiProvider, RemoveBgProvider, ReplicateProvider};

/// Which bundled provider to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// remove.bg background removal.
    RemoveBg,
    /// Replicate hosted models.
    Replicate,
}

/// Credentials and endpoint for one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider implementation.
    pub provider: ProviderKind,
    /// API key or token. May be left empty and filled from the environment.
    #[serde(default)]
    pub api_key: String,
    /// Override for the provider's public endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Model version (Replicate only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
}

impl ProviderConfig {
    /// Build the provider.
    ///
    /// # Errors
    ///
    /// Returns an error if credentials are missing or the URL is invalid.
    pub fn build(&self, poll: PollConfig) -> AiResult<Arc<dyn AiProvider>> {
        let base_url = self.base_url.as_deref();
        Ok(match self.provider {
            ProviderKind::RemoveBg => Arc::new(RemoveBgProvider::new(
                self.api_key.clone(),
                base_url,
                poll.request_timeout,
            )?),
            ProviderKind::Replicate => Arc::new(ReplicateProvider::new(
                self.api_key.clone(),
                self.model_version.clone().unwrap_or_default(),
                base_url,
                poll,
            )?),
        })
    }
}

/// Feature to provider mapping plus shared polling policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Providers keyed by feature.
    pub features: HashMap<AiFeature, ProviderConfig>,
    /// Fallback for features not listed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_provider: Option<ProviderConfig>,
    /// Timing for polled jobs and HTTP requests.
    pub poll: PollConfig,
}

impl AiConfig {
    /// Fill empty API keys for `kind` with `key`.
    pub fn fill_api_key(&mut self, kind: ProviderKind, key: &str) {
        let configs = self
            .features
            .values_mut()
            .chain(self.default_provider.as_mut());
        for config in configs {
            if config.provider == kind && config.api_key.is_empty() {
                config.api_key = key.to_string();
            }
        }
    }

    /// Whether no provider is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty() && self.default_provider.is_none()
    }
}
