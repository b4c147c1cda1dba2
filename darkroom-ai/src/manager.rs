//! Provider registry and operation dispatch.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::Instrument;

use crate::config::AiConfig;
use crate::error::{AiError, AiResult};
use crate::feature::AiFeature;
use crate::payload::{
    BackgroundRemovalResult, EnhanceResult, GenerativeFillResult, ImagePayload, UpscaleResult,
};
use crate::provider::AiProvider;

/// One finished operation, successful or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageRecord {
    /// Feature invoked.
    pub feature: AiFeature,
    /// Provider that handled it.
    pub provider: String,
    /// Whether it returned a result.
    pub success: bool,
    /// Wall time of the call.
    pub latency: Duration,
}

/// Receives a [`UsageRecord`] after every operation that reached a provider.
pub trait UsageSink: Send + Sync {
    /// Record one operation.
    fn record(&self, record: UsageRecord);
}

/// Routes AI operations to providers.
///
/// A provider registered for a feature always wins over the default.
#[derive(Clone, Default)]
pub struct AiManager {
    providers: HashMap<AiFeature, Arc<dyn AiProvider>>,
    default_provider: Option<Arc<dyn AiProvider>>,
    usage: Option<Arc<dyn UsageSink>>,
}

impl fmt::Debug for AiManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let providers: HashMap<_, _> = self
            .providers
            .iter()
            .map(|(feature, p)| (*feature, p.name().to_string()))
            .collect();
        f.debug_struct("AiManager")
            .field("providers", &providers)
            .field(
                "default_provider",
                &self.default_provider.as_ref().map(|p| p.name().to_string()),
            )
            .field("usage", &self.usage.is_some())
            .finish()
    }
}

impl AiManager {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build providers from configuration.
    ///
    /// # Errors
    ///
    /// Returns the first provider construction error (missing key, bad URL).
    pub fn from_config(config: &AiConfig) -> AiResult<Self> {
        let mut manager = Self::new();
        for (feature, provider_config) in &config.features {
            manager.register_provider(*feature, provider_config.build(config.poll)?);
        }
        if let Some(default) = &config.default_provider {
            manager.set_default_provider(default.build(config.poll)?);
        }
        tracing::debug!("AI manager configured: {manager:?}");
        Ok(manager)
    }

    /// Use `provider` for `feature`, replacing any earlier registration.
    pub fn register_provider(&mut self, feature: AiFeature, provider: Arc<dyn AiProvider>) {
        tracing::debug!("Registered {} for {feature}", provider.name());
        self.providers.insert(feature, provider);
    }

    /// Fallback for every feature without its own provider.
    pub fn set_default_provider(&mut self, provider: Arc<dyn AiProvider>) {
        tracing::debug!("Default AI provider: {}", provider.name());
        self.default_provider = Some(provider);
    }

    /// Report every finished operation to `sink`.
    pub fn set_usage_sink(&mut self, sink: Arc<dyn UsageSink>) {
        self.usage = Some(sink);
    }

    /// The provider that would handle `feature`.
    #[must_use]
    pub fn get_provider(&self, feature: AiFeature) -> Option<Arc<dyn AiProvider>> {
        self.providers
            .get(&feature)
            .or(self.default_provider.as_ref())
            .cloned()
    }

    /// Whether any provider would handle `feature`.
    #[must_use]
    pub fn is_feature_available(&self, feature: AiFeature) -> bool {
        self.providers.contains_key(&feature) || self.default_provider.is_some()
    }

    /// Remove the background from `image`.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::NoProvider`] if nothing handles the feature, or
    /// the provider's error.
    pub async fn remove_background(
        &self,
        image: &ImagePayload,
    ) -> AiResult<BackgroundRemovalResult> {
        self.dispatch(AiFeature::BackgroundRemoval, |p| async move {
            p.remove_background(image).await
        })
        .await
    }

    /// Enhance `image`.
    ///
    /// # Errors
    ///
    /// As [`AiManager::remove_background`].
    pub async fn enhance(&self, image: &ImagePayload) -> AiResult<EnhanceResult> {
        self.dispatch(AiFeature::Enhance, |p| async move { p.enhance(image).await })
            .await
    }

    /// Upscale `image`. The returned scale is whatever the provider applied.
    ///
    /// # Errors
    ///
    /// As [`AiManager::remove_background`].
    pub async fn upscale(&self, image: &ImagePayload, scale: u32) -> AiResult<UpscaleResult> {
        self.dispatch(AiFeature::Upscale, |p| async move {
            p.upscale(image, scale).await
        })
        .await
    }

    /// Regenerate the masked area of `image` from `prompt`.
    ///
    /// # Errors
    ///
    /// As [`AiManager::remove_background`].
    pub async fn generative_fill(
        &self,
        image: &ImagePayload,
        mask: &ImagePayload,
        prompt: &str,
    ) -> AiResult<GenerativeFillResult> {
        self.dispatch(AiFeature::GenerativeFill, |p| async move {
            p.generative_fill(image, mask, prompt).await
        })
        .await
    }

    async fn dispatch<T, F, Fut>(&self, feature: AiFeature, call: F) -> AiResult<T>
    where
        F: FnOnce(Arc<dyn AiProvider>) -> Fut,
        Fut: Future<Output = AiResult<T>>,
    {
        let provider = self
            .get_provider(feature)
            .ok_or(AiError::NoProvider(feature))?;
        let name = provider.name().to_string();
        let span = tracing::info_span!("ai_operation", %feature, provider = %name);

        let started = Instant::now();
        let result = call(provider).instrument(span).await;
        let latency = started.elapsed();

        match &result {
            Ok(_) => tracing::info!("{feature} via {name} finished in {latency:?}"),
            Err(err) => tracing::warn!("{feature} via {name} failed after {latency:?}: {err}"),
        }
        if let Some(sink) = &self.usage {
            sink.record(UsageRecord {
                feature,
                provider: name,
                success: result.is_ok(),
                latency,
            });
        }
        result
    }
}
