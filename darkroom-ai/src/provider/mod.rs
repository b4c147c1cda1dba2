//! Provider abstraction and the bundled HTTP providers.

mod removebg;
mod replicate;

pub use removebg::{RemoveBgProvider, REMOVEBG_DEFAULT_URL};
pub use replicate::{ReplicateProvider, REPLICATE_DEFAULT_URL};

use async_trait::async_trait;

use crate::error::{AiError, AiResult};
use crate::feature::AiFeature;
use crate::payload::{
    BackgroundRemovalResult, EnhanceResult, GenerativeFillResult, ImagePayload, UpscaleResult,
};

/// A backend offering some subset of [`AiFeature`]s.
///
/// Every operation defaults to [`AiError::Unsupported`], so implementors
/// only override what they offer.
#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Name used in error messages and usage records.
    fn name(&self) -> &str;

    /// Remove the background from `image`.
    async fn remove_background(&self, image: &ImagePayload) -> AiResult<BackgroundRemovalResult> {
        let _ = image;
        Err(self.unsupported(AiFeature::BackgroundRemoval))
    }

    /// Enhance `image`.
    async fn enhance(&self, image: &ImagePayload) -> AiResult<EnhanceResult> {
        let _ = image;
        Err(self.unsupported(AiFeature::Enhance))
    }

    /// Upscale `image` by (up to) `scale`. The result reports the factor used.
    async fn upscale(&self, image: &ImagePayload, scale: u32) -> AiResult<UpscaleResult> {
        let _ = (image, scale);
        Err(self.unsupported(AiFeature::Upscale))
    }

    /// Regenerate the area of `image` under `mask` from `prompt`.
    async fn generative_fill(
        &self,
        image: &ImagePayload,
        mask: &ImagePayload,
        prompt: &str,
    ) -> AiResult<GenerativeFillResult> {
        let _ = (image, mask, prompt);
        Err(self.unsupported(AiFeature::GenerativeFill))
    }

    /// Build the error returned for a feature this provider lacks.
    fn unsupported(&self, feature: AiFeature) -> AiError {
        AiError::Unsupported {
            provider: self.name().to_string(),
            feature,
        }
    }
}

/// Read a failed response's body as a short message.
pub(crate) async fn error_message(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| {
            v.pointer("/errors/0/title")
                .or_else(|| v.get("detail"))
                .or_else(|| v.get("error"))
                .and_then(serde_json::Value::as_str)
                .map(str::to_owned)
        })
        .unwrap_or(body);
    if detail.is_empty() {
        format!("request failed with status {status}")
    } else {
        format!("request failed with status {status}: {detail}")
    }
}
