//! Replicate client.
//!
//! Two-phase: create a prediction, then poll it until it reaches a
//! terminal status and download the output URL. Each provider instance
//! drives one model version.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

use super::{error_message, AiProvider};
use crate::error::{AiError, AiResult};
use crate::payload::{
    BackgroundRemovalResult, EnhanceResult, GenerativeFillResult, ImagePayload, UpscaleResult,
};
use crate::poll::{poll_until, JobStatus, PollConfig};

/// Public Replicate API root.
pub const REPLICATE_DEFAULT_URL: &str = "https://api.replicate.com/v1/";

/// Largest factor sent to upscaling models.
const MAX_UPSCALE: u32 = 4;

const NAME: &str = "replicate";

#[derive(Debug, Clone, Deserialize)]
struct Prediction {
    id: String,
    status: String,
    #[serde(default)]
    output: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

impl Prediction {
    fn status(&self) -> JobStatus {
        match self.status.as_str() {
            "succeeded" => JobStatus::Succeeded,
            "failed" => JobStatus::Failed(
                self.error
                    .as_ref()
                    .and_then(Value::as_str)
                    .unwrap_or("prediction failed")
                    .to_string(),
            ),
            "canceled" => JobStatus::Canceled,
            _ => JobStatus::Pending,
        }
    }

    /// First output URL. Models return either a string or a list.
    fn output_url(&self) -> Option<String> {
        match self.output.as_ref()? {
            Value::String(url) => Some(url.clone()),
            Value::Array(items) => items.iter().find_map(Value::as_str).map(str::to_owned),
            _ => None,
        }
    }
}

/// Hosted models on Replicate.
#[derive(Debug, Clone)]
pub struct ReplicateProvider {
    http: Client,
    base: Url,
    api_token: String,
    model_version: String,
    poll: PollConfig,
}

impl ReplicateProvider {
    /// Create a client for one model version.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::MissingApiKey`] for an empty token,
    /// [`AiError::InvalidUrl`] for a bad base URL, or [`AiError::Http`] if the
    /// HTTP client cannot be built.
    pub fn new(
        api_token: impl Into<String>,
        model_version: impl Into<String>,
        base_url: Option<&str>,
        poll: PollConfig,
    ) -> AiResult<Self> {
        let api_token = api_token.into();
        if api_token.trim().is_empty() {
            return Err(AiError::MissingApiKey(NAME.to_string()));
        }
        let model_version = model_version.into();
        if model_version.trim().is_empty() {
            return Err(AiError::provider(NAME, "missing model version"));
        }

        let mut base = Url::parse(base_url.unwrap_or(REPLICATE_DEFAULT_URL)).map_err(|e| {
            AiError::InvalidUrl {
                provider: NAME.to_string(),
                message: e.to_string(),
            }
        })?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let http = Client::builder()
            .user_agent(concat!("darkroom/", env!("CARGO_PKG_VERSION")))
            .timeout(poll.request_timeout)
            .build()
            .map_err(|e| AiError::http(NAME, e))?;

        Ok(Self {
            http,
            base,
            api_token,
            model_version,
            poll,
        })
    }

    /// Model version predictions are created against.
    #[must_use]
    pub fn model_version(&self) -> &str {
        &self.model_version
    }

    fn endpoint(&self, path: &str) -> AiResult<Url> {
        self.base.join(path).map_err(|e| AiError::InvalidUrl {
            provider: NAME.to_string(),
            message: e.to_string(),
        })
    }

    async fn submit(&self, input: Value) -> AiResult<Prediction> {
        let response = self
            .http
            .post(self.endpoint("predictions")?)
            .bearer_auth(&self.api_token)
            .json(&json!({ "version": self.model_version, "input": input }))
            .send()
            .await
            .map_err(|e| AiError::http(NAME, e))?;
        if !response.status().is_success() {
            return Err(AiError::provider(NAME, error_message(response).await));
        }
        response.json().await.map_err(|e| AiError::http(NAME, e))
    }

    async fn fetch(&self, id: &str) -> AiResult<Prediction> {
        let response = self
            .http
            .get(self.endpoint(&format!("predictions/{id}"))?)
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| AiError::http(NAME, e))?;
        if !response.status().is_success() {
            return Err(AiError::provider(NAME, error_message(response).await));
        }
        response.json().await.map_err(|e| AiError::http(NAME, e))
    }

    async fn download(&self, url: &str) -> AiResult<ImagePayload> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| AiError::http(NAME, e))?;
        if !response.status().is_success() {
            return Err(AiError::provider(NAME, error_message(response).await));
        }
        let bytes = response.bytes().await.map_err(|e| AiError::http(NAME, e))?;
        Ok(ImagePayload::new(bytes.to_vec()))
    }

    /// Submit `input`, wait for the prediction and download its output.
    async fn run(&self, input: Value) -> AiResult<ImagePayload> {
        let submitted = self.submit(input).await?;
        let id = submitted.id.clone();
        tracing::debug!("{NAME}: prediction {id} submitted ({})", submitted.status);

        let this = self;
        let id_ref = id.as_str();
        let mut first = Some(submitted);
        let url = poll_until(NAME, &self.poll, move || {
            let known = first.take();
            async move {
                let prediction = match known {
                    Some(p) => p,
                    None => this.fetch(id_ref).await?,
                };
                Ok((prediction.status(), prediction.output_url()))
            }
        })
        .await?;

        tracing::debug!("{NAME}: prediction {id} succeeded, downloading output");
        self.download(&url).await
    }
}

#[async_trait]
impl AiProvider for ReplicateProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn remove_background(&self, image: &ImagePayload) -> AiResult<BackgroundRemovalResult> {
        let foreground = self.run(json!({ "image": image.to_data_uri() })).await?;
        Ok(BackgroundRemovalResult {
            foreground,
            mask: None,
            background: None,
        })
    }

    async fn enhance(&self, image: &ImagePayload) -> AiResult<EnhanceResult> {
        let enhanced = self.run(json!({ "image": image.to_data_uri() })).await?;
        Ok(EnhanceResult { enhanced })
    }

    async fn upscale(&self, image: &ImagePayload, scale: u32) -> AiResult<UpscaleResult> {
        let scale = scale.clamp(1, MAX_UPSCALE);
        let upscaled = self
            .run(json!({ "image": image.to_data_uri(), "scale": scale }))
            .await?;
        Ok(UpscaleResult { upscaled, scale })
    }

    async fn generative_fill(
        &self,
        image: &ImagePayload,
        mask: &ImagePayload,
        prompt: &str,
    ) -> AiResult<GenerativeFillResult> {
        let filled = self
            .run(json!({
                "image": image.to_data_uri(),
                "mask": mask.to_data_uri(),
                "prompt": prompt,
            }))
            .await?;
        Ok(GenerativeFillResult { filled })
    }
}
