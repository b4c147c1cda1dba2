//! remove.bg client.
//!
//! Single-phase: one POST with the image as base64 JSON, the response body
//! is the cut-out PNG.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::Serialize;
use url::Url;

use super::{error_message, AiProvider};
use crate::error::{AiError, AiResult};
use crate::payload::{BackgroundRemovalResult, ImagePayload};

/// Public remove.bg endpoint.
pub const REMOVEBG_DEFAULT_URL: &str = "https://api.remove.bg/v1.0/removebg";

const NAME: &str = "remove.bg";

#[derive(Serialize)]
struct RemoveBgRequest<'a> {
    image_file_b64: &'a str,
    size: &'a str,
    format: &'a str,
}

/// Background removal through remove.bg.
#[derive(Debug, Clone)]
pub struct RemoveBgProvider {
    http: Client,
    endpoint: Url,
    api_key: String,
}

impl RemoveBgProvider {
    /// Create a client for `endpoint` (defaults to [`REMOVEBG_DEFAULT_URL`]).
    ///
    /// # Errors
    ///
    /// Returns [`AiError::MissingApiKey`] for an empty key,
    /// [`AiError::InvalidUrl`] for a bad endpoint, or [`AiError::Http`] if
    /// the HTTP client cannot be built.
    pub fn new(
        api_key: impl Into<String>,
        endpoint: Option<&str>,
        request_timeout: Duration,
    ) -> AiResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AiError::MissingApiKey(NAME.to_string()));
        }
        let endpoint = Url::parse(endpoint.unwrap_or(REMOVEBG_DEFAULT_URL)).map_err(|e| {
            AiError::InvalidUrl {
                provider: NAME.to_string(),
                message: e.to_string(),
            }
        })?;
        let http = Client::builder()
            .user_agent(concat!("darkroom/", env!("CARGO_PKG_VERSION")))
            .timeout(request_timeout)
            .build()
            .map_err(|e| AiError::http(NAME, e))?;
        Ok(Self {
            http,
            endpoint,
            api_key,
        })
    }
}

#[async_trait]
impl AiProvider for RemoveBgProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn remove_background(&self, image: &ImagePayload) -> AiResult<BackgroundRemovalResult> {
        let encoded = image.to_base64();
        let response = self
            .http
            .post(self.endpoint.clone())
            .header("X-Api-Key", &self.api_key)
            .header(ACCEPT, "image/png")
            .json(&RemoveBgRequest {
                image_file_b64: &encoded,
                size: "auto",
                format: "png",
            })
            .send()
            .await
            .map_err(|e| AiError::http(NAME, e))?;

        if !response.status().is_success() {
            return Err(AiError::provider(NAME, error_message(response).await));
        }

        let bytes = response.bytes().await.map_err(|e| AiError::http(NAME, e))?;
        if bytes.is_empty() {
            return Err(AiError::provider(NAME, "empty response body"));
        }
        tracing::debug!("{NAME}: received {} bytes", bytes.len());
        Ok(BackgroundRemovalResult {
            foreground: ImagePayload::new(bytes.to_vec()),
            mask: None,
            background: None,
        })
    }
}
