//! Image generation client
//!
//! [`ImageGenerator`] is the seam between the pipeline and the external API. The
//! production implementation, [`OpenAiImageClient`], talks to an OpenAI-compatible
//! `/v1/images/generations` endpoint and classifies every failure into a
//! [`GenerationError`] kind so callers can decide on retries without inspecting
//! HTTP details.

use crate::config::GenerationConfig;
use crate::error::{Error, GenerationError, Result};
use crate::types::GenerationRequest;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

/// Path of the image generation endpoint, relative to the API base URL
pub const IMAGES_ENDPOINT: &str = "/v1/images/generations";

/// Something that turns a prompt into a downloadable image URL
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Request exactly one image and return its URL
    ///
    /// # Errors
    ///
    /// - [`GenerationError::Permanent`] if the request was rejected
    /// - [`GenerationError::RateLimited`] if the quota or throughput limit was hit
    /// - [`GenerationError::Transient`] for connectivity and server-side failures
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> std::result::Result<String, GenerationError>;
}

#[derive(Debug, Serialize)]
struct ImagesRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u8,
    size: &'static str,
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// [`ImageGenerator`] backed by an OpenAI-compatible HTTP API
#[derive(Clone)]
pub struct OpenAiImageClient {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl std::fmt::Debug for OpenAiImageClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiImageClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl OpenAiImageClient {
    /// Create a client for the endpoint described by `config`
    ///
    /// # Errors
    /// Returns an error if the API key is empty or the HTTP client cannot be built
    pub fn new(api_key: impl Into<String>, config: &GenerationConfig) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::config("OPENAI_API_KEY", "API key must not be empty"));
        }

        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("feeling-images/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http_client,
            endpoint: format!("{}{IMAGES_ENDPOINT}", config.api_base.trim_end_matches('/')),
            api_key,
        })
    }

    /// Full URL requests are sent to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ImageGenerator for OpenAiImageClient {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> std::result::Result<String, GenerationError> {
        debug!(leaf = %request.path, prompt = %request.prompt, "generating image");

        let body = ImagesRequest {
            model: &request.model,
            prompt: &request.prompt,
            n: 1,
            size: request.size.as_str(),
        };

        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let message = if e.is_timeout() {
                    format!("request to {} timed out", self.endpoint)
                } else if e.is_connect() {
                    format!("connection to {} failed: {e}", self.endpoint)
                } else {
                    format!("request to {} failed: {e}", self.endpoint)
                };
                error!(leaf = %request.path, error = %message, "API error");
                GenerationError::Transient { message }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let err = classify_status(status, api_error_message(&text, status));
            match &err {
                GenerationError::RateLimited { .. } => {
                    warn!(leaf = %request.path, "rate limit error encountered")
                }
                GenerationError::Permanent { message } => {
                    error!(leaf = %request.path, error = %message, "permanent failure from API")
                }
                GenerationError::Transient { message } => {
                    error!(leaf = %request.path, error = %message, "API error")
                }
            }
            return Err(err);
        }

        let parsed: ImagesResponse =
            response
                .json()
                .await
                .map_err(|e| GenerationError::Transient {
                    message: format!("malformed response from {}: {e}", self.endpoint),
                })?;

        let url = parsed
            .data
            .into_iter()
            .next()
            .and_then(|image| image.url)
            .ok_or_else(|| GenerationError::Transient {
                message: "response did not contain an image URL".to_string(),
            })?;

        url::Url::parse(&url).map_err(|e| GenerationError::Transient {
            message: format!("response contained an invalid image URL '{url}': {e}"),
        })?;

        debug!(leaf = %request.path, url = %url, "image URL received");
        Ok(url)
    }
}

/// Map a non-success HTTP status to a failure kind
///
/// 400 is a rejected request (malformed prompt, content policy) and 429 a rate
/// limit. Every other status, including other 4xx codes, is reported as a
/// transient API error.
pub(crate) fn classify_status(status: StatusCode, message: String) -> GenerationError {
    match status {
        StatusCode::BAD_REQUEST => GenerationError::Permanent { message },
        StatusCode::TOO_MANY_REQUESTS => GenerationError::RateLimited { message },
        _ => GenerationError::Transient { message },
    }
}

/// Extract `error.message` from an API error body, falling back to the status line
fn api_error_message(body: &str, status: StatusCode) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => format!("HTTP {status}: {}", parsed.error.message),
        Err(_) if body.trim().is_empty() => format!("HTTP {status}"),
        Err(_) => format!("HTTP {status}: {}", body.trim()),
    }
}
