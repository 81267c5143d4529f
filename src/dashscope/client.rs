//! The DashScope API client.
//!
//! One `send` is one POST. Image operations follow it with one GET for the
//! result image. Nothing is retried.

use crate::codec;
use crate::core::error::ApiError;
use crate::core::tensor::ImageTensor;
use crate::dashscope::classify::{self, truncate_chars};
use crate::dashscope::config::{mask_key, ApiConfig};
use crate::dashscope::request::{GenerationRequest, Operation};
use crate::dashscope::response;
use crate::dashscope::transport::{Transport, UreqTransport};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Characters of a response body written to the debug log.
const LOG_BODY_CHARS: usize = 500;

/// Payload extracted from a successful call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiResponse {
    /// Remote URL of a generated or edited image.
    ImageUrl(String),
    /// Vision model answer.
    Text(String),
}

/// A downloaded result image and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    /// `[1, H, W, C]` tensor in `[0, 1]`.
    pub image: ImageTensor,
    pub url: String,
}

/// Client shared by all nodes.
pub struct ApiClient {
    config: Arc<ApiConfig>,
    transport: Box<dyn Transport>,
}

impl ApiClient {
    /// Create a client using the blocking `ureq` transport.
    pub fn new(config: Arc<ApiConfig>) -> Self {
        let transport = UreqTransport::new(config.timeout());
        Self::with_transport(config, Box::new(transport))
    }

    /// Create a client on a custom transport.
    pub fn with_transport(config: Arc<ApiConfig>, transport: Box<dyn Transport>) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }
    /// Send `request` and extract its result.
    ///
    /// Fails with `Configuration` before touching the network when no key is
    /// available for the request's region.
    pub fn send(&self, request: &GenerationRequest) -> Result<ApiResponse, ApiError> {
        let region = request.region();
        let api_key = self.config.api_key_for(region).inspect_err(|e| log::warn!("{}", e))?;

        let operation = request.operation();
        let endpoints = self.config.endpoints();
        let mut headers = vec![
            ("Authorization", format!("Bearer {}", api_key)),
            ("Content-Type", "application/json".to_string()),
        ];
        let url = if operation.produces_image() {
            headers.push(("X-DashScope-Async", "DISABLE".to_string()));
            endpoints.generation(region)
        } else {
            endpoints.chat(region)
        };

        log::info!(
            "Qwen {} request: model={}, region={}, endpoint={}, key={}",
            operation,
            request.model(),
            region,
            url,
            mask_key(api_key)
        );

        let payload = request.to_payload();
        let response = self.transport.post_json(url, &headers, &payload).map_err(|e| {
            let error = classify::transport_failure(&e);
            log::warn!("{}", error);
            error
        })?;

        let body = response.text();
        log::debug!(
            "Response status {}: {}",
            response.status,
            truncate_chars(&body, LOG_BODY_CHARS)
        );

        if !response.is_success() {
            let error = classify::classify_status(response.status, &response.reason, &body);
            log::warn!("{}", error);
            return Err(error);
        }

        Self::extract(operation, request.stream(), &body).inspect_err(|e| log::warn!("{}", e))
    }

    fn extract(operation: Operation, stream: bool, body: &str) -> Result<ApiResponse, ApiError> {
        if operation == Operation::Describe && stream {
            return response::collect_stream_description(body)
                .map(ApiResponse::Text)
                .ok_or_else(|| classify::unexpected_format("no streamed content", body));
        }

        let json: Value = serde_json::from_str(body)
            .map_err(|e| classify::unexpected_format(&format!("invalid JSON: {}", e), body))?;

        match operation {
            Operation::TextToImage | Operation::Edit => response::extract_image_url(&json)
                .map(|url| ApiResponse::ImageUrl(url.to_string()))
                .ok_or_else(|| {
                    classify::unexpected_format("missing output.choices[0].message.content[0].image", body)
                }),
            Operation::Describe => response::extract_description(&json)
                .map(ApiResponse::Text)
                .ok_or_else(|| classify::unexpected_format("missing choices[0].message.content", body)),
        }
    }

    /// Download an image and decode it into a `[1, H, W, C]` tensor.
    pub fn fetch_image(&self, url: &str) -> Result<ImageTensor, ApiError> {
        log::info!("Downloading result image from {}", url);
        let response = self.transport.get(url).map_err(|e| {
            let error = ApiError::transport(format!("Image download failed: {}", e));
            log::warn!("{}", error);
            error
        })?;

        if !response.is_success() {
            let error = classify::download_failure(response.status, &response.reason, url);
            log::warn!("{}", error);
            return Err(error);
        }

        codec::decode(&response.body)
    }

    /// Run a text-to-image or edit request and download the result.
    pub fn generate_image(&self, request: &GenerationRequest) -> Result<GeneratedImage, ApiError> {
        match self.send(request)? {
            ApiResponse::ImageUrl(url) => {
                let image = self.fetch_image(&url)?;
                log::info!("Received image {:?}", image.shape());
                Ok(GeneratedImage { image, url })
            }
            ApiResponse::Text(text) => Err(classify::unexpected_format("expected an image URL", &text)),
        }
    }

    /// Run a describe request.
    pub fn describe(&self, request: &GenerationRequest) -> Result<String, ApiError> {
        match self.send(request)? {
            ApiResponse::Text(text) => Ok(text),
            ApiResponse::ImageUrl(url) => Err(classify::unexpected_format("expected text", &url)),
        }
    }
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
