//! Gemini API client implementation
//!
//! Sends a text prompt plus one inline JPEG to `models/{model}:generateContent`
//! and returns the first candidate's text.

mod models;
pub use models::*;

use std::collections::HashMap;
use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use log::debug;
use reqwest::Client;

use crate::config::{GeminiConfig, ServiceConfig};
use crate::core::ServiceClient;
use crate::error::{Result, ServiceError};
use crate::resilience::{RetryConfig, RetryExecutor};
use crate::services::common::{build_http_client, parse_error_response, ClientMetrics, UserAgent};

/// Gemini API client
pub struct GeminiClient {
    http_client: Client,
    config: GeminiConfig,
    retry: RetryExecutor,
    metrics: ClientMetrics,
}

impl GeminiClient {
    /// Create a client from a validated configuration (no retries)
    pub fn new(config: GeminiConfig) -> Result<Self> {
        Self::with_retry(config, RetryConfig::default())
    }

    /// Create a client that retries transient failures
    pub fn with_retry(config: GeminiConfig, retry: RetryConfig) -> Result<Self> {
        config.validate()?;

        let http_client = build_http_client(
            Some(UserAgent::for_client("gemini")),
            Some(Duration::from_secs(config.timeout_seconds)),
        )?;

        Ok(Self {
            http_client,
            config,
            retry: RetryExecutor::new(retry),
            metrics: ClientMetrics::default(),
        })
    }

    /// Model the client talks to
    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    /// Send a raw generateContent request
    pub async fn generate_content(&self, request: &GenerateContentRequest) -> Result<GenerateContentResponse> {
        self.retry.execute(|| self.send(request)).await
    }

    /// Prompt the model with text and a single JPEG image, returning the reply text
    pub async fn generate_with_image(&self, prompt: &str, jpeg: &[u8]) -> Result<String> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some(Role::User),
                parts: vec![Part::text(prompt), Part::image("image/jpeg", BASE64.encode(jpeg))],
            }],
            generation_config: Some(GenerationConfig {
                temperature: Some(0.0),
                response_mime_type: Some("application/json".to_string()),
            }),
        };

        let response = self.generate_content(&request).await?;
        response
            .first_text()
            .ok_or_else(|| ServiceError::parsing("Gemini returned no text candidates"))
    }

    async fn send(&self, request: &GenerateContentRequest) -> Result<GenerateContentResponse> {
        let start_time = Instant::now();
        let body = serde_json::to_vec(request)?;
        let sent = body.len() as u64;

        debug!("Sending generateContent request to model {} ({} bytes)", self.config.model, sent);

        let response = match self
            .http_client
            .post(self.endpoint())
            .query(&[("key", self.config.api_key.as_str())])
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                self.metrics.record(start_time, false, sent, 0);
                return Err(e.into());
            }
        };

        if !response.status().is_success() {
            self.metrics.record(start_time, false, sent, 0);
            return Err(parse_error_response(self.name(), "generateContent", response).await);
        }

        let bytes = response.bytes().await?;
        self.metrics.record(start_time, true, sent, bytes.len() as u64);

        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl ServiceClient for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn metrics(&self) -> HashMap<String, String> {
        self.metrics.as_map()
    }
}
