//! Object detection service client
//!
//! Posts a JPEG to `{base_url}/predict` and reads back labelled predictions.
//! The model itself lives behind the inference server; one client instance is
//! meant to be shared by every worker of a run.

mod models;
pub use models::*;

use std::collections::HashMap;
use std::time::{Duration, Instant};

use bytes::Bytes;
use log::debug;
use reqwest::Client;

use crate::config::{DetectorConfig, ServiceConfig};
use crate::core::ServiceClient;
use crate::error::Result;
use crate::resilience::{RetryConfig, RetryExecutor};
use crate::services::common::{build_http_client, parse_error_response, ClientMetrics, UserAgent};

/// Client for the detection inference server
pub struct DetectorClient {
    http_client: Client,
    config: DetectorConfig,
    retry: RetryExecutor,
    metrics: ClientMetrics,
}

impl DetectorClient {
    /// Create a client from a validated configuration (no retries)
    pub fn new(config: DetectorConfig) -> Result<Self> {
        Self::with_retry(config, RetryConfig::default())
    }

    /// Create a client that retries transient failures
    pub fn with_retry(config: DetectorConfig, retry: RetryConfig) -> Result<Self> {
        config.validate()?;

        let http_client = build_http_client(
            Some(UserAgent::for_client("detector")),
            Some(Duration::from_secs(config.timeout_seconds)),
        )?;

        Ok(Self {
            http_client,
            config,
            retry: RetryExecutor::new(retry),
            metrics: ClientMetrics::default(),
        })
    }

    /// Run detection on a JPEG image
    pub async fn predict(&self, jpeg: Bytes) -> Result<Vec<Prediction>> {
        let response = self.retry.execute(|| self.send(jpeg.clone())).await?;
        Ok(response.predictions)
    }

    async fn send(&self, jpeg: Bytes) -> Result<DetectResponse> {
        let start_time = Instant::now();
        let sent = jpeg.len() as u64;
        let url = format!("{}/predict", self.config.base_url.trim_end_matches('/'));

        debug!("Posting {} bytes to detector", sent);

        let mut request = self
            .http_client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "image/jpeg")
            .body(jpeg);

        if let Some(ref api_key) = self.config.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                self.metrics.record(start_time, false, sent, 0);
                return Err(e.into());
            }
        };

        if !response.status().is_success() {
            self.metrics.record(start_time, false, sent, 0);
            return Err(parse_error_response(self.name(), "predict", response).await);
        }

        let bytes = response.bytes().await?;
        self.metrics.record(start_time, true, sent, bytes.len() as u64);

        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl ServiceClient for DetectorClient {
    fn name(&self) -> &str {
        "detector"
    }

    fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn metrics(&self) -> HashMap<String, String> {
        self.metrics.as_map()
    }
}
