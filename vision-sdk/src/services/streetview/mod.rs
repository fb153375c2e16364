//! Street-level imagery client
//!
//! Fetches one JPEG tile for a coordinate and compass heading. The provider
//! authenticates with a `key` query parameter, so request URLs are always
//! passed through `sanitize_for_logging` before they reach a log line.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use bytes::Bytes;
use log::debug;
use reqwest::{Client, StatusCode};

use crate::config::{ServiceConfig, StreetViewConfig};
use crate::core::ServiceClient;
use crate::error::{Result, ServiceError};
use crate::resilience::{RetryConfig, RetryExecutor};
use crate::services::common::{build_http_client, parse_error_response, ClientMetrics, UserAgent};
use crate::util::sanitize_for_logging;

/// Client for the street-level imagery endpoint
pub struct StreetViewClient {
    http_client: Client,
    config: StreetViewConfig,
    retry: RetryExecutor,
    metrics: ClientMetrics,
}

impl StreetViewClient {
    /// Create a client from a validated configuration (no retries)
    pub fn new(config: StreetViewConfig) -> Result<Self> {
        Self::with_retry(config, RetryConfig::default())
    }

    /// Create a client that retries transient failures
    pub fn with_retry(config: StreetViewConfig, retry: RetryConfig) -> Result<Self> {
        config.validate()?;

        let http_client = build_http_client(
            Some(UserAgent::for_client("streetview")),
            Some(Duration::from_secs(config.timeout_seconds)),
        )?;

        Ok(Self {
            http_client,
            config,
            retry: RetryExecutor::new(retry),
            metrics: ClientMetrics::default(),
        })
    }

    /// Current configuration
    pub fn config(&self) -> &StreetViewConfig {
        &self.config
    }

    /// Query parameters for one tile
    pub fn query_params(&self, latitude: f64, longitude: f64, heading: f64) -> Vec<(&'static str, String)> {
        vec![
            ("size", format!("{}x{}", self.config.width, self.config.height)),
            ("location", format!("{:.6},{:.6}", latitude, longitude)),
            ("heading", format!("{}", heading)),
            ("fov", self.config.fov.to_string()),
            ("pitch", self.config.pitch.to_string()),
            ("key", self.config.api_key.clone()),
        ]
    }

    /// Fetch the raw JPEG bytes for one heading at a coordinate
    pub async fn fetch_heading(&self, latitude: f64, longitude: f64, heading: f64) -> Result<Bytes> {
        self.retry
            .execute(|| self.fetch_once(latitude, longitude, heading))
            .await
    }

    async fn fetch_once(&self, latitude: f64, longitude: f64, heading: f64) -> Result<Bytes> {
        let start_time = Instant::now();
        let request = self
            .http_client
            .get(&self.config.base_url)
            .query(&self.query_params(latitude, longitude, heading))
            .build()?;

        debug!("Requesting imagery tile: {}", sanitize_for_logging(request.url().as_str()));

        let response = match self.http_client.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                self.metrics.record(start_time, false, 0, 0);
                return Err(e.into());
            }
        };

        // Only a plain 200 carries a usable tile
        if response.status() != StatusCode::OK {
            self.metrics.record(start_time, false, 0, 0);
            return Err(parse_error_response(self.name(), "streetview", response).await);
        }

        let body = response.bytes().await?;
        self.metrics.record(start_time, !body.is_empty(), 0, body.len() as u64);

        if body.is_empty() {
            return Err(ServiceError::parsing(format!(
                "Empty imagery response for {:.6},{:.6} heading {}",
                latitude, longitude, heading
            )));
        }

        Ok(body)
    }
}

impl ServiceClient for StreetViewClient {
    fn name(&self) -> &str {
        "streetview"
    }

    fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn metrics(&self) -> HashMap<String, String> {
        self.metrics.as_map()
    }
}
