//! Common utilities for service clients
//!
//! HTTP client construction, error response parsing and request counters
//! shared by every client in this crate.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use reqwest::{header, Client, StatusCode};

use crate::error::{ErrorContext, Result, ServiceError};

/// UserAgent structure for identifying the client to upstream services
#[derive(Debug, Clone)]
pub struct UserAgent {
    /// Application name
    pub app_name: String,

    /// Version string
    pub version: String,

    /// Optional extra info
    pub extra: Option<String>,
}

impl Default for UserAgent {
    fn default() -> Self {
        Self {
            app_name: "street-survey".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            extra: Some("vision-sdk".to_string()),
        }
    }
}

impl UserAgent {
    /// Default user agent tagged with a client name
    pub fn for_client(client: &str) -> Self {
        Self {
            extra: Some(client.to_string()),
            ..Self::default()
        }
    }
}

impl fmt::Display for UserAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.app_name, self.version)?;

        if let Some(ref extra) = self.extra {
            write!(f, " ({})", extra)?;
        }

        Ok(())
    }
}

/// Request counters kept by each client
#[derive(Debug, Default)]
pub struct ClientMetrics {
    request_count: AtomicU64,
    success_count: AtomicU64,
    error_count: AtomicU64,
    bytes_sent: AtomicU64,
    bytes_received: AtomicU64,
    total_latency_ms: AtomicU64,
}

impl ClientMetrics {
    /// Record the outcome of one request
    pub fn record(&self, start_time: Instant, is_success: bool, bytes_sent: u64, bytes_received: u64) {
        self.request_count.fetch_add(1, Ordering::Relaxed);

        if is_success {
            self.success_count.fetch_add(1, Ordering::Relaxed);
        } else {
            self.error_count.fetch_add(1, Ordering::Relaxed);
        }

        self.bytes_sent.fetch_add(bytes_sent, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes_received, Ordering::Relaxed);
        self.total_latency_ms
            .fetch_add(start_time.elapsed().as_millis() as u64, Ordering::Relaxed);
    }

    /// Total requests issued
    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Requests that ended in an error
    pub fn error_count(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    /// Get all metrics as a map
    pub fn as_map(&self) -> HashMap<String, String> {
        let requests = self.request_count();
        let mut map = HashMap::new();

        map.insert("request_count".to_string(), requests.to_string());
        map.insert("success_count".to_string(), self.success_count.load(Ordering::Relaxed).to_string());
        map.insert("error_count".to_string(), self.error_count().to_string());
        map.insert("bytes_sent".to_string(), self.bytes_sent.load(Ordering::Relaxed).to_string());
        map.insert("bytes_received".to_string(), self.bytes_received.load(Ordering::Relaxed).to_string());

        if requests > 0 {
            let mean = self.total_latency_ms.load(Ordering::Relaxed) as f64 / requests as f64;
            map.insert("mean_latency".to_string(), format!("{:.2}ms", mean));
        }

        map
    }
}

/// Build a standard HTTP client with default settings
pub fn build_http_client(user_agent: Option<UserAgent>, timeout: Option<Duration>) -> Result<Client> {
    let mut headers = header::HeaderMap::new();
    let ua = user_agent.unwrap_or_default().to_string();

    headers.insert(
        header::USER_AGENT,
        header::HeaderValue::from_str(&ua)
            .map_err(|e| ServiceError::configuration(format!("Invalid user agent: {}", e)))?,
    );

    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(timeout.unwrap_or_else(|| Duration::from_secs(30)))
        .gzip(true)
        .build()
        .map_err(|e| ServiceError::configuration(format!("Failed to build HTTP client: {}", e)))
}

/// Create error context for HTTP requests
pub fn create_error_context(service_name: &str, status: Option<StatusCode>) -> ErrorContext {
    let mut context = ErrorContext::for_service(service_name);

    if let Some(status_code) = status {
        context = context.status_code(status_code.as_u16());
    }

    context
}

/// Parse error response from HTTP response
pub async fn parse_error_response(service_name: &str, endpoint: &str, response: reqwest::Response) -> ServiceError {
    let status = response.status();
    let mut context = create_error_context(service_name, Some(status))
        .endpoint(endpoint)
        .with("category", crate::error::mapping::classify_http_error(status));

    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => format!("Failed to read error response: {}", e),
    };

    crate::error::mapping::map_http_error(status, &body, &mut context).with_context(context)
}
