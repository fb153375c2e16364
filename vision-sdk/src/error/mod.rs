//! Normalized errors for the imagery, detector and Gemini clients
//!
//! Every client failure becomes a `ServiceError` category. HTTP failures carry
//! an `ErrorContext` with the service, status and endpoint that produced them,
//! and the retry executor decides on `is_retryable` alone.

use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

pub mod mapping;

/// Result type for Vision SDK operations
pub type Result<T> = std::result::Result<T, ServiceError>;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Permission issues and exhausted quota
    #[error("Authorization error: {0}")]
    Authorization(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    /// 5xx and unclassified statuses
    #[error("Service error: {0}")]
    Service(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Parsing error: {0}")]
    Parsing(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Timeout error: {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{inner}")]
    WithContext {
        inner: Box<ServiceError>,
        context: ErrorContext,
    },
}

macro_rules! constructors {
    ($($name:ident => $variant:ident),+ $(,)?) => {
        $(
            pub fn $name(message: impl Into<String>) -> Self {
                ServiceError::$variant(message.into())
            }
        )+
    };
}

impl ServiceError {
    constructors! {
        network => Network,
        authentication => Authentication,
        authorization => Authorization,
        rate_limit => RateLimit,
        service => Service,
        validation => Validation,
        parsing => Parsing,
        configuration => Configuration,
        timeout => Timeout,
        internal => Internal,
        not_found => NotFound,
    }

    /// Wrap this error in a context layer
    pub fn with_context(self, context: ErrorContext) -> Self {
        ServiceError::WithContext {
            inner: Box::new(self),
            context,
        }
    }

    /// Wrap this error in a context layer holding one key/value
    pub fn with_context_value(self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.with_context(ErrorContext::default().with(key, value))
    }

    /// The innermost error, with every context layer removed
    pub fn root(&self) -> &ServiceError {
        match self {
            ServiceError::WithContext { inner, .. } => inner.root(),
            other => other,
        }
    }

    /// HTTP status of the outermost layer that recorded one
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ServiceError::WithContext { context, inner } => context.status_code.or_else(|| inner.status_code()),
            _ => None,
        }
    }

    /// Transient failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.root(),
            ServiceError::Network(_) | ServiceError::Timeout(_) | ServiceError::RateLimit(_) | ServiceError::Service(_)
        )
    }
}

/// Where an error came from
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub service: String,
    pub status_code: Option<u16>,
    pub endpoint: Option<String>,
    pub data: HashMap<String, String>,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::for_service("unknown")
    }
}

impl ErrorContext {
    pub fn for_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            status_code: None,
            endpoint: None,
            data: HashMap::new(),
        }
    }

    pub fn status_code(mut self, code: u16) -> Self {
        self.status_code = Some(code);
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn add(&mut self, key: impl Into<String>, value: impl fmt::Display) {
        self.data.insert(key.into(), value.to_string());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.add(key, value);
        self
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        // reqwest embeds the full URL in its message; imagery URLs carry the key
        let message = crate::util::sanitize_for_logging(&err.to_string());

        let service_error = if err.is_timeout() {
            ServiceError::timeout(format!("Request timed out: {}", message))
        } else if err.is_connect() || err.is_request() || err.is_redirect() {
            ServiceError::network(format!("Request failed: {}", message))
        } else if err.is_decode() || err.is_body() {
            ServiceError::parsing(format!("Response decode error: {}", message))
        } else {
            ServiceError::internal(format!("HTTP client error: {}", message))
        };

        let mut context = ErrorContext::for_service("http_client");
        context.status_code = err.status().map(|status| status.as_u16());
        service_error.with_context(context)
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::parsing(format!("JSON error: {}", err)).with_context(ErrorContext::for_service("json"))
    }
}
