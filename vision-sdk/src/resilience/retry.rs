//! Retry with exponential backoff for recoverable errors
//!
//! This module provides a retry mechanism with configurable exponential backoff
//! for handling transient failures when interacting with external services.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;

use crate::error::{Result, ServiceError};

/// Retry policy configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (0 means no retries)
    pub max_retries: u32,

    /// Initial backoff duration
    pub initial_interval: Duration,

    /// Maximum backoff duration
    pub max_interval: Duration,

    /// Multiplier for backoff between retries
    pub multiplier: f64,

    /// Randomization applied to each backoff interval
    pub randomization_factor: f64,

    /// Maximum total time to spend retrying
    pub max_elapsed_time: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_interval: Duration::from_millis(250),
            max_interval: Duration::from_secs(10),
            multiplier: 2.0,
            randomization_factor: 0.2,
            max_elapsed_time: Some(Duration::from_secs(60)),
        }
    }
}

impl RetryConfig {
    /// Default backoff shape with the given retry budget
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }
}

impl fmt::Display for RetryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RetryConfig {{ max_retries: {}, initial_interval: {:?}, max_interval: {:?}, multiplier: {} }}",
            self.max_retries, self.initial_interval, self.max_interval, self.multiplier
        )
    }
}

/// Executor for retry operations with exponential backoff
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    /// Create a new retry executor with the specified configuration
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Execute a fallible operation with retries according to the configuration
    pub async fn execute<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut backoff = ExponentialBackoff {
            initial_interval: self.config.initial_interval,
            max_interval: self.config.max_interval,
            multiplier: self.config.multiplier,
            randomization_factor: self.config.randomization_factor,
            max_elapsed_time: self.config.max_elapsed_time,
            ..ExponentialBackoff::default()
        };

        let mut attempts = 0;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempts < self.config.max_retries => {
                    match backoff.next_backoff() {
                        Some(wait) => {
                            log::warn!(
                                "Operation failed with retryable error, retrying in {:?} (attempt {}/{}): {}",
                                wait,
                                attempts + 1,
                                self.config.max_retries,
                                err
                            );
                            tokio::time::sleep(wait).await;
                            attempts += 1;
                        }
                        None => return Err(err.with_context_value("attempts", attempts + 1)),
                    }
                }
                Err(err) if attempts > 0 => return Err(err.with_context_value("attempts", attempts + 1)),
                Err(err) => return Err(err),
            }
        }
    }

    /// Get the current retry configuration
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}
