//! # Vision SDK
//!
//! Typed clients for the external services a street survey depends on.
//!
//! This crate provides:
//!
//! - `StreetViewClient`: street-level imagery tiles by coordinate and heading
//! - `GeminiClient`: generative vision model prompted with an inline image
//! - `DetectorClient`: object detection inference server
//! - A normalized `ServiceError` with per-request context
//! - Retry with exponential backoff
//! - Environment-backed configuration providers

pub mod core;
pub use core::ServiceClient;

pub mod services;
pub use services::{detector, gemini, streetview};
pub use services::{DetectorClient, GeminiClient, StreetViewClient};

pub mod error;
pub use error::{ErrorContext, Result, ServiceError};

pub mod resilience;
pub use resilience::{RetryConfig, RetryExecutor};

pub mod config;
pub use config::{
    ConfigProvider, ConfigProviderExt, DetectorConfig, GeminiConfig, ServiceConfig, StreetViewConfig,
};

pub mod util;

#[cfg(test)]
mod tests;
