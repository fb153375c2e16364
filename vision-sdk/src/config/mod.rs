//! Configuration management for service clients
//!
//! This module provides utilities for loading and validating configuration
//! for the external service clients, with support for environment variables.

use std::collections::HashMap;
use std::env;
use std::fmt::Debug;
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError};

/// Base trait for configuration providers
pub trait ConfigProvider: Send + Sync {
    /// Get a string configuration value
    fn get_string(&self, key: &str) -> Result<String>;
}

/// Extension methods for configuration providers
pub trait ConfigProviderExt: ConfigProvider {
    /// Get an integer configuration value
    fn get_int(&self, key: &str) -> Result<i64> {
        let value = self.get_string(key)?;
        value
            .trim()
            .parse::<i64>()
            .map_err(|e| ServiceError::configuration(format!("Invalid integer for key {}: {}", key, e)))
    }

    /// Get a float configuration value
    fn get_float(&self, key: &str) -> Result<f64> {
        let value = self.get_string(key)?;
        value
            .trim()
            .parse::<f64>()
            .map_err(|e| ServiceError::configuration(format!("Invalid float for key {}: {}", key, e)))
    }

    /// Get a boolean configuration value
    fn get_bool(&self, key: &str) -> Result<bool> {
        let value = self.get_string(key)?;
        match value.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" | "on" => Ok(true),
            "false" | "no" | "0" | "off" => Ok(false),
            _ => Err(ServiceError::configuration(format!(
                "Invalid boolean value for key {}: {}",
                key, value
            ))),
        }
    }

    /// Get the first key that resolves, in order
    fn get_string_any(&self, keys: &[&str]) -> Result<String> {
        keys.iter()
            .find_map(|key| self.get_string(key).ok())
            .ok_or_else(|| {
                ServiceError::configuration(format!("None of the keys are set: {}", keys.join(", ")))
            })
    }

    /// Get a string configuration value with a default
    fn get_string_or(&self, key: &str, default: &str) -> String {
        self.get_string(key).unwrap_or_else(|_| default.to_string())
    }

    /// Get an integer configuration value with a default
    fn get_int_or(&self, key: &str, default: i64) -> i64 {
        self.get_int(key).unwrap_or(default)
    }

    /// Get a float configuration value with a default
    fn get_float_or(&self, key: &str, default: f64) -> f64 {
        self.get_float(key).unwrap_or(default)
    }

    /// Get a boolean configuration value with a default
    fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.get_bool(key).unwrap_or(default)
    }
}

impl<T: ConfigProvider + ?Sized> ConfigProviderExt for T {}

/// Environment variable based configuration provider
#[derive(Debug, Clone, Default)]
pub struct EnvConfigProvider {
    /// Optional prefix for environment variables
    prefix: Option<String>,

    /// Optional namespace for variables (e.g., "GEMINI", "STREET_VIEW")
    namespace: Option<String>,
}

impl EnvConfigProvider {
    /// Create a new environment variable config provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a prefix for environment variables
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Set a namespace for environment variables
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Format a configuration key as an environment variable
    pub fn format_key(&self, key: &str) -> String {
        let mut env_key = String::new();

        if let Some(ref prefix) = self.prefix {
            env_key.push_str(prefix);
            env_key.push('_');
        }

        if let Some(ref namespace) = self.namespace {
            env_key.push_str(namespace);
            env_key.push('_');
        }

        env_key.push_str(&key.to_uppercase().replace(|c: char| !c.is_ascii_alphanumeric(), "_"));

        env_key
    }
}

impl ConfigProvider for EnvConfigProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        let env_key = self.format_key(key);

        env::var(&env_key).map_err(|e| match e {
            env::VarError::NotPresent => {
                ServiceError::configuration(format!("Environment variable not set: {}", env_key))
            }
            env::VarError::NotUnicode(_) => ServiceError::configuration(format!(
                "Environment variable is not valid unicode: {}",
                env_key
            )),
        })
    }
}

/// In-memory config provider for testing or static configuration
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigProvider {
    values: HashMap<String, String>,
}

impl MemoryConfigProvider {
    /// Create a new empty memory config provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a memory config provider with initial values
    pub fn with_values(values: HashMap<String, String>) -> Self {
        Self { values }
    }

    /// Set a configuration value
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: ToString,
    {
        self.values.insert(key.into(), value.to_string());
    }
}

impl ConfigProvider for MemoryConfigProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        self.values
            .get(key)
            .cloned()
            .ok_or_else(|| ServiceError::configuration(format!("Configuration key not found: {}", key)))
    }
}

/// A composite config provider that tries multiple providers in order
#[derive(Default)]
pub struct CompositeConfigProvider {
    providers: Vec<Box<dyn ConfigProvider>>,
}

impl CompositeConfigProvider {
    /// Create a new composite config provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider to the end of the chain
    pub fn add_provider(&mut self, provider: impl ConfigProvider + 'static) {
        self.providers.push(Box::new(provider));
    }

    /// Builder-style variant of `add_provider`
    pub fn with_provider(mut self, provider: impl ConfigProvider + 'static) -> Self {
        self.add_provider(provider);
        self
    }
}

impl ConfigProvider for CompositeConfigProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        for provider in &self.providers {
            if let Ok(value) = provider.get_string(key) {
                return Ok(value);
            }
        }

        Err(ServiceError::configuration(format!(
            "Configuration key not found in any provider: {}",
            key
        )))
    }
}

/// Global default configuration provider (plain environment variables)
pub static DEFAULT_PROVIDER: Lazy<Arc<EnvConfigProvider>> = Lazy::new(|| Arc::new(EnvConfigProvider::new()));

/// Trait for service-specific configuration
pub trait ServiceConfig: Debug + Send + Sync + Sized {
    /// Load this configuration from a provider, falling back to defaults
    fn from_provider(provider: &dyn ConfigProvider) -> Result<Self>;

    /// Validate this configuration
    fn validate(&self) -> Result<()>;

    /// Service name
    fn service_name(&self) -> &str;
}

fn require_url(service: &str, url: &str) -> Result<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(ServiceError::configuration(format!("{} base URL must be http(s): {}", service, url)))
    }
}

/// Configuration for the street-level imagery provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreetViewConfig {
    /// API key sent as the `key` query parameter
    pub api_key: String,

    /// Endpoint serving one image per request
    pub base_url: String,

    /// Timeout in seconds
    pub timeout_seconds: u64,

    /// Tile width in pixels
    pub width: u32,

    /// Tile height in pixels
    pub height: u32,

    /// Horizontal field of view in degrees
    pub fov: u32,

    /// Camera pitch in degrees
    pub pitch: i32,
}

impl Default for StreetViewConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://maps.googleapis.com/maps/api/streetview".to_string(),
            timeout_seconds: 30,
            width: 600,
            height: 300,
            fov: 120,
            pitch: 0,
        }
    }
}

impl ServiceConfig for StreetViewConfig {
    fn from_provider(provider: &dyn ConfigProvider) -> Result<Self> {
        let mut config = Self::default();

        if let Ok(api_key) = provider.get_string_any(&["STREET_VIEW_API_KEY", "API_KEY_STREET_VIEW"]) {
            config.api_key = api_key;
        }
        if let Ok(base_url) = provider.get_string("STREET_VIEW_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(timeout) = provider.get_int("STREET_VIEW_TIMEOUT") {
            config.timeout_seconds = timeout.max(1) as u64;
        }

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(ServiceError::configuration("Street View API key is required"));
        }
        if self.width == 0 || self.height == 0 {
            return Err(ServiceError::configuration("Street View tile size must be non-zero"));
        }
        if self.fov == 0 || self.fov > 120 {
            return Err(ServiceError::configuration("Street View fov must be within 1..=120"));
        }
        require_url("Street View", &self.base_url)
    }

    fn service_name(&self) -> &str {
        "streetview"
    }
}

/// Configuration for the generative vision assessment service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API key sent as the `key` query parameter
    pub api_key: String,

    /// Base URL (can be changed for proxies)
    pub base_url: String,

    /// Model identifier
    pub model: String,

    /// Timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.0-flash".to_string(),
            timeout_seconds: 60,
        }
    }
}

impl ServiceConfig for GeminiConfig {
    fn from_provider(provider: &dyn ConfigProvider) -> Result<Self> {
        let mut config = Self::default();

        if let Ok(api_key) = provider.get_string_any(&["GEMINI_API_KEY", "API_KEY_VISION_GOOGLE"]) {
            config.api_key = api_key;
        }
        if let Ok(base_url) = provider.get_string("GEMINI_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(model) = provider.get_string("GEMINI_MODEL") {
            config.model = model;
        }
        if let Ok(timeout) = provider.get_int("GEMINI_TIMEOUT") {
            config.timeout_seconds = timeout.max(1) as u64;
        }

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(ServiceError::configuration("Gemini API key is required"));
        }
        if self.model.trim().is_empty() {
            return Err(ServiceError::configuration("Gemini model must not be empty"));
        }
        require_url("Gemini", &self.base_url)
    }

    fn service_name(&self) -> &str {
        "gemini"
    }
}

/// Configuration for the object detection service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Base URL of the inference server
    pub base_url: String,

    /// Optional bearer token
    pub api_key: Option<String>,

    /// Timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            api_key: None,
            timeout_seconds: 30,
        }
    }
}

impl ServiceConfig for DetectorConfig {
    fn from_provider(provider: &dyn ConfigProvider) -> Result<Self> {
        let mut config = Self::default();

        if let Ok(base_url) = provider.get_string("DETECTOR_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(api_key) = provider.get_string("DETECTOR_API_KEY") {
            config.api_key = Some(api_key).filter(|key| !key.is_empty());
        }
        if let Ok(timeout) = provider.get_int("DETECTOR_TIMEOUT") {
            config.timeout_seconds = timeout.max(1) as u64;
        }

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        require_url("Detector", &self.base_url)
    }

    fn service_name(&self) -> &str {
        "detector"
    }
}
