//! Tests for configuration management functionality

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::env;

    use crate::config::{
        CompositeConfigProvider, ConfigProvider, ConfigProviderExt, DetectorConfig, EnvConfigProvider,
        GeminiConfig, MemoryConfigProvider, ServiceConfig, StreetViewConfig,
    };

    #[test]
    fn test_memory_config_provider() {
        let mut provider = MemoryConfigProvider::new();
        provider.set("api_key", "test_key");
        provider.set("timeout", "30");
        provider.set("radius", "2.5");
        provider.set("enabled", "yes");

        assert_eq!(provider.get_string("api_key").unwrap(), "test_key");
        assert_eq!(provider.get_int("timeout").unwrap(), 30);
        assert_eq!(provider.get_float("radius").unwrap(), 2.5);
        assert!(provider.get_bool("enabled").unwrap());

        assert_eq!(provider.get_string_or("missing", "default"), "default");
        assert_eq!(provider.get_int_or("missing", 60), 60);
        assert!(!provider.get_bool_or("missing", false));

        assert!(provider.get_string("missing").is_err());
        assert!(provider.get_int("api_key").is_err());
    }

    #[test]
    fn test_env_config_provider() {
        env::set_var("VSDK_TEST_SERVICE_API_KEY", "env_test_key");
        env::set_var("VSDK_TEST_SERVICE_MAX_RETRIES", "5");

        let provider = EnvConfigProvider::new()
            .with_prefix("VSDK_TEST")
            .with_namespace("SERVICE");

        assert_eq!(provider.get_string("API_KEY").unwrap(), "env_test_key");
        assert_eq!(provider.get_int("MAX_RETRIES").unwrap(), 5);
        assert_eq!(provider.format_key("api-key"), "VSDK_TEST_SERVICE_API_KEY");
        assert!(provider.get_string("NOT_SET").is_err());

        env::remove_var("VSDK_TEST_SERVICE_API_KEY");
        env::remove_var("VSDK_TEST_SERVICE_MAX_RETRIES");
    }

    #[test]
    fn test_composite_config_provider() {
        let mut primary = MemoryConfigProvider::new();
        primary.set("GEMINI_MODEL", "gemini-1.5-pro");

        let mut fallback = HashMap::new();
        fallback.insert("GEMINI_MODEL".to_string(), "ignored".to_string());
        fallback.insert("GEMINI_API_KEY".to_string(), "fallback_key".to_string());

        let provider = CompositeConfigProvider::new()
            .with_provider(primary)
            .with_provider(MemoryConfigProvider::with_values(fallback));

        assert_eq!(provider.get_string("GEMINI_MODEL").unwrap(), "gemini-1.5-pro");
        assert_eq!(provider.get_string("GEMINI_API_KEY").unwrap(), "fallback_key");
        assert!(provider.get_string("UNKNOWN").is_err());
    }

    #[test]
    fn test_street_view_config_aliases() {
        let mut provider = MemoryConfigProvider::new();
        provider.set("API_KEY_STREET_VIEW", "legacy_key");
        provider.set("STREET_VIEW_TIMEOUT", "12");

        let config = StreetViewConfig::from_provider(&provider).unwrap();
        assert_eq!(config.api_key, "legacy_key");
        assert_eq!(config.timeout_seconds, 12);
        assert_eq!(config.width, 600);
        assert_eq!(config.height, 300);
        assert_eq!(config.fov, 120);
        assert!(config.validate().is_ok());

        // The primary name wins over the alias
        provider.set("STREET_VIEW_API_KEY", "primary_key");
        let config = StreetViewConfig::from_provider(&provider).unwrap();
        assert_eq!(config.api_key, "primary_key");
    }

    #[test]
    fn test_missing_keys_fail_validation() {
        let provider = MemoryConfigProvider::new();

        let street_view = StreetViewConfig::from_provider(&provider).unwrap();
        assert!(street_view.validate().is_err());

        let gemini = GeminiConfig::from_provider(&provider).unwrap();
        assert_eq!(gemini.model, "gemini-2.0-flash");
        assert!(gemini.validate().is_err());

        let detector = DetectorConfig::from_provider(&provider).unwrap();
        assert!(detector.api_key.is_none());
        assert!(detector.validate().is_ok());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = StreetViewConfig {
            api_key: "k".to_string(),
            fov: 150,
            ..StreetViewConfig::default()
        };
        assert!(config.validate().is_err());

        let config = DetectorConfig {
            base_url: "localhost:8000".to_string(),
            ..DetectorConfig::default()
        };
        assert!(config.validate().is_err());

        let mut provider = MemoryConfigProvider::new();
        provider.set("GEMINI_API_KEY", "key");
        provider.set("API_KEY_VISION_GOOGLE", "other");
        provider.set("DETECTOR_API_KEY", "");
        let gemini = GeminiConfig::from_provider(&provider).unwrap();
        assert_eq!(gemini.api_key, "key");
        let detector = DetectorConfig::from_provider(&provider).unwrap();
        assert!(detector.api_key.is_none());
    }
}
