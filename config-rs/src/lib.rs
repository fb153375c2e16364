//! config-rs/lib.rs
//! Shared environment helpers for the survey workspace
//! Loads `.env` files and reads typed values with logged fallbacks

use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

/// Load variables from a `.env` file in the working directory or its parents
///
/// # Returns
/// The path of the file that was loaded, if any
pub fn load_env() -> Option<PathBuf> {
    match dotenv::dotenv() {
        Ok(path) => {
            log::debug!("Loaded environment from {}", path.display());
            Some(path)
        }
        Err(e) if e.not_found() => None,
        Err(e) => {
            log::warn!("Failed to load .env file: {}", e);
            None
        }
    }
}

/// Read an environment variable, treating blank values as unset
///
/// # Arguments
/// * `name` - The variable name (e.g., "SURVEY_OUTPUT_ROOT")
pub fn get_env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// Read and parse an optional environment variable
///
/// An unparsable value is logged and treated as unset.
pub fn get_env_parsed_opt<T>(name: &str) -> Option<T>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = get_env_opt(name)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("Invalid value in {} ({}), ignoring it", name, e);
            None
        }
    }
}

/// Read and parse an environment variable with a default
///
/// # Arguments
/// * `name` - The variable name (e.g., "SURVEY_WORKERS")
/// * `default` - Value used when the variable is unset or invalid
pub fn get_env_parsed<T>(name: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match get_env_opt(name) {
        None => default,
        Some(raw) => raw.trim().parse::<T>().unwrap_or_else(|e| {
            log::warn!("Invalid value in {} ({}), using default {}", name, e, default);
            default
        }),
    }
}

/// Get the binary name for logging
///
/// # Arguments
/// * `component` - Component identifier (e.g., "ORCHESTRATOR")
pub fn get_formatted_service_name(component: &str) -> String {
    match component {
        "ORCHESTRATOR" => "survey-orchestrator".to_string(),
        _ => format!("survey-{}", component.to_lowercase().replace('_', "-")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_env_parsed() {
        std::env::set_var("CONFIG_RS_TEST_WORKERS", "12");
        assert_eq!(get_env_parsed("CONFIG_RS_TEST_WORKERS", 4usize), 12);

        // Invalid values fall back to the default
        std::env::set_var("CONFIG_RS_TEST_BAD_WORKERS", "many");
        assert_eq!(get_env_parsed("CONFIG_RS_TEST_BAD_WORKERS", 4usize), 4);

        std::env::remove_var("CONFIG_RS_TEST_UNSET");
        assert_eq!(get_env_parsed("CONFIG_RS_TEST_UNSET", 2.5f64), 2.5);
    }

    #[test]
    fn test_get_env_opt() {
        std::env::set_var("CONFIG_RS_TEST_BLANK", "   ");
        assert_eq!(get_env_opt("CONFIG_RS_TEST_BLANK"), None);

        std::env::set_var("CONFIG_RS_TEST_SECOND", "value");
        assert_eq!(get_env_opt("CONFIG_RS_TEST_SECOND"), Some("value".to_string()));

        std::env::set_var("CONFIG_RS_TEST_LAT", "6.2442");
        assert_eq!(get_env_parsed_opt::<f64>("CONFIG_RS_TEST_LAT"), Some(6.2442));
        std::env::set_var("CONFIG_RS_TEST_BAD_LAT", "north");
        assert_eq!(get_env_parsed_opt::<f64>("CONFIG_RS_TEST_BAD_LAT"), None);
    }

    #[test]
    fn test_get_formatted_service_name() {
        assert_eq!(get_formatted_service_name("ORCHESTRATOR"), "survey-orchestrator");
        assert_eq!(get_formatted_service_name("GRID_PREVIEW"), "survey-grid-preview");
    }
}
