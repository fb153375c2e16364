// survey-orchestrator-rs/src/config.rs
// Survey run settings loaded from the environment

use std::path::PathBuf;

use geo::{GeodesicDistance, Point};
use vision_sdk::RetryConfig;

use crate::error::{SurveyError, SurveyResult};
use crate::grid::SampleCoordinate;

pub const DEFAULT_WORKERS: usize = 8;
pub const DEFAULT_RESPONSE_LANGUAGE: &str = "Spanish";

/// Circular area the survey is allowed to run in
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServiceArea {
    pub center: SampleCoordinate,
    pub radius_km: f64,
}

impl ServiceArea {
    /// Geodesic distance from the area center, in kilometers
    pub fn distance_km(&self, point: SampleCoordinate) -> f64 {
        let center = Point::new(self.center.longitude, self.center.latitude);
        let other = Point::new(point.longitude, point.latitude);
        center.geodesic_distance(&other) / 1000.0
    }

    /// Fail if `point` lies outside the area
    pub fn check(&self, point: SampleCoordinate) -> SurveyResult<()> {
        let distance_km = self.distance_km(point);
        if distance_km > self.radius_km {
            return Err(SurveyError::OutsideServiceArea {
                latitude: point.latitude,
                longitude: point.longitude,
                distance_km,
                radius_km: self.radius_km,
            });
        }
        Ok(())
    }
}

/// Settings shared by every run of the orchestrator
#[derive(Debug, Clone)]
pub struct SurveyConfig {
    /// Size of the worker pool
    pub workers: usize,

    /// Directory the run-scoped results directory is created in
    pub output_root: PathBuf,

    /// Language the assessment justification is written in
    pub response_language: String,

    /// Optional area restriction for run centers
    pub service_area: Option<ServiceArea>,

    /// Retries per imagery heading on transient errors
    pub fetch_retries: u32,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            output_root: PathBuf::from("."),
            response_language: DEFAULT_RESPONSE_LANGUAGE.to_string(),
            service_area: None,
            fetch_retries: 0,
        }
    }
}

impl SurveyConfig {
    /// Load from `SURVEY_*` environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let service_area = match (
            config_rs::get_env_parsed_opt::<f64>("SURVEY_AREA_LAT"),
            config_rs::get_env_parsed_opt::<f64>("SURVEY_AREA_LON"),
            config_rs::get_env_parsed_opt::<f64>("SURVEY_AREA_RADIUS_KM"),
        ) {
            (Some(lat), Some(lon), Some(radius_km)) => Some(ServiceArea {
                center: SampleCoordinate::new(lat, lon),
                radius_km,
            }),
            (None, None, None) => None,
            _ => {
                log::warn!("Service area needs SURVEY_AREA_LAT, SURVEY_AREA_LON and SURVEY_AREA_RADIUS_KM; ignoring it");
                None
            }
        };

        Self {
            workers: config_rs::get_env_parsed("SURVEY_WORKERS", defaults.workers),
            output_root: config_rs::get_env_opt("SURVEY_OUTPUT_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_root),
            response_language: config_rs::get_env_opt("SURVEY_RESPONSE_LANGUAGE")
                .unwrap_or(defaults.response_language),
            service_area,
            fetch_retries: config_rs::get_env_parsed("SURVEY_FETCH_RETRIES", defaults.fetch_retries),
        }
    }

    pub fn validate(&self) -> SurveyResult<()> {
        if self.workers == 0 {
            return Err(SurveyError::Configuration("workers must be at least 1".to_string()));
        }
        if self.response_language.trim().is_empty() {
            return Err(SurveyError::Configuration("response language must not be empty".to_string()));
        }
        if let Some(area) = self.service_area {
            if !area.radius_km.is_finite() || area.radius_km <= 0.0 {
                return Err(SurveyError::Configuration(format!(
                    "service area radius must be positive, got {}",
                    area.radius_km
                )));
            }
        }
        Ok(())
    }

    /// Retry policy for imagery requests
    pub fn fetch_retry(&self) -> RetryConfig {
        RetryConfig::with_max_retries(self.fetch_retries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_area_check() {
        let area = ServiceArea {
            center: SampleCoordinate::new(6.2442, -75.5812),
            radius_km: 30.0,
        };

        assert!(area.check(SampleCoordinate::new(6.2518, -75.5636)).is_ok());

        // Bogotá is roughly 240 km away
        let err = area.check(SampleCoordinate::new(4.7110, -74.0721)).unwrap_err();
        match err {
            SurveyError::OutsideServiceArea { distance_km, .. } => assert!(distance_km > 200.0),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_validate() {
        assert!(SurveyConfig::default().validate().is_ok());

        let config = SurveyConfig {
            workers: 0,
            ..SurveyConfig::default()
        };
        assert!(matches!(config.validate(), Err(SurveyError::Configuration(_))));

        let config = SurveyConfig {
            service_area: Some(ServiceArea {
                center: SampleCoordinate::new(0.0, 0.0),
                radius_km: -1.0,
            }),
            ..SurveyConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_env() {
        std::env::set_var("SURVEY_WORKERS", "3");
        std::env::set_var("SURVEY_RESPONSE_LANGUAGE", "English");
        std::env::set_var("SURVEY_FETCH_RETRIES", "2");
        std::env::set_var("SURVEY_AREA_LAT", "6.2442");
        std::env::remove_var("SURVEY_AREA_LON");

        let config = SurveyConfig::from_env();
        assert_eq!(config.workers, 3);
        assert_eq!(config.response_language, "English");
        assert_eq!(config.fetch_retry().max_retries, 2);
        assert!(config.service_area.is_none());

        for key in ["SURVEY_WORKERS", "SURVEY_RESPONSE_LANGUAGE", "SURVEY_FETCH_RETRIES", "SURVEY_AREA_LAT"] {
            std::env::remove_var(key);
        }
    }
}
