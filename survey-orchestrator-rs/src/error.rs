// survey-orchestrator-rs/src/error.rs
// Run-level and per-point error types

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use vision_sdk::ServiceError;

/// Errors that abort a whole run
#[derive(Error, Debug)]
pub enum SurveyError {
    #[error("Invalid survey parameters: {0}")]
    InvalidParameters(String),

    #[error("Center {latitude:.6},{longitude:.6} is {distance_km:.2} km from the service area center (limit {radius_km:.2} km)")]
    OutsideServiceArea {
        latitude: f64,
        longitude: f64,
        distance_km: f64,
        radius_km: f64,
    },

    #[error("Failed to prepare results directory {path}: {source}")]
    ResultsDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to export dataset to {path}: {message}")]
    Export { path: PathBuf, message: String },

    #[error("Run cancelled after {completed} of {total} points")]
    Cancelled { completed: usize, total: usize },

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<ServiceError> for SurveyError {
    fn from(err: ServiceError) -> Self {
        SurveyError::Configuration(err.to_string())
    }
}

/// Result type for run-level operations
pub type SurveyResult<T> = Result<T, SurveyError>;

/// Why the panorama for one point could not be produced
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Heading {heading} request failed: {source}")]
    Fetch {
        heading: u16,
        #[source]
        source: ServiceError,
    },

    #[error("Heading {heading} did not decode as an image: {message}")]
    Decode { heading: u16, message: String },

    #[error("Failed to encode panorama: {0}")]
    Encode(String),

    #[error("Failed to write panorama {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Capture cancelled")]
    Cancelled,
}

/// Why one classifier produced no result for a point
#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("Classifier request failed: {0}")]
    Service(#[from] ServiceError),

    #[error("Classifier returned no usable result: {0}")]
    EmptyResult(String),

    #[error("Malformed assessment reply: {0}")]
    MalformedReply(String),
}
