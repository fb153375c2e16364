//! Object detection service data models

use serde::{Deserialize, Serialize};

/// One detected label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Class name
    pub label: String,

    /// Confidence in `[0, 1]`
    pub confidence: f64,
}

/// `/predict` response body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectResponse {
    #[serde(default)]
    pub predictions: Vec<Prediction>,
}

impl DetectResponse {
    /// The highest-confidence prediction, if any
    pub fn top(&self) -> Option<&Prediction> {
        self.predictions
            .iter()
            .filter(|p| p.confidence.is_finite())
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
    }
}
