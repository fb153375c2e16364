// survey-orchestrator-rs/src/scoring.rs
// Priority index derived from assessments, and dataset-level summary

use std::fmt;

use serde::Serialize;

use crate::assessment::{AssessmentResult, CollectionUrgency, TrashIntensity, YesNo};
use crate::dataset::SampleRecord;

/// Bucket of the mean priority index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PriorityLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl PriorityLevel {
    pub fn from_index(index: f64) -> Self {
        if index <= 5.0 {
            PriorityLevel::Low
        } else if index <= 10.0 {
            PriorityLevel::Medium
        } else if index <= 15.0 {
            PriorityLevel::High
        } else {
            PriorityLevel::Critical
        }
    }
}

impl fmt::Display for PriorityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PriorityLevel::Low => "Low",
            PriorityLevel::Medium => "Medium",
            PriorityLevel::High => "High",
            PriorityLevel::Critical => "Critical",
        };
        f.write_str(label)
    }
}

/// Weighted distance of the cleanliness score from a spotless 10
fn cleanliness_weight(score: u8) -> f64 {
    let raw = (f64::from(score) - 10.0).abs();
    if raw <= 6.0 {
        raw * 2.0
    } else {
        raw * 0.5
    }
}

fn intensity_weight(intensity: Option<TrashIntensity>) -> f64 {
    match intensity {
        Some(TrashIntensity::Light) => 1.0,
        Some(TrashIntensity::Moderate) => 2.0,
        Some(TrashIntensity::High) => 3.0,
        Some(TrashIntensity::None) | None => 0.0,
    }
}

fn urgency_weight(urgency: Option<CollectionUrgency>) -> f64 {
    match urgency {
        Some(CollectionUrgency::ModeratelyUrgent) => 2.0,
        Some(CollectionUrgency::Urgent) => 4.0,
        Some(CollectionUrgency::NotUrgent) | None => 0.0,
    }
}

/// Composite priority index of one assessment
///
/// Undefined for invalid images and for assessments without a cleanliness
/// score; other missing fields contribute nothing.
pub fn priority_index(assessment: &AssessmentResult) -> Option<f64> {
    if !assessment.is_valid_image {
        return None;
    }
    let score = assessment.cleanliness_score?;

    let accumulation = match assessment.trash_accumulation {
        Some(YesNo::Yes) => 2.0,
        _ => 0.0,
    };
    let bins = match assessment.bins_present {
        Some(YesNo::Yes) => 0.0,
        _ => 2.0,
    };

    Some(
        cleanliness_weight(score)
            + intensity_weight(assessment.trash_intensity)
            + urgency_weight(assessment.collection_urgency)
            + bins
            + accumulation,
    )
}

/// Counts and mean index over a finished dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub total: usize,
    pub captured: usize,
    pub fetch_failures: usize,
    pub assessed: usize,
    pub valid_images: usize,
    pub mean_priority_index: Option<f64>,
}

impl DatasetSummary {
    pub fn from_records(records: &[SampleRecord]) -> Self {
        let captured = records.iter().filter(|r| r.is_captured()).count();
        let assessments: Vec<&AssessmentResult> = records.iter().filter_map(|r| r.assessment()).collect();
        let indices: Vec<f64> = assessments.iter().filter_map(|a| priority_index(a)).collect();

        let mean_priority_index = if indices.is_empty() {
            None
        } else {
            Some(indices.iter().sum::<f64>() / indices.len() as f64)
        };

        Self {
            total: records.len(),
            captured,
            fetch_failures: records.len() - captured,
            assessed: assessments.len(),
            valid_images: assessments.iter().filter(|a| a.is_valid_image).count(),
            mean_priority_index,
        }
    }

    /// Share of assessed images that were valid, in percent
    pub fn valid_image_percent(&self) -> Option<f64> {
        if self.assessed == 0 {
            None
        } else {
            Some(self.valid_images as f64 * 100.0 / self.assessed as f64)
        }
    }

    pub fn priority_level(&self) -> Option<PriorityLevel> {
        self.mean_priority_index.map(PriorityLevel::from_index)
    }
}
