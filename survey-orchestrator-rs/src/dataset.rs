// survey-orchestrator-rs/src/dataset.rs
// Per-point records and the flat CSV export

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::assessment::AssessmentResult;
use crate::error::{SurveyError, SurveyResult};
use crate::grid::SampleCoordinate;
use crate::scoring::{priority_index, DatasetSummary};

/// Written in place of an image path or label that could not be produced
pub const ERROR_SENTINEL: &str = "ERROR";

/// Outcome of the capture stage for one point
///
/// A failed capture carries no label or assessment, so classification of a
/// missing image is unrepresentable.
#[derive(Debug, Clone, PartialEq)]
pub enum Capture {
    Failed {
        reason: String,
    },
    Captured {
        image_path: PathBuf,
        label: Option<String>,
        assessment: Option<AssessmentResult>,
    },
}

/// One row of the dataset
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRecord {
    pub coordinate: SampleCoordinate,
    pub capture: Capture,
}

impl SampleRecord {
    pub fn failed(coordinate: SampleCoordinate, reason: impl Into<String>) -> Self {
        Self {
            coordinate,
            capture: Capture::Failed { reason: reason.into() },
        }
    }

    pub fn captured(
        coordinate: SampleCoordinate,
        image_path: PathBuf,
        label: Option<String>,
        assessment: Option<AssessmentResult>,
    ) -> Self {
        Self {
            coordinate,
            capture: Capture::Captured {
                image_path,
                label,
                assessment,
            },
        }
    }

    pub fn is_captured(&self) -> bool {
        matches!(self.capture, Capture::Captured { .. })
    }

    pub fn image_path(&self) -> Option<&Path> {
        match &self.capture {
            Capture::Captured { image_path, .. } => Some(image_path),
            Capture::Failed { .. } => None,
        }
    }

    pub fn label(&self) -> Option<&str> {
        match &self.capture {
            Capture::Captured { label, .. } => label.as_deref(),
            Capture::Failed { .. } => None,
        }
    }

    pub fn assessment(&self) -> Option<&AssessmentResult> {
        match &self.capture {
            Capture::Captured { assessment, .. } => assessment.as_ref(),
            Capture::Failed { .. } => None,
        }
    }

    /// Composite priority index, when the assessment allows one
    pub fn priority_index(&self) -> Option<f64> {
        self.assessment().and_then(priority_index)
    }
}

#[derive(Serialize)]
struct CsvRow<'a> {
    latitude: f64,
    longitude: f64,
    image_path: String,
    label: &'a str,
    is_valid_image: Option<bool>,
    cleanliness_score: Option<u8>,
    trash_accumulation: Option<&'static str>,
    trash_intensity: Option<&'static str>,
    collection_urgency: Option<&'static str>,
    bins_present: Option<&'static str>,
    justification: Option<&'a str>,
    priority_index: Option<f64>,
}

impl<'a> From<&'a SampleRecord> for CsvRow<'a> {
    fn from(record: &'a SampleRecord) -> Self {
        let assessment = record.assessment();
        let image_path = match record.image_path() {
            Some(path) => path.display().to_string(),
            None => ERROR_SENTINEL.to_string(),
        };

        Self {
            latitude: record.coordinate.latitude,
            longitude: record.coordinate.longitude,
            image_path,
            label: record.label().unwrap_or(ERROR_SENTINEL),
            is_valid_image: assessment.map(|a| a.is_valid_image),
            cleanliness_score: assessment.and_then(|a| a.cleanliness_score),
            trash_accumulation: assessment.and_then(|a| a.trash_accumulation).map(|v| v.as_str()),
            trash_intensity: assessment.and_then(|a| a.trash_intensity).map(|v| v.as_str()),
            collection_urgency: assessment.and_then(|a| a.collection_urgency).map(|v| v.as_str()),
            bins_present: assessment.and_then(|a| a.bins_present).map(|v| v.as_str()),
            justification: assessment.map(|a| a.justification.as_str()),
            priority_index: record.priority_index(),
        }
    }
}

/// Records of one run, in completion order, unique by coordinate
#[derive(Debug, Default, Clone)]
pub struct SampleDataset {
    records: Vec<SampleRecord>,
    keys: HashSet<String>,
}

impl SampleDataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
            keys: HashSet::with_capacity(capacity),
        }
    }

    /// Append a record; a second record for the same coordinate is dropped
    pub fn push(&mut self, record: SampleRecord) -> bool {
        if !self.keys.insert(record.coordinate.key()) {
            log::warn!("Dropping duplicate record for {}", record.coordinate);
            return false;
        }
        self.records.push(record);
        true
    }

    pub fn contains(&self, coordinate: &SampleCoordinate) -> bool {
        self.keys.contains(&coordinate.key())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[SampleRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &SampleRecord> {
        self.records.iter()
    }

    /// Records ordered by latitude then longitude
    pub fn sorted_by_coordinate(&self) -> Vec<&SampleRecord> {
        let mut sorted: Vec<&SampleRecord> = self.records.iter().collect();
        sorted.sort_by(|a, b| {
            a.coordinate
                .latitude
                .total_cmp(&b.coordinate.latitude)
                .then(a.coordinate.longitude.total_cmp(&b.coordinate.longitude))
        });
        sorted
    }

    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary::from_records(&self.records)
    }

    /// Write one CSV row per record, with a header
    pub fn write_csv(&self, path: &Path) -> SurveyResult<()> {
        let export_error = |message: String| SurveyError::Export {
            path: path.to_path_buf(),
            message,
        };

        let mut writer = csv::Writer::from_path(path).map_err(|e| export_error(e.to_string()))?;
        for record in &self.records {
            writer
                .serialize(CsvRow::from(record))
                .map_err(|e| export_error(e.to_string()))?;
        }
        writer.flush().map_err(|e| export_error(e.to_string()))?;

        Ok(())
    }
}

impl FromIterator<SampleRecord> for SampleDataset {
    fn from_iter<I: IntoIterator<Item = SampleRecord>>(iter: I) -> Self {
        let mut dataset = SampleDataset::new();
        for record in iter {
            dataset.push(record);
        }
        dataset
    }
}
