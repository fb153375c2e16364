// survey-orchestrator-rs/src/lib.rs
// Street imagery survey over a square grid of sample points
//
// Each point gets four headings stitched into one panorama, a label from the
// object detector and a structured assessment from the vision model. Results
// land in a per-run directory as JPEG files plus one CSV dataset.

pub mod assessment;
pub mod classify;
pub mod config;
pub mod context;
pub mod dataset;
pub mod error;
pub mod grid;
pub mod imagery;
pub mod orchestrator;
pub mod scoring;

pub use assessment::{AssessmentResult, CollectionUrgency, TrashIntensity, YesNo};
pub use classify::{AssessmentClassifier, DetectorLabelAdapter, GeminiAssessmentAdapter, LabelClassifier};
pub use config::{ServiceArea, SurveyConfig};
pub use context::{CancelHandle, CancelSignal, RunContext};
pub use dataset::{SampleDataset, SampleRecord};
pub use error::{CaptureError, ClassifyError, SurveyError, SurveyResult};
pub use grid::{GridSpec, SampleCoordinate};
pub use imagery::{HeadingSource, ImageryFetcher, Panorama};
pub use orchestrator::{preflight, preview_grid, CollectionOrchestrator, RunEvent, RunState, SurveyOutcome};
pub use scoring::{DatasetSummary, PriorityLevel};
