// survey-orchestrator-rs/src/orchestrator.rs
// Collection Orchestrator: bounded fan-out over the grid, completion-order fan-in

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;

use futures::FutureExt;
use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use vision_sdk::config::DEFAULT_PROVIDER;
use vision_sdk::{
    DetectorClient, DetectorConfig, GeminiClient, GeminiConfig, ServiceConfig, StreetViewClient, StreetViewConfig,
};

use crate::classify::{AssessmentClassifier, DetectorLabelAdapter, GeminiAssessmentAdapter, LabelClassifier};
use crate::config::SurveyConfig;
use crate::context::{CancelSignal, RunContext};
use crate::dataset::{SampleDataset, SampleRecord};
use crate::error::{SurveyError, SurveyResult};
use crate::grid::{GridSpec, SampleCoordinate};
use crate::imagery::{HeadingSource, ImageryFetcher};
use crate::scoring::DatasetSummary;

/// Lifecycle of one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Preparing,
    Running,
    Aggregating,
    Persisted,
    Done,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Lifecycle of one grid point inside a worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointStage {
    NotStarted,
    Fetching,
    Classifying,
    Done,
    Failed,
}

/// Progress notifications emitted while a run executes
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    State(RunState),
    Started { total: usize },
    PointFinished { completed: usize, total: usize, failed: usize },
    Persisted { path: PathBuf },
}

/// What a successful run hands back
#[derive(Debug)]
pub struct SurveyOutcome {
    pub context: RunContext,
    pub dataset: SampleDataset,
    pub dataset_path: PathBuf,
    pub summary: DatasetSummary,
}

/// Shared, read-only collaborators for every worker
#[derive(Clone)]
struct PointPipeline {
    imagery: ImageryFetcher,
    labeler: Arc<dyn LabelClassifier>,
    assessor: Arc<dyn AssessmentClassifier>,
    context: Arc<RunContext>,
}

impl PointPipeline {
    async fn process(&self, coordinate: SampleCoordinate) -> SampleRecord {
        let mut stage = PointStage::NotStarted;
        advance(coordinate, &mut stage, PointStage::Fetching);

        let panorama = match self.imagery.capture(&self.context, coordinate).await {
            Ok(panorama) => panorama,
            Err(e) => {
                warn!("Capture failed at {}: {}", coordinate, e);
                advance(coordinate, &mut stage, PointStage::Failed);
                return SampleRecord::failed(coordinate, e.to_string());
            }
        };

        advance(coordinate, &mut stage, PointStage::Classifying);
        let (label, assessment) = tokio::join!(
            self.labeler.label(&panorama.jpeg),
            self.assessor.assess(&panorama.jpeg)
        );

        let label = label
            .map_err(|e| warn!("Label classification failed at {}: {}", coordinate, e))
            .ok();
        let assessment = assessment
            .map_err(|e| warn!("Assessment failed at {}: {}", coordinate, e))
            .ok();

        advance(coordinate, &mut stage, PointStage::Done);
        SampleRecord::captured(coordinate, panorama.path, label, assessment)
    }
}

fn advance(coordinate: SampleCoordinate, stage: &mut PointStage, next: PointStage) {
    debug!("Point {}: {:?} -> {:?}", coordinate, stage, next);
    *stage = next;
}

/// Drives a grid through imagery capture and both classifiers
pub struct CollectionOrchestrator {
    config: SurveyConfig,
    imagery: ImageryFetcher,
    labeler: Arc<dyn LabelClassifier>,
    assessor: Arc<dyn AssessmentClassifier>,
    events: Option<mpsc::UnboundedSender<RunEvent>>,
}

impl CollectionOrchestrator {
    pub fn new(
        config: SurveyConfig,
        source: Arc<dyn HeadingSource>,
        labeler: Arc<dyn LabelClassifier>,
        assessor: Arc<dyn AssessmentClassifier>,
    ) -> Self {
        Self {
            config,
            imagery: ImageryFetcher::new(source),
            labeler,
            assessor,
            events: None,
        }
    }

    /// Build the service clients once from environment configuration
    pub fn from_env(config: SurveyConfig) -> SurveyResult<Self> {
        let provider = &**DEFAULT_PROVIDER;

        let street_view = StreetViewClient::with_retry(
            StreetViewConfig::from_provider(provider)?,
            config.fetch_retry(),
        )?;
        let detector = DetectorClient::new(DetectorConfig::from_provider(provider)?)?;
        let gemini = GeminiClient::new(GeminiConfig::from_provider(provider)?)?;

        info!(
            "Clients ready: imagery {}, detector {}, model {}",
            street_view.config().base_url,
            vision_sdk::ServiceClient::base_url(&detector),
            gemini.model()
        );

        let assessor = GeminiAssessmentAdapter::new(gemini, &config.response_language);
        Ok(Self::new(
            config,
            Arc::new(street_view),
            Arc::new(DetectorLabelAdapter::new(detector)),
            Arc::new(assessor),
        ))
    }

    /// Send progress events to `tx`
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<RunEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn config(&self) -> &SurveyConfig {
        &self.config
    }

    fn emit(&self, event: RunEvent) {
        if let Some(ref tx) = self.events {
            let _ = tx.send(event);
        }
    }

    fn transition(&self, state: &mut RunState, next: RunState) {
        info!("Run state: {} -> {}", state, next);
        *state = next;
        self.emit(RunEvent::State(next));
    }

    /// Execute one run end to end
    ///
    /// Input errors are reported before any network call. Per-point failures
    /// become error rows; only preparation, export and cancellation abort.
    pub async fn run(&self, spec: GridSpec, cancel: CancelSignal) -> SurveyResult<SurveyOutcome> {
        let mut state = RunState::Idle;

        self.transition(&mut state, RunState::Preparing);
        let coordinates = preflight(&spec, &self.config)?;
        let context = Arc::new(RunContext::prepare(spec, &self.config.output_root, cancel)?);

        self.transition(&mut state, RunState::Running);
        let total = coordinates.len();
        info!(
            "Surveying {} points around {} with {} workers",
            total, spec.center, self.config.workers
        );
        self.emit(RunEvent::Started { total });

        let pipeline = PointPipeline {
            imagery: self.imagery.clone(),
            labeler: Arc::clone(&self.labeler),
            assessor: Arc::clone(&self.assessor),
            context: Arc::clone(&context),
        };
        let dataset = self.collect(pipeline, coordinates, context.cancel_signal()).await?;

        self.transition(&mut state, RunState::Aggregating);
        let summary = dataset.summary();
        info!(
            "Collected {} records: {} captured, {} failed",
            summary.total, summary.captured, summary.fetch_failures
        );

        let dataset_path = context.dataset_path();
        dataset.write_csv(&dataset_path)?;
        self.transition(&mut state, RunState::Persisted);
        info!("Dataset written to {}", dataset_path.display());
        self.emit(RunEvent::Persisted {
            path: dataset_path.clone(),
        });

        self.transition(&mut state, RunState::Done);
        let context = Arc::try_unwrap(context).unwrap_or_else(|shared| (*shared).clone());

        Ok(SurveyOutcome {
            context,
            dataset,
            dataset_path,
            summary,
        })
    }

    /// Keep at most `workers` points in flight and gather records as they finish
    async fn collect(
        &self,
        pipeline: PointPipeline,
        coordinates: Vec<SampleCoordinate>,
        mut cancel: CancelSignal,
    ) -> SurveyResult<SampleDataset> {
        let total = coordinates.len();
        let mut pending = coordinates.into_iter();
        let mut join_set = JoinSet::new();
        let mut dataset = SampleDataset::with_capacity(total);
        let mut dispatched = Vec::with_capacity(total);
        let mut failed = 0usize;
        let mut lost = 0usize;

        let spawn = |join_set: &mut JoinSet<SampleRecord>,
                     dispatched: &mut Vec<SampleCoordinate>,
                     coordinate: SampleCoordinate| {
            dispatched.push(coordinate);
            let pipeline = pipeline.clone();
            join_set.spawn(async move {
                match AssertUnwindSafe(pipeline.process(coordinate)).catch_unwind().await {
                    Ok(record) => record,
                    Err(_) => {
                        log::error!("Worker panicked while processing {}", coordinate);
                        SampleRecord::failed(coordinate, "worker panicked")
                    }
                }
            });
        };

        for coordinate in pending.by_ref().take(self.config.workers) {
            spawn(&mut join_set, &mut dispatched, coordinate);
        }

        while !join_set.is_empty() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!("Cancellation requested, aborting {} in-flight points", join_set.len());
                    join_set.abort_all();
                    while join_set.join_next().await.is_some() {}
                    return Err(SurveyError::Cancelled { completed: dataset.len() + lost, total });
                }
                joined = join_set.join_next() => {
                    let Some(joined) = joined else { break };
                    match joined {
                        Ok(record) => {
                            if !record.is_captured() {
                                failed += 1;
                            }
                            dataset.push(record);
                        }
                        Err(e) => {
                            log::error!("Worker task ended abnormally: {}", e);
                            failed += 1;
                            lost += 1;
                        }
                    }

                    self.emit(RunEvent::PointFinished {
                        completed: dataset.len() + lost,
                        total,
                        failed,
                    });

                    if let Some(coordinate) = pending.next() {
                        spawn(&mut join_set, &mut dispatched, coordinate);
                    }
                }
            }
        }

        backfill_lost(&mut dataset, &dispatched);
        Ok(dataset)
    }
}

/// Record a failure for every dispatched point whose task produced nothing
fn backfill_lost(dataset: &mut SampleDataset, dispatched: &[SampleCoordinate]) -> usize {
    let mut added = 0;
    for coordinate in dispatched {
        if !dataset.contains(coordinate) {
            dataset.push(SampleRecord::failed(*coordinate, "worker task ended abnormally"));
            added += 1;
        }
    }
    added
}

/// Check a run's inputs and return its grid, before any client exists
pub fn preflight(spec: &GridSpec, config: &SurveyConfig) -> SurveyResult<Vec<SampleCoordinate>> {
    config.validate()?;
    let coordinates = spec.generate()?;
    if let Some(area) = config.service_area {
        area.check(spec.center)?;
    }
    Ok(coordinates)
}

/// Coordinates a run would visit, without touching the network
pub fn preview_grid(spec: &GridSpec) -> SurveyResult<Vec<SampleCoordinate>> {
    spec.generate()
}
