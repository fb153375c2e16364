// survey-orchestrator-rs/src/context.rs
// Immutable per-run context shared read-only by every worker

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tokio::sync::watch;

use crate::error::{SurveyError, SurveyResult};
use crate::grid::GridSpec;

/// Sending half of a run's cancellation signal
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Create a handle and the signal workers listen on
    pub fn pair() -> (Self, CancelSignal) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, CancelSignal { rx })
    }

    /// Request cancellation of the run
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Another receiver for the same signal
    pub fn signal(&self) -> CancelSignal {
        CancelSignal { rx: self.tx.subscribe() }
    }
}

/// Receiving half of a run's cancellation signal
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    /// A signal that never fires
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once cancellation is requested; pends forever if the handle is gone
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                futures::future::pending::<()>().await;
            }
        }
    }
}

/// Everything a run needs to know, computed once before dispatch
#[derive(Debug, Clone)]
pub struct RunContext {
    spec: GridSpec,
    location_name: String,
    results_dir: PathBuf,
    started_at: DateTime<Local>,
    cancel: CancelSignal,
}

impl RunContext {
    /// Name the run after its center and create its results directory
    ///
    /// Creating the directory is idempotent; an existing directory is reused.
    pub fn prepare(spec: GridSpec, output_root: &Path, cancel: CancelSignal) -> SurveyResult<Self> {
        let started_at = Local::now();
        let location_name = location_name(&spec);
        let results_dir = output_root.join(format!(
            "{}_T{}",
            location_name,
            started_at.format("%Y%m%d_%H%M%S%6f")
        ));

        if results_dir.is_dir() {
            log::info!("Reusing results directory {}", results_dir.display());
        } else {
            std::fs::create_dir_all(&results_dir).map_err(|source| SurveyError::ResultsDirectory {
                path: results_dir.clone(),
                source,
            })?;
            log::info!("Created results directory {}", results_dir.display());
        }

        Ok(Self {
            spec,
            location_name,
            results_dir,
            started_at,
            cancel,
        })
    }

    pub fn spec(&self) -> &GridSpec {
        &self.spec
    }

    /// `LT{lat}LG{lon}` with '.' replaced by '_'
    pub fn location_name(&self) -> &str {
        &self.location_name
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    /// Where the dataset export is written
    pub fn dataset_path(&self) -> PathBuf {
        self.results_dir.join(format!("{}.csv", self.location_name))
    }

    pub fn cancel_signal(&self) -> CancelSignal {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

fn location_name(spec: &GridSpec) -> String {
    format!(
        "LT{}LG{}",
        spec.center.latitude.to_string().replace('.', "_"),
        spec.center.longitude.to_string().replace('.', "_")
    )
}
