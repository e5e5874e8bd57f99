//! Drives one solve attempt per request: snapshot the dataset, run the
//! solver, extract its timetable, and replace the schedule of that kind.
//!
//! Each [`ScheduleKind`] has its own lock. A second request for a kind that
//! is already solving fails fast with [`PlannerError::SolveInProgress`]
//! rather than queueing. Dropping an in-flight solve kills the child process
//! and releases the lock; the schedule is only written once extraction has
//! succeeded, so a failed or cancelled attempt leaves it unchanged.

pub mod status;

pub use status::{
    failure_message, status_message, SolveOutcome, SolveRecord, SolveReport, SolveState, SolveStatus,
};

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::{Config, SolverConfig};
use crate::error::{PlannerError, Result};
use crate::ingest::Upload;
use crate::paths;
use crate::solver::{self, Invocation, DATASET_ENV, KIND_ENV};
use crate::store::{DatasetStore, PlannerDb, ScheduleStore};
use crate::types::{DatasetSnapshot, Hall, Module, ScheduleEntry, ScheduleKind};

// ---------------------------------------------------------------------------
// Per-kind slot
// ---------------------------------------------------------------------------

#[derive(Default)]
struct KindSlot {
    lock: tokio::sync::Mutex<()>,
    running: AtomicBool,
    last: std::sync::Mutex<Option<SolveRecord>>,
}

/// Held for the whole `Running` state of one kind.
struct RunningGuard<'a> {
    _lock: tokio::sync::MutexGuard<'a, ()>,
    running: &'a AtomicBool,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct Orchestrator {
    root: PathBuf,
    solver: SolverConfig,
    dataset: Arc<dyn DatasetStore>,
    schedules: Arc<dyn ScheduleStore>,
    slots: [KindSlot; 2],
}

impl Orchestrator {
    pub fn new(
        root: impl Into<PathBuf>,
        solver: SolverConfig,
        dataset: Arc<dyn DatasetStore>,
        schedules: Arc<dyn ScheduleStore>,
    ) -> Self {
        Self {
            root: root.into(),
            solver,
            dataset,
            schedules,
            slots: Default::default(),
        }
    }

    /// Open the project database under `root` and wire both stores to it.
    pub fn open(root: &Path, config: &Config) -> Result<Self> {
        let db = Arc::new(PlannerDb::open(&paths::db_path(root))?);
        Ok(Self::new(
            root,
            config.solver.clone(),
            db.clone(),
            db,
        ))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn slot(&self, kind: ScheduleKind) -> &KindSlot {
        &self.slots[kind.index()]
    }

    fn acquire(&self, kind: ScheduleKind) -> Result<RunningGuard<'_>> {
        let slot = self.slot(kind);
        let lock = slot
            .lock
            .try_lock()
            .map_err(|_| PlannerError::SolveInProgress(kind))?;
        slot.running.store(true, Ordering::Release);
        Ok(RunningGuard {
            _lock: lock,
            running: &slot.running,
        })
    }

    // -----------------------------------------------------------------------
    // Entry points
    // -----------------------------------------------------------------------

    /// Run the regular solver and describe the outcome in one line.
    pub async fn run_solver(&self) -> String {
        status_message(&self.solve(ScheduleKind::Regular).await)
    }

    /// Run the exam solver and describe the outcome in one line.
    pub async fn run_exam_solver(&self) -> String {
        status_message(&self.solve(ScheduleKind::Exam).await)
    }

    pub async fn solve(&self, kind: ScheduleKind) -> Result<SolveReport> {
        let _guard = self.acquire(kind)?;
        self.run_locked(kind).await
    }

    /// Validate `upload`, archive the workbook, replace the dataset, then
    /// solve `kind`, all under that kind's lock. The dataset is untouched when
    /// validation or archiving fails.
    pub async fn ingest_and_solve(&self, kind: ScheduleKind, upload: Upload) -> Result<SolveReport> {
        let _guard = self.acquire(kind)?;
        let upload = Arc::new(upload);

        let dataset = {
            let upload = upload.clone();
            blocking(move || Ok(upload.validate()?)).await?
        };
        info!(
            %kind,
            modules = dataset.modules.len(),
            halls = dataset.halls.len(),
            "dataset validated"
        );
        if dataset.is_empty() {
            warn!(%kind, "workbook has no module or hall rows");
        }

        let store = self.dataset.clone();
        let root = self.root.clone();
        let archived = blocking(move || {
            let archived = upload.archive(&root, kind)?;
            store.replace_dataset(&dataset)?;
            Ok(archived)
        })
        .await?;
        info!(%kind, path = %archived.display(), "dataset replaced");

        self.run_locked(kind).await
    }

    pub fn status(&self, kind: ScheduleKind) -> SolveStatus {
        let slot = self.slot(kind);
        let state = if slot.running.load(Ordering::Acquire) {
            SolveState::Running
        } else {
            SolveState::Idle
        };
        let last = slot.last.lock().ok().and_then(|l| l.clone());
        SolveStatus { kind, state, last }
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub async fn modules(&self) -> Result<Vec<Module>> {
        let store = self.dataset.clone();
        blocking(move || store.modules()).await
    }

    pub async fn halls(&self) -> Result<Vec<Hall>> {
        let store = self.dataset.clone();
        blocking(move || store.halls()).await
    }

    pub async fn schedule(&self, kind: ScheduleKind) -> Result<Vec<ScheduleEntry>> {
        let store = self.schedules.clone();
        blocking(move || store.schedule(kind)).await
    }

    // -----------------------------------------------------------------------
    // Solve attempt
    // -----------------------------------------------------------------------

    async fn run_locked(&self, kind: ScheduleKind) -> Result<SolveReport> {
        let id = Uuid::new_v4();
        let started_at = Utc::now();
        let span = info_span!("solve", %kind, %id);

        let result = self.attempt(kind).instrument(span).await;

        let record = SolveRecord::finish(id, kind, started_at, &result);
        if let Ok(mut last) = self.slot(kind).last.lock() {
            *last = Some(record);
        }
        result
    }

    async fn attempt(&self, kind: ScheduleKind) -> Result<SolveReport> {
        info!("solve started");

        let store = self.dataset.clone();
        let snapshot_path = paths::snapshot_path(&self.root, kind);
        let snapshot_path = blocking(move || write_snapshot(store.as_ref(), &snapshot_path)).await?;

        let command = self.solver.command_for(kind);
        let invocation = Invocation::from_command(command, &self.root, self.solver.timeout())
            .env(DATASET_ENV, snapshot_path.to_string_lossy())
            .env(KIND_ENV, kind.as_str());
        info!(command = %command.display(), "spawning solver");

        let output = match solver::invoke(&invocation).await {
            Ok(output) => output,
            Err(e) => {
                warn!(
                    error = %e,
                    output = e.captured_output().unwrap_or(""),
                    "solver failed"
                );
                return Err(e.into());
            }
        };
        if !output.success() {
            warn!(exit_code = ?output.exit_code, "solver exited unsuccessfully");
        }

        let entries = match solver::extract(kind, &output.text) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, output = %output.text, "no usable timetable in solver output");
                return Err(e.into());
            }
        };

        let records = entries.len();
        let store = self.schedules.clone();
        if let Err(e) = blocking(move || store.replace_schedule(kind, &entries)).await {
            warn!(error = %e, "schedule commit failed");
            return Err(e);
        }
        info!(
            records,
            elapsed_ms = output.elapsed.as_millis() as u64,
            "schedule committed"
        );

        Ok(SolveReport {
            kind,
            records,
            exit_code: output.exit_code,
            elapsed: output.elapsed,
        })
    }
}

/// Write the committed dataset where the solver can read it. Returns the
/// absolute path handed to the child.
fn write_snapshot(store: &dyn DatasetStore, path: &Path) -> Result<PathBuf> {
    let dataset: DatasetSnapshot = store.snapshot()?;
    let data = serde_json::to_vec_pretty(&dataset)?;
    crate::io::atomic_write(path, &data)?;
    Ok(std::path::absolute(path)?)
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| PlannerError::Io(std::io::Error::other(e)))?
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
