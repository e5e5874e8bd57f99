//! Solve attempt bookkeeping: what is running now and how the last attempt
//! of each kind ended.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::error::PlannerError;
use crate::types::ScheduleKind;

// ---------------------------------------------------------------------------
// SolveState
// ---------------------------------------------------------------------------

/// Transitions: `Idle → Running → Idle`. The outcome of the run is kept in
/// the last [`SolveRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveState {
    Idle,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveOutcome {
    /// The schedule was replaced.
    Committed,
    /// The previous schedule is still in place.
    Failed,
}

// ---------------------------------------------------------------------------
// SolveReport
// ---------------------------------------------------------------------------

/// Result of a committed solve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveReport {
    pub kind: ScheduleKind,
    pub records: usize,
    /// Exit code of the solver; a non-zero code with a valid payload still commits.
    pub exit_code: Option<i32>,
    #[serde(with = "duration_ms")]
    pub elapsed: Duration,
}

impl SolveReport {
    pub fn message(&self) -> String {
        format!(
            "Solver executed successfully. {} records saved.",
            self.records
        )
    }
}

/// The human-readable status line for a solve result.
///
/// Extraction failures and validation errors read as their own message;
/// anything that went wrong around the solver process is prefixed with
/// `Error running solver:`.
pub fn status_message(result: &Result<SolveReport, PlannerError>) -> String {
    match result {
        Ok(report) => report.message(),
        Err(e) => failure_message(e),
    }
}

pub fn failure_message(err: &PlannerError) -> String {
    match err {
        PlannerError::Extraction(_)
        | PlannerError::Validation(_)
        | PlannerError::SolveInProgress(_)
        | PlannerError::NotInitialized => err.to_string(),
        _ => format!("Error running solver: {err}"),
    }
}

// ---------------------------------------------------------------------------
// SolveRecord / SolveStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveRecord {
    pub id: Uuid,
    pub kind: ScheduleKind,
    pub outcome: SolveOutcome,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub records: Option<usize>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SolveRecord {
    pub(crate) fn finish(
        id: Uuid,
        kind: ScheduleKind,
        started_at: DateTime<Utc>,
        result: &Result<SolveReport, PlannerError>,
    ) -> Self {
        let (outcome, records) = match result {
            Ok(report) => (SolveOutcome::Committed, Some(report.records)),
            Err(_) => (SolveOutcome::Failed, None),
        };
        Self {
            id,
            kind,
            outcome,
            message: status_message(result),
            records,
            started_at,
            finished_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveStatus {
    pub kind: ScheduleKind,
    pub state: SolveState,
    pub last: Option<SolveRecord>,
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
