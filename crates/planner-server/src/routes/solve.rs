use axum::extract::State;
use axum::Json;
use planner_core::{ScheduleKind, SolveReport, SolveStatus};
use serde::Serialize;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SolveResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records: Option<usize>,
}

impl From<&SolveReport> for SolveResponse {
    fn from(report: &SolveReport) -> Self {
        Self {
            message: report.message(),
            records: Some(report.records),
        }
    }
}

/// GET|POST /api/solve
pub async fn solve(State(app): State<AppState>) -> Result<Json<SolveResponse>, AppError> {
    run(app, ScheduleKind::Regular).await
}

/// GET|POST /api/examSolve
pub async fn exam_solve(State(app): State<AppState>) -> Result<Json<SolveResponse>, AppError> {
    run(app, ScheduleKind::Exam).await
}

async fn run(app: AppState, kind: ScheduleKind) -> Result<Json<SolveResponse>, AppError> {
    let report = app.orchestrator.solve(kind).await?;
    Ok(Json(SolveResponse::from(&report)))
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub regular: SolveStatus,
    pub exam: SolveStatus,
}

/// GET /api/solve/status: running state and last outcome per kind.
pub async fn status(State(app): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        regular: app.orchestrator.status(ScheduleKind::Regular),
        exam: app.orchestrator.status(ScheduleKind::Exam),
    })
}
