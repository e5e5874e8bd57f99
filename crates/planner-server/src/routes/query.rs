use axum::extract::State;
use axum::Json;
use planner_core::{Hall, Module, ScheduleEntry, ScheduleKind};

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/modules
pub async fn modules(State(app): State<AppState>) -> Result<Json<Vec<Module>>, AppError> {
    Ok(Json(app.orchestrator.modules().await?))
}

/// GET /api/halls
pub async fn halls(State(app): State<AppState>) -> Result<Json<Vec<Hall>>, AppError> {
    Ok(Json(app.orchestrator.halls().await?))
}

/// GET /api/solver-results: the committed regular timetable.
pub async fn solver_results(
    State(app): State<AppState>,
) -> Result<Json<Vec<ScheduleEntry>>, AppError> {
    Ok(Json(app.orchestrator.schedule(ScheduleKind::Regular).await?))
}

/// GET /api/solver-exam-results: the committed exam timetable.
pub async fn solver_exam_results(
    State(app): State<AppState>,
) -> Result<Json<Vec<ScheduleEntry>>, AppError> {
    Ok(Json(app.orchestrator.schedule(ScheduleKind::Exam).await?))
}
