use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::State;
use axum::Json;
use planner_core::error::ValidationError;
use planner_core::{ScheduleKind, Upload};

use crate::error::AppError;
use crate::routes::solve::SolveResponse;
use crate::state::AppState;

/// Multipart field carrying the workbook.
const FILE_FIELD: &str = "file";

/// POST /api/upload: replace the dataset from a workbook and solve the
/// regular timetable.
pub async fn upload(
    State(app): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<SolveResponse>, AppError> {
    ingest(app, ScheduleKind::Regular, multipart).await
}

/// POST /api/uploadExam: replace the dataset from a workbook and solve the
/// exam timetable.
pub async fn upload_exam(
    State(app): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<SolveResponse>, AppError> {
    ingest(app, ScheduleKind::Exam, multipart).await
}

async fn ingest(
    app: AppState,
    kind: ScheduleKind,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<SolveResponse>, AppError> {
    let mut multipart =
        multipart.map_err(|rej| AppError::rejected_body(rej.status(), rej.body_text()))?;
    let upload = read_file_field(&mut multipart).await?;
    tracing::info!(
        %kind,
        file = upload.file_name.as_deref().unwrap_or("<unnamed>"),
        bytes = upload.bytes.len(),
        "workbook received"
    );

    let report = app.orchestrator.ingest_and_solve(kind, upload).await?;
    Ok(Json(SolveResponse::from(&report)))
}

async fn read_file_field(multipart: &mut Multipart) -> Result<Upload, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::rejected_body(e.status(), e.body_text()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::rejected_body(e.status(), e.body_text()))?;
        return Ok(Upload::new(file_name, bytes.to_vec()));
    }
    Err(planner_core::PlannerError::from(ValidationError::EmptyFile).into())
}
