use std::time::Duration;

use thiserror::Error;

use crate::types::ScheduleKind;

/// Rejections raised while reading an uploaded workbook. Nothing has been
/// written when one of these is returned.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("No file uploaded or file is empty.")]
    EmptyFile,

    #[error("Invalid file type. Only Excel files (.xls, .xlsx) are allowed.")]
    InvalidFileType,

    #[error("Invalid file content. Please upload a valid Excel file.")]
    InvalidContent { detail: String },

    #[error("Excel validation failed. Missing sheet(s): {}", .0.join(", "))]
    MissingSheets(Vec<String>),

    #[error("invalid row {row} in sheet '{sheet}': {reason}")]
    InvalidRow {
        sheet: String,
        row: usize,
        reason: String,
    },

    #[error("duplicate module code '{0}' in sheet 'module codes'")]
    DuplicateModule(String),
}

/// Failures launching or waiting on the external solver.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("solver executable not found: {0}")]
    ExecutableNotFound(String),

    #[error("failed to spawn solver '{program}': {reason}")]
    Spawn { program: String, reason: String },

    #[error("solver I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("solver timed out after {}s", .after.as_secs())]
    Timeout { after: Duration, output: String },
}

impl ProcessError {
    /// Output captured before the failure, if any.
    pub fn captured_output(&self) -> Option<&str> {
        match self {
            ProcessError::Timeout { output, .. } => Some(output),
            _ => None,
        }
    }
}

/// The solver ran but its output does not honor the payload contract.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("No JSON found in solver output.")]
    NoPayload,

    #[error("Malformed JSON in solver output: {0}")]
    MalformedPayload(String),

    #[error("No timetable found in JSON.")]
    MissingTimetable,

    #[error("Solver reported no feasible timetable.")]
    Infeasible,

    #[error("Invalid timetable record at index {index}: missing or invalid field '{field}'")]
    InvalidRecord { index: usize, field: &'static str },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),

    #[error("corrupt record in table '{table}': {reason}")]
    Corrupt { table: String, reason: String },
}

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("not initialized: run 'planner init'")]
    NotInitialized,

    #[error("{0} solve already in progress")]
    SolveInProgress(ScheduleKind),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PlannerError>;
