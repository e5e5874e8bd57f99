pub mod config;
pub mod error;
pub mod ingest;
pub mod io;
pub mod orchestrator;
pub mod paths;
pub mod solver;
pub mod store;
pub mod types;

pub use error::{
    ExtractionError, PlannerError, ProcessError, Result, StoreError, ValidationError,
};
pub use ingest::Upload;
pub use orchestrator::{
    failure_message, status_message, Orchestrator, SolveOutcome, SolveRecord, SolveReport,
    SolveState, SolveStatus,
};
pub use store::PlannerDb;
pub use types::{DatasetSnapshot, Hall, Module, ScheduleEntry, ScheduleKind};
