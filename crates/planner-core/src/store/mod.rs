//! Durable storage for the dataset (modules, halls) and the two schedules.
//!
//! Both stores expose bulk *replace* rather than row-level edits: every
//! ingestion replaces the whole dataset and every successful solve replaces
//! the whole schedule of its kind. Implementations must make each replace
//! atomic to concurrent readers.

pub mod db;

pub use db::PlannerDb;

use crate::error::Result;
use crate::types::{DatasetSnapshot, Hall, Module, ScheduleEntry, ScheduleKind};

pub trait DatasetStore: Send + Sync {
    /// Replace modules and halls together in one transaction.
    fn replace_dataset(&self, dataset: &DatasetSnapshot) -> Result<()>;

    fn modules(&self) -> Result<Vec<Module>>;

    fn halls(&self) -> Result<Vec<Hall>>;

    /// Modules and halls read from the same committed generation.
    fn snapshot(&self) -> Result<DatasetSnapshot>;
}

pub trait ScheduleStore: Send + Sync {
    /// Discard the schedule of `kind` and write `entries` in its place.
    fn replace_schedule(&self, kind: ScheduleKind, entries: &[ScheduleEntry]) -> Result<()>;

    fn schedule(&self, kind: ScheduleKind) -> Result<Vec<ScheduleEntry>>;
}
