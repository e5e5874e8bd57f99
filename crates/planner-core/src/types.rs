use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// ScheduleKind
// ---------------------------------------------------------------------------

/// The two independent timetable generations. Each has its own solver
/// command, its own schedule table, and its own solve lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleKind {
    Regular,
    Exam,
}

impl ScheduleKind {
    pub fn all() -> &'static [ScheduleKind] {
        &[ScheduleKind::Regular, ScheduleKind::Exam]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScheduleKind::Regular => "regular",
            ScheduleKind::Exam => "exam",
        }
    }
}

impl fmt::Display for ScheduleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Dataset records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub module_code: String,
    pub semester: u32,
    /// Length of one session, in slots.
    pub duration: u32,
    pub department: String,
    /// Shared across departments.
    pub is_common: bool,
    pub students: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hall {
    pub room_name: String,
    pub capacity: u32,
}

/// Everything the solver reads for one attempt: the dataset as committed
/// when the attempt started.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSnapshot {
    pub modules: Vec<Module>,
    pub halls: Vec<Hall>,
}

impl DatasetSnapshot {
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty() && self.halls.is_empty()
    }
}

// ---------------------------------------------------------------------------
// ScheduleEntry
// ---------------------------------------------------------------------------

/// One placed module. Regular entries always carry `duration`; exam entries
/// never do, and may carry a display `name`. For exam entries `hall` holds the
/// co-assigned halls joined with `", "`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub code: String,
    pub day: String,
    pub hall: String,
    /// Zero-based slot index within the day.
    pub slot: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    pub students: u32,
    pub department: String,
    pub semester: u32,
    pub is_common: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}
