use std::path::{Path, PathBuf};

use crate::types::ScheduleKind;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const PLANNER_DIR: &str = ".planner";
pub const UPLOADS_DIR: &str = ".planner/uploads";
pub const SNAPSHOTS_DIR: &str = ".planner/snapshots";

pub const CONFIG_FILE: &str = ".planner/config.yaml";
pub const DB_FILE: &str = ".planner/planner.db";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn db_path(root: &Path) -> PathBuf {
    root.join(DB_FILE)
}

pub fn uploads_dir(root: &Path, kind: ScheduleKind) -> PathBuf {
    root.join(UPLOADS_DIR).join(kind.as_str())
}

pub fn snapshot_path(root: &Path, kind: ScheduleKind) -> PathBuf {
    root.join(SNAPSHOTS_DIR)
        .join(format!("dataset-{}.json", kind.as_str()))
}

/// Resolve a configured path: absolute paths are kept, relative ones are
/// anchored at the project root.
pub fn resolve(root: &Path, configured: &Path) -> PathBuf {
    if configured.is_absolute() {
        configured.to_path_buf()
    } else {
        root.join(configured)
    }
}
