use anyhow::Context;
use planner_core::{ScheduleKind, Upload};
use std::path::Path;

use super::solve::{open, report};

pub fn run(root: &Path, file: &Path, kind: ScheduleKind, json: bool) -> anyhow::Result<()> {
    let bytes =
        std::fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned());

    let orchestrator = open(root)?;
    let rt = tokio::runtime::Runtime::new()?;
    let result = rt.block_on(orchestrator.ingest_and_solve(kind, Upload::new(file_name, bytes)));
    report(result, json)
}
