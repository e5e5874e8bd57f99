use anyhow::Context;
use planner_core::config::Config;
use planner_core::{failure_message, Orchestrator, PlannerError, ScheduleKind, SolveReport};
use std::path::Path;

use crate::output::print_json;

pub fn run(root: &Path, kind: ScheduleKind, json: bool) -> anyhow::Result<()> {
    let orchestrator = open(root)?;
    let rt = tokio::runtime::Runtime::new()?;
    let result = rt.block_on(orchestrator.solve(kind));
    report(result, json)
}

pub(crate) fn open(root: &Path) -> anyhow::Result<Orchestrator> {
    let config = Config::load(root).context("failed to load config")?;
    Orchestrator::open(root, &config).context("failed to open planner database")
}

/// Print a committed solve, or fail with the same one-line reason the HTTP
/// API reports.
pub(crate) fn report(result: Result<SolveReport, PlannerError>, json: bool) -> anyhow::Result<()> {
    let report = result.map_err(|e| anyhow::anyhow!(failure_message(&e)))?;
    if json {
        print_json(&serde_json::json!({
            "message": report.message(),
            "report": report,
        }))?;
    } else {
        println!("{}", report.message());
    }
    Ok(())
}
