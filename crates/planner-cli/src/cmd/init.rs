use anyhow::Context;
use planner_core::{config::Config, io, paths};
use std::path::Path;

pub fn run(root: &Path, name: Option<&str>) -> anyhow::Result<()> {
    let project_name = name
        .map(str::to_string)
        .or_else(|| root.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "planner".to_string());

    println!("Initializing planner in: {}", root.display());

    for dir in [paths::PLANNER_DIR, paths::UPLOADS_DIR, paths::SNAPSHOTS_DIR] {
        let p = root.join(dir);
        io::ensure_dir(&p).with_context(|| format!("failed to create {}", p.display()))?;
    }

    let yaml = serde_yaml::to_string(&Config::new(&project_name))?;
    let created = io::write_if_missing(&paths::config_path(root), yaml.as_bytes())
        .context("failed to write config.yaml")?;
    let verb = if created { "created:" } else { "exists: " };
    println!("  {verb} {}", paths::CONFIG_FILE);

    let config = Config::load(root).context("failed to load config")?;
    for kind in planner_core::ScheduleKind::all() {
        let wd = paths::resolve(root, &config.solver.command_for(*kind).working_dir);
        if !wd.is_dir() {
            println!(
                "  note:    solver working directory {} does not exist yet",
                wd.display()
            );
        }
    }

    println!("\nplanner initialized. Next: planner ingest <workbook.xlsx>");
    Ok(())
}
