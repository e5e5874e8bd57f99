use anyhow::Context;
use clap::Subcommand;
use planner_core::config::Config;
use planner_core::store::{DatasetStore, ScheduleStore};
use planner_core::{paths, PlannerDb, ScheduleKind};
use std::path::Path;

use crate::output::{print_json, print_table};

#[derive(Subcommand)]
pub enum ListSubcommand {
    /// Modules from the last ingested workbook
    Modules,
    /// Halls from the last ingested workbook
    Halls,
    /// The committed timetable
    Schedule {
        /// Show the exam timetable instead of the regular one
        #[arg(long)]
        exam: bool,
    },
}

pub fn run(root: &Path, subcmd: ListSubcommand, json: bool) -> anyhow::Result<()> {
    Config::load(root).context("failed to load config")?;
    let db = PlannerDb::open(&paths::db_path(root)).context("failed to open planner database")?;

    match subcmd {
        ListSubcommand::Modules => {
            let modules = db.modules()?;
            if json {
                return print_json(&modules);
            }
            if modules.is_empty() {
                println!("No modules. Run 'planner ingest <workbook>' first.");
                return Ok(());
            }
            let rows = modules
                .iter()
                .map(|m| {
                    vec![
                        m.module_code.clone(),
                        m.semester.to_string(),
                        m.duration.to_string(),
                        m.department.clone(),
                        yes_no(m.is_common),
                        m.students.to_string(),
                    ]
                })
                .collect::<Vec<_>>();
            print_table(
                &["CODE", "SEMESTER", "DURATION", "DEPARTMENT", "COMMON", "STUDENTS"],
                &rows,
            );
        }
        ListSubcommand::Halls => {
            let halls = db.halls()?;
            if json {
                return print_json(&halls);
            }
            if halls.is_empty() {
                println!("No halls. Run 'planner ingest <workbook>' first.");
                return Ok(());
            }
            let rows = halls
                .iter()
                .map(|h| vec![h.room_name.clone(), h.capacity.to_string()])
                .collect::<Vec<_>>();
            print_table(&["ROOM", "CAPACITY"], &rows);
        }
        ListSubcommand::Schedule { exam } => {
            let kind = if exam {
                ScheduleKind::Exam
            } else {
                ScheduleKind::Regular
            };
            let entries = db.schedule(kind)?;
            if json {
                return print_json(&entries);
            }
            if entries.is_empty() {
                println!("No {kind} schedule committed yet.");
                return Ok(());
            }
            let rows = entries
                .iter()
                .map(|e| {
                    vec![
                        e.code.clone(),
                        e.day.clone(),
                        e.slot.to_string(),
                        e.hall.clone(),
                        e.department.clone(),
                        e.students.to_string(),
                    ]
                })
                .collect::<Vec<_>>();
            print_table(&["CODE", "DAY", "SLOT", "HALL", "DEPARTMENT", "STUDENTS"], &rows);
        }
    }
    Ok(())
}

fn yes_no(b: bool) -> String {
    if b { "yes" } else { "no" }.to_string()
}
