mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, list::ListSubcommand};
use planner_core::ScheduleKind;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "planner",
    about = "Timetable planner: ingest module and hall workbooks, run the solver, inspect schedules",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .planner/ or .git/)
    #[arg(long, global = true, env = "PLANNER_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize .planner/ in the current project
    Init {
        /// Project name (default: directory name)
        #[arg(long)]
        name: Option<String>,
    },

    /// Serve the HTTP API until interrupted
    Serve {
        /// Port to listen on (default: server.port from config)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Load a workbook into the dataset, then solve
    Ingest {
        /// Path to an .xls/.xlsx workbook
        file: PathBuf,
        /// Solve the exam timetable instead of the regular one
        #[arg(long)]
        exam: bool,
    },

    /// Run the solver against the current dataset
    Solve {
        /// Solve the exam timetable instead of the regular one
        #[arg(long)]
        exam: bool,
    },

    /// List stored modules, halls, or schedule entries
    List {
        #[command(subcommand)]
        subcommand: ListSubcommand,
    },

    /// Inspect and validate .planner/config.yaml
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn kind(exam: bool) -> ScheduleKind {
    if exam {
        ScheduleKind::Exam
    } else {
        ScheduleKind::Regular
    }
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init { name } => cmd::init::run(&root, name.as_deref()),
        Commands::Serve { port } => cmd::serve::run(&root, port),
        Commands::Ingest { file, exam } => cmd::ingest::run(&root, &file, kind(exam), cli.json),
        Commands::Solve { exam } => cmd::solve::run(&root, kind(exam), cli.json),
        Commands::List { subcommand } => cmd::list::run(&root, subcommand, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
