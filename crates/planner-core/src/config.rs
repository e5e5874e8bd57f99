use crate::error::{PlannerError, Result};
use crate::paths;
use crate::types::ScheduleKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// SolverCommand
// ---------------------------------------------------------------------------

/// A pre-registered solver command line. Never built from request data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Relative paths are resolved against the project root.
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,
}

fn default_working_dir() -> PathBuf {
    PathBuf::from("solver")
}

impl SolverCommand {
    fn python(script: &str) -> Self {
        Self {
            program: "python".to_string(),
            args: vec![script.to_string()],
            working_dir: default_working_dir(),
        }
    }

    /// Human-readable command line, for logs.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// ---------------------------------------------------------------------------
// SolverConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_regular_command")]
    pub regular: SolverCommand,
    #[serde(default = "default_exam_command")]
    pub exam: SolverCommand,
}

fn default_timeout_seconds() -> u64 {
    300
}

fn default_regular_command() -> SolverCommand {
    SolverCommand::python("timetable_csp.py")
}

fn default_exam_command() -> SolverCommand {
    SolverCommand::python("exam_timetable_csp.py")
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
            regular: default_regular_command(),
            exam: default_exam_command(),
        }
    }
}

impl SolverConfig {
    pub fn command_for(&self, kind: ScheduleKind) -> &SolverCommand {
        match kind {
            ScheduleKind::Regular => &self.regular,
            ScheduleKind::Exam => &self.exam,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_port() -> u16 {
    8080
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

// ---------------------------------------------------------------------------
// ProjectConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    pub project: ProjectConfig,
    #[serde(default)]
    pub solver: SolverConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

fn default_version() -> u32 {
    1
}

impl Config {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            version: 1,
            project: ProjectConfig {
                name: project_name.into(),
                description: None,
            },
            solver: SolverConfig::default(),
            server: ServerConfig::default(),
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(PlannerError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self, root: &Path) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        for kind in ScheduleKind::all() {
            let cmd = self.solver.command_for(*kind);

            if cmd.program.trim().is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("solver.{kind}.program is empty"),
                });
                continue;
            }

            let on_path = which::which(&cmd.program).is_ok();
            let as_file = paths::resolve(root, Path::new(&cmd.program)).is_file();
            if !on_path && !as_file {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!(
                        "solver.{kind}.program '{}' was not found on PATH",
                        cmd.program
                    ),
                });
            }

            let wd = paths::resolve(root, &cmd.working_dir);
            if !wd.is_dir() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!(
                        "solver.{kind}.working_dir '{}' does not exist",
                        wd.display()
                    ),
                });
            }
        }

        if self.solver.timeout_seconds == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "solver.timeout_seconds must be greater than zero".to_string(),
            });
        } else if self.solver.timeout_seconds > 3600 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "solver.timeout_seconds={} (>1h is unusual)",
                    self.solver.timeout_seconds
                ),
            });
        }

        if self.server.max_upload_bytes == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "server.max_upload_bytes must be greater than zero".to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
