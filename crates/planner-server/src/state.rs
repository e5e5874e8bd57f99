use std::path::Path;
use std::sync::Arc;

use planner_core::config::Config;
use planner_core::Orchestrator;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Load `.planner/config.yaml` under `root` and open the project database.
    pub fn load(root: &Path) -> planner_core::Result<Self> {
        let config = Config::load(root)?;
        Self::from_config(root, &config)
    }

    pub fn from_config(root: &Path, config: &Config) -> planner_core::Result<Self> {
        let orchestrator = Orchestrator::open(root, config)?;
        Ok(Self {
            orchestrator: Arc::new(orchestrator),
            max_upload_bytes: config.server.max_upload_bytes,
        })
    }
}
