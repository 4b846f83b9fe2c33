//! Shared application state for the cycle server.

use std::path::PathBuf;
use std::sync::Arc;

use callcycle::cycle::Adapters;
use callcycle::io::config::CallcycleConfig;
use callcycle::io::init::CallcyclePaths;
use tokio::sync::Mutex;

/// Shared state accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Root directory of the project (contains .callcycle/).
    pub project_dir: PathBuf,
    pub config: Arc<CallcycleConfig>,
    pub adapters: Arc<Adapters>,
    /// Held for the duration of a cycle so the state file has a single writer.
    pub cycle_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(project_dir: PathBuf, config: CallcycleConfig, adapters: Adapters) -> Self {
        Self {
            project_dir,
            config: Arc::new(config),
            adapters: Arc::new(adapters),
            cycle_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn paths(&self) -> CallcyclePaths {
        CallcyclePaths::new(&self.project_dir)
    }
}
