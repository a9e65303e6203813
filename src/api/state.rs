use std::sync::Arc;

use crate::core::AppConfig;
use crate::scheduling::Orchestrator;

pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>, config: AppConfig) -> Self {
        Self {
            orchestrator,
            config,
        }
    }
}
