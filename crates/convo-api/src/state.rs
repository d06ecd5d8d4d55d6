use std::sync::Arc;

use convo_core::{ModelCatalogue, SessionManager};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub catalogue: Arc<dyn ModelCatalogue>,
}

impl AppState {
    pub fn new(sessions: Arc<SessionManager>, catalogue: Arc<dyn ModelCatalogue>) -> Self {
        Self { sessions, catalogue }
    }
}
