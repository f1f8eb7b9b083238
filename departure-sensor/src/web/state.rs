//! Application state for the web layer.

use std::sync::Arc;

use crate::monitor::MonitorHandle;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Running monitors, in configuration order
    pub monitors: Arc<Vec<MonitorHandle>>,
}

impl AppState {
    /// Create a new app state.
    pub fn new(monitors: Vec<MonitorHandle>) -> Self {
        Self {
            monitors: Arc::new(monitors),
        }
    }

    /// Find a monitor by the pair's unique id.
    pub fn find(&self, unique_id: &str) -> Option<&MonitorHandle> {
        self.monitors.iter().find(|m| m.unique_id() == unique_id)
    }
}
