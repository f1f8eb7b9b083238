//! Data transfer objects for web responses.

use serde::Serialize;

use crate::monitor::{MonitorHandle, Phase, SensorOutput};

/// One sensor's state.
#[derive(Debug, Serialize)]
pub struct SensorResponse {
    /// Latest published output
    #[serde(flatten)]
    pub output: SensorOutput,

    /// Poll cycle phase; `stopped` once the monitor task has ended
    pub phase: Phase,
}

impl SensorResponse {
    /// Snapshot a running monitor.
    pub fn from_handle(handle: &MonitorHandle) -> Self {
        Self {
            output: handle.output(),
            phase: handle.phase(),
        }
    }
}

/// All sensors.
#[derive(Debug, Serialize)]
pub struct SensorListResponse {
    pub sensors: Vec<SensorResponse>,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}
