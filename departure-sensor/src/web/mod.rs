//! HTTP surface of the reference host.
//!
//! Exposes each monitor's latest output as JSON and lets a sensor's query
//! options be replaced while it runs.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::create_router;
pub use state::AppState;
