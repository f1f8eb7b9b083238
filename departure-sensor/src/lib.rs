//! Train departure sensor.
//!
//! Polls a Deutsche Bahn schedule source for configured origin/destination
//! pairs and exposes the next departures as a single display value plus
//! structured attributes.

pub mod config;
pub mod domain;
pub mod monitor;
pub mod pipeline;
pub mod source;
pub mod web;
