//! Domain types for the departure sensor.
//!
//! These types represent validated schedule data. They enforce their
//! invariants at construction time, so pipeline stages that receive them
//! do not need to re-check raw strings.

mod connection;
mod product;
mod time;

pub use connection::Connection;
pub use product::{InvalidProduct, Product};
pub use time::{ClockTime, SequenceResolver, TimeError};
