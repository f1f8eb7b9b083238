//! Canonical connection type.

use std::collections::HashSet;

use super::{ClockTime, Product};

/// One scheduled departure/arrival pair between the monitored stations.
///
/// Created fresh on every poll by the normalizer; sources never hand these
/// out directly. Times carry no date; see
/// [`SequenceResolver`](super::SequenceResolver) for how they are anchored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    /// Scheduled departure from the origin.
    pub departure_scheduled: ClockTime,

    /// Scheduled arrival at the destination, if the source reported one.
    pub arrival_scheduled: Option<ClockTime>,

    /// Reported departure delay in minutes (may be negative).
    pub delay_departure_minutes: i64,

    /// Reported arrival delay in minutes (may be negative).
    pub delay_arrival_minutes: i64,

    /// Whether the source flagged the connection as on time.
    pub on_time: bool,

    /// Whether the connection is canceled.
    pub canceled: bool,

    /// Product codes used by the connection, in reported order, without duplicates.
    pub products: Vec<Product>,

    /// Travel time as reported by the source (e.g. "1:05").
    pub duration: Option<String>,

    /// Number of changes.
    pub transfers: Option<u32>,
}

impl Connection {
    /// Create a connection with no delays, products or arrival.
    pub fn new(departure_scheduled: ClockTime) -> Self {
        Self {
            departure_scheduled,
            arrival_scheduled: None,
            delay_departure_minutes: 0,
            delay_arrival_minutes: 0,
            on_time: false,
            canceled: false,
            products: Vec::new(),
            duration: None,
            transfers: None,
        }
    }

    /// Delay-adjusted departure time.
    pub fn departure_current(&self) -> ClockTime {
        self.departure_scheduled
            .add_minutes(self.delay_departure_minutes)
    }

    /// Delay-adjusted arrival time, if the arrival is known.
    pub fn arrival_current(&self) -> Option<ClockTime> {
        self.arrival_scheduled
            .map(|t| t.add_minutes(self.delay_arrival_minutes))
    }

    /// Whether any of this connection's products is in `products`.
    pub fn uses_any(&self, products: &HashSet<Product>) -> bool {
        self.products.iter().any(|p| products.contains(p))
    }
}
