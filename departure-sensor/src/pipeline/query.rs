//! Per-pair query configuration.

use std::collections::HashSet;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::domain::Product;
use crate::source::SourceQuery;

/// Default cap on exposed connections.
pub const DEFAULT_MAX_CONNECTIONS: usize = 2;

/// What to monitor for one origin/destination pair.
///
/// Owned by the host; a monitor reads the current value at the start of
/// every poll and never keeps a copy between polls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Origin station name.
    pub origin: String,

    /// Destination station name.
    pub destination: String,

    /// Minutes added to "now" before querying, to preview later departures.
    #[serde(default)]
    pub offset_mins: i64,

    /// Only consider connections without changes (applied by the source).
    #[serde(default)]
    pub only_direct: bool,

    /// Maximum number of connections to expose.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Connections using any of these products are dropped.
    #[serde(default)]
    pub ignored_products: HashSet<Product>,
}

fn default_max_connections() -> usize {
    DEFAULT_MAX_CONNECTIONS
}

/// The adjustable part of a [`QueryConfig`].
///
/// Everything except the pair itself, which fixes the monitor's identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOptions {
    #[serde(default)]
    pub offset_mins: i64,

    #[serde(default)]
    pub only_direct: bool,

    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    #[serde(default)]
    pub ignored_products: HashSet<Product>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            offset_mins: 0,
            only_direct: false,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            ignored_products: HashSet::new(),
        }
    }
}

impl QueryConfig {
    /// Create a configuration with default options.
    pub fn new(origin: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
            offset_mins: 0,
            only_direct: false,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            ignored_products: HashSet::new(),
        }
    }

    /// Current options.
    pub fn options(&self) -> QueryOptions {
        QueryOptions {
            offset_mins: self.offset_mins,
            only_direct: self.only_direct,
            max_connections: self.max_connections,
            ignored_products: self.ignored_products.clone(),
        }
    }

    /// Replace all options, keeping the pair.
    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.offset_mins = options.offset_mins;
        self.only_direct = options.only_direct;
        self.max_connections = options.max_connections;
        self.ignored_products = options.ignored_products;
        self
    }

    /// Set the query offset in minutes.
    pub fn with_offset_mins(mut self, mins: i64) -> Self {
        self.offset_mins = mins;
        self
    }

    /// Only consider direct connections.
    pub fn with_only_direct(mut self, only_direct: bool) -> Self {
        self.only_direct = only_direct;
        self
    }

    /// Set the connection cap.
    pub fn with_max_connections(mut self, n: usize) -> Self {
        self.max_connections = n;
        self
    }

    /// Set the ignored products.
    pub fn with_ignored_products(mut self, products: impl IntoIterator<Item = Product>) -> Self {
        self.ignored_products = products.into_iter().collect();
        self
    }

    /// Returns the offset as a Duration.
    pub fn offset(&self) -> Duration {
        Duration::minutes(self.offset_mins)
    }

    /// Reference time for a poll happening at `now`.
    ///
    /// The offset is applied as-is whatever its sign.
    pub fn reference_time(&self, now: NaiveDateTime) -> NaiveDateTime {
        now + self.offset()
    }

    /// Display name of the monitored pair.
    pub fn name(&self) -> String {
        format!("{} to {}", self.origin, self.destination)
    }

    /// Stable identifier of the monitored pair.
    pub fn unique_id(&self) -> String {
        format!("{}-{}", self.origin, self.destination)
    }

    /// Build the source query for a given reference time.
    pub fn source_query(&self, reference_time: NaiveDateTime) -> SourceQuery {
        SourceQuery {
            origin: self.origin.clone(),
            destination: self.destination.clone(),
            reference_time,
            only_direct: self.only_direct,
        }
    }
}
