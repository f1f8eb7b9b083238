//! Connection processing pipeline.
//!
//! The synchronous part of a poll: raw records in, primary value and
//! attributes out.
//!
//! 1. [`normalize_all`] maps both record shapes onto [`Connection`](crate::domain::Connection)
//! 2. [`filter_connections`] drops departed and ignored connections and caps the count
//! 3. [`derive`] builds the primary value and attributes
//!
//! [`run`] chains the three for one query.

mod derive;
mod filter;
mod normalize;
mod query;

use chrono::{DateTime, Local, NaiveDateTime};
use tracing::{debug, warn};

use crate::source::RawConnection;

pub use derive::{ATTRIBUTION, Attributes, Departure, UNKNOWN, derive, primary_value};
pub use filter::{FilterOutcome, filter_connections};
pub use normalize::{MAX_DELAY_MINUTES, NormalizeError, normalize, normalize_all};
pub use query::{DEFAULT_MAX_CONNECTIONS, QueryConfig, QueryOptions};

/// Result of running the pipeline over one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Primary display value.
    pub value: String,

    /// Attributes published with the value.
    pub attributes: Attributes,

    /// Number of raw records received.
    pub received: usize,

    /// Number of connections exposed.
    pub kept: usize,

    /// Fewer connections than requested survived.
    pub shortfall: bool,
}

/// Normalize, filter and derive one batch of raw records.
///
/// `reference_time` is the query's reference (now plus offset); `now` is
/// the wall-clock time stamped on the attributes.
pub fn run(
    raw: Vec<RawConnection>,
    config: &QueryConfig,
    reference_time: NaiveDateTime,
    now: DateTime<Local>,
) -> Evaluation {
    let received = raw.len();
    let connections = normalize_all(raw);
    let outcome = filter_connections(
        connections,
        reference_time,
        &config.ignored_products,
        config.max_connections,
    );

    debug!(
        pair = %config.unique_id(),
        received,
        kept = outcome.kept.len(),
        departed = outcome.dropped_departed,
        ignored = outcome.dropped_ignored,
        unrepresentable = outcome.dropped_unrepresentable,
        "filtered connections"
    );

    if outcome.kept.is_empty() && config.max_connections > 0 {
        warn!(
            pair = %config.unique_id(),
            %reference_time,
            "no upcoming connections"
        );
    } else if outcome.shortfall {
        warn!(
            pair = %config.unique_id(),
            kept = outcome.kept.len(),
            requested = config.max_connections,
            "fewer connections than requested"
        );
    }

    let (value, attributes) = derive(&outcome.kept, now);

    Evaluation {
        value,
        attributes,
        received,
        kept: outcome.kept.len(),
        shortfall: outcome.shortfall,
    }
}
