//! Departure cutoff, product exclusion and count capping.

use std::collections::HashSet;

use chrono::{NaiveDateTime, TimeDelta};
use tracing::trace;

use crate::domain::{Connection, Product, SequenceResolver};

/// Result of filtering one batch of connections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOutcome {
    /// Surviving connections, in input order.
    pub kept: Vec<Connection>,

    /// Connections dropped because they had already departed.
    pub dropped_departed: usize,

    /// Connections dropped for using an ignored product.
    pub dropped_ignored: usize,

    /// Connections whose delay-adjusted departure cannot be represented.
    pub dropped_unrepresentable: usize,

    /// Fewer than the requested number of connections survived.
    pub shortfall: bool,
}

/// Filter connections against a reference time.
///
/// Scans in input order and stops as soon as `max_connections` are kept, so
/// records past that point are neither counted nor inspected. Each record's
/// scheduled departure is dated relative to `reference_time` (see
/// [`SequenceResolver`]) and shifted by its departure delay; a record whose
/// delay-adjusted departure is before the reference time is dropped. A
/// record using any ignored product is dropped.
pub fn filter_connections(
    connections: Vec<Connection>,
    reference_time: NaiveDateTime,
    ignored_products: &HashSet<Product>,
    max_connections: usize,
) -> FilterOutcome {
    let mut outcome = FilterOutcome::default();
    if max_connections == 0 {
        return outcome;
    }

    let mut resolver = SequenceResolver::new(reference_time);

    for conn in connections {
        let scheduled = resolver.resolve(conn.departure_scheduled);
        let Some(departs) = TimeDelta::try_minutes(conn.delay_departure_minutes)
            .and_then(|delay| scheduled.checked_add_signed(delay))
        else {
            trace!(
                departure = %conn.departure_scheduled,
                delay = conn.delay_departure_minutes,
                "delay out of range"
            );
            outcome.dropped_unrepresentable += 1;
            continue;
        };

        if departs < reference_time {
            trace!(departure = %conn.departure_scheduled, %departs, "already departed");
            outcome.dropped_departed += 1;
            continue;
        }

        if conn.uses_any(ignored_products) {
            trace!(departure = %conn.departure_scheduled, "uses ignored product");
            outcome.dropped_ignored += 1;
            continue;
        }

        outcome.kept.push(conn);
        if outcome.kept.len() == max_connections {
            break;
        }
    }

    outcome.shortfall = outcome.kept.len() < max_connections;
    outcome
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::domain::ClockTime;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn arb_connection() -> impl Strategy<Value = Connection> {
        (
            0u32..24,
            0u32..60,
            -60i64..60,
            proptest::collection::vec(prop_oneof![Just("ICE"), Just("RE"), Just("S")], 0..3),
        )
            .prop_map(|(h, m, delay, codes)| {
                let mut products: Vec<Product> = Vec::new();
                for code in codes {
                    let product = Product::parse(code).unwrap();
                    if !products.contains(&product) {
                        products.push(product);
                    }
                }
                Connection {
                    delay_departure_minutes: delay,
                    products,
                    ..Connection::new(ClockTime::from_hm(h, m).unwrap())
                }
            })
    }

    fn arb_ignored() -> impl Strategy<Value = HashSet<Product>> {
        proptest::collection::hash_set(
            prop_oneof![Just("ICE"), Just("RE"), Just("S")].prop_map(|c| Product::parse(c).unwrap()),
            0..3,
        )
    }

    proptest! {
        /// Never returns more than the cap
        #[test]
        fn never_exceeds_cap(
            input in proptest::collection::vec(arb_connection(), 0..20),
            ignored in arb_ignored(),
            max in 0usize..6,
            h in 0u32..24,
        ) {
            let reference = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap().and_hms_opt(h, 0, 0).unwrap();
            let outcome = filter_connections(input, reference, &ignored, max);
            prop_assert!(outcome.kept.len() <= max);
        }

        /// Survivors appear in input order
        #[test]
        fn preserves_input_order(
            input in proptest::collection::vec(arb_connection(), 0..20),
            ignored in arb_ignored(),
            max in 0usize..6,
            h in 0u32..24,
        ) {
            let reference = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap().and_hms_opt(h, 0, 0).unwrap();
            let outcome = filter_connections(input.clone(), reference, &ignored, max);

            // Each kept element must be found in the input after the previous one.
            let mut pos = 0;
            for kept in &outcome.kept {
                let found = input[pos..].iter().position(|c| c == kept);
                prop_assert!(found.is_some());
                pos += found.unwrap() + 1;
            }
        }

        /// Survivors never use an ignored product
        #[test]
        fn survivors_avoid_ignored(
            input in proptest::collection::vec(arb_connection(), 0..20),
            ignored in arb_ignored(),
        ) {
            let reference = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap().and_hms_opt(12, 0, 0).unwrap();
            let outcome = filter_connections(input, reference, &ignored, 20);
            prop_assert!(outcome.kept.iter().all(|c| !c.uses_any(&ignored)));
        }
    }
}
