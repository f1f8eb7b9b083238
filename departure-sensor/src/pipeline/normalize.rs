//! Conversion from raw source records to canonical connections.
//!
//! Handles both record shapes. Web records have their `details` payload
//! dropped and their nested delay object flattened; timetable records are
//! already flat. A record is rejected when its departure time is missing or
//! unparseable, or when a delay exceeds one day in either direction.

use tracing::{debug, warn};

use crate::domain::{ClockTime, Connection, Product};
use crate::source::{RawConnection, TimetableRecord, WebRecord};

/// Largest delay, in minutes and either sign, accepted from a source.
pub const MAX_DELAY_MINUTES: i64 = 24 * 60;

/// Error during record normalization.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    /// The record's departure time is missing or unparseable, or a delay is
    /// out of range.
    #[error("malformed record: {0}")]
    MalformedRecord(String),
}

/// Normalize a single raw record.
pub fn normalize(raw: RawConnection) -> Result<Connection, NormalizeError> {
    match raw {
        RawConnection::Web(record) => normalize_web(record),
        RawConnection::Timetable(record) => normalize_timetable(record),
    }
}

/// Normalize a batch, dropping malformed records.
///
/// Output order matches input order.
pub fn normalize_all(raw: Vec<RawConnection>) -> Vec<Connection> {
    let total = raw.len();
    let connections: Vec<Connection> = raw
        .into_iter()
        .enumerate()
        .filter_map(|(idx, record)| match normalize(record) {
            Ok(conn) => Some(conn),
            Err(e) => {
                warn!(index = idx, error = %e, "dropping record");
                None
            }
        })
        .collect();

    debug!(total, kept = connections.len(), "normalized records");
    connections
}

fn normalize_web(record: WebRecord) -> Result<Connection, NormalizeError> {
    // `details` and `price` are dropped.
    let delay = record.delay.unwrap_or_default();

    Ok(Connection {
        departure_scheduled: parse_departure(record.departure.as_deref())?,
        arrival_scheduled: parse_arrival(record.arrival.as_deref()),
        delay_departure_minutes: check_delay("departure", delay.delay_departure)?,
        delay_arrival_minutes: check_delay("arrival", delay.delay_arrival)?,
        on_time: record.ontime.unwrap_or(false),
        canceled: record.canceled.unwrap_or(false),
        products: parse_products(&record.products),
        duration: record.time,
        transfers: record.transfers,
    })
}

fn normalize_timetable(record: TimetableRecord) -> Result<Connection, NormalizeError> {
    Ok(Connection {
        departure_scheduled: parse_departure(record.departure.as_deref())?,
        arrival_scheduled: parse_arrival(record.arrival.as_deref()),
        delay_departure_minutes: check_delay("departure", record.delay)?,
        delay_arrival_minutes: check_delay("arrival", record.delay_arrival)?,
        on_time: record.ontime,
        canceled: record.canceled,
        products: parse_products(&record.products),
        duration: record.time,
        transfers: record.transfers,
    })
}

fn parse_departure(departure: Option<&str>) -> Result<ClockTime, NormalizeError> {
    let departure = departure
        .ok_or_else(|| NormalizeError::MalformedRecord("missing departure".to_string()))?;

    ClockTime::parse_hhmm(departure)
        .map_err(|e| NormalizeError::MalformedRecord(format!("departure {departure:?}: {e}")))
}

fn check_delay(which: &str, minutes: i64) -> Result<i64, NormalizeError> {
    if minutes.unsigned_abs() > MAX_DELAY_MINUTES.unsigned_abs() {
        return Err(NormalizeError::MalformedRecord(format!(
            "{which} delay {minutes} out of range"
        )));
    }
    Ok(minutes)
}

fn parse_arrival(arrival: Option<&str>) -> Option<ClockTime> {
    let arrival = arrival?;
    match ClockTime::parse_hhmm(arrival) {
        Ok(time) => Some(time),
        Err(e) => {
            debug!(arrival, error = %e, "ignoring unparseable arrival");
            None
        }
    }
}

/// Parse product codes, skipping invalid ones and duplicates.
fn parse_products(codes: &[String]) -> Vec<Product> {
    let mut products: Vec<Product> = Vec::with_capacity(codes.len());
    for code in codes {
        match Product::parse_normalized(code) {
            Ok(product) if !products.contains(&product) => products.push(product),
            Ok(_) => {}
            Err(e) => debug!(code = %code, error = %e, "ignoring product code"),
        }
    }
    products
}
