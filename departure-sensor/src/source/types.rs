//! Raw schedule record DTOs.
//!
//! These types map directly to what the backends return. They use `Option`
//! liberally because backends omit fields rather than sending nulls, and
//! the two backends disagree on field shapes.

use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::Connection;

/// A connection record as returned by the web connection search.
///
/// Delays are nested in a `delay` object and each record carries a
/// `details` payload (usually a link to the booking page).
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct WebRecord {
    /// Scheduled departure ("HH:MM").
    pub departure: Option<String>,

    /// Scheduled arrival ("HH:MM").
    pub arrival: Option<String>,

    /// Travel time (e.g. "1:05").
    pub time: Option<String>,

    /// Number of changes.
    pub transfers: Option<u32>,

    /// Product codes (e.g. `["ICE"]`, `["S", "RE"]`).
    #[serde(default)]
    pub products: Vec<String>,

    /// Cheapest fare, when the search reported one.
    pub price: Option<f64>,

    /// Whether the connection runs on time.
    pub ontime: Option<bool>,

    /// Whether the connection is canceled.
    pub canceled: Option<bool>,

    /// Nested delay information.
    pub delay: Option<WebDelay>,

    /// Opaque detail payload. Never exposed.
    pub details: Option<serde_json::Value>,
}

/// Delay sub-structure of a [`WebRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct WebDelay {
    /// Departure delay in minutes.
    #[serde(default)]
    pub delay_departure: i64,

    /// Arrival delay in minutes.
    #[serde(default)]
    pub delay_arrival: i64,
}

/// A connection record in canonical, delay-flattened form.
///
/// The timetable API returns this shape directly, and it is what a
/// normalized [`Connection`] converts back into.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TimetableRecord {
    /// Scheduled departure ("HH:MM").
    pub departure: Option<String>,

    /// Scheduled arrival ("HH:MM").
    pub arrival: Option<String>,

    /// Travel time (e.g. "1:05").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,

    /// Number of changes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfers: Option<u32>,

    /// Product codes.
    #[serde(default)]
    pub products: Vec<String>,

    /// Departure delay in minutes.
    #[serde(default)]
    pub delay: i64,

    /// Arrival delay in minutes.
    #[serde(default)]
    pub delay_arrival: i64,

    /// Whether the connection runs on time.
    #[serde(default)]
    pub ontime: bool,

    /// Whether the connection is canceled.
    #[serde(default)]
    pub canceled: bool,
}

/// A raw record from any backend.
///
/// Deserializes from either shape; records with an integer `delay` are
/// timetable records, records with a `delay` object are web records.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawConnection {
    Timetable(TimetableRecord),
    Web(WebRecord),
}

impl From<WebRecord> for RawConnection {
    fn from(record: WebRecord) -> Self {
        RawConnection::Web(record)
    }
}

impl From<TimetableRecord> for RawConnection {
    fn from(record: TimetableRecord) -> Self {
        RawConnection::Timetable(record)
    }
}

impl From<&Connection> for TimetableRecord {
    fn from(conn: &Connection) -> Self {
        Self {
            departure: Some(conn.departure_scheduled.to_string()),
            arrival: conn.arrival_scheduled.map(|t| t.to_string()),
            time: conn.duration.clone(),
            transfers: conn.transfers,
            products: conn.products.iter().map(|p| p.to_string()).collect(),
            delay: conn.delay_departure_minutes,
            delay_arrival: conn.delay_arrival_minutes,
            ontime: conn.on_time,
            canceled: conn.canceled,
        }
    }
}

impl From<&Connection> for RawConnection {
    fn from(conn: &Connection) -> Self {
        RawConnection::Timetable(conn.into())
    }
}

/// Decode records one by one, dropping any that do not fit `T`.
///
/// A single mistyped field costs only its own record.
pub fn decode_records<T: DeserializeOwned>(values: Vec<serde_json::Value>) -> Vec<T> {
    values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(index, error = %e, "dropping malformed record");
                None
            }
        })
        .collect()
}

/// Response body of the web connection search.
///
/// Records stay undecoded until [`records`](Self::records).
#[derive(Debug, Clone, Deserialize)]
pub struct WebConnectionsResponse {
    #[serde(default)]
    pub connections: Vec<serde_json::Value>,
}

impl WebConnectionsResponse {
    pub fn records(self) -> Vec<WebRecord> {
        decode_records(self.connections)
    }
}

/// Response body of the timetable API connection endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TimetableConnectionsResponse {
    #[serde(default)]
    pub connections: Vec<serde_json::Value>,
}

impl TimetableConnectionsResponse {
    pub fn records(self) -> Vec<TimetableRecord> {
        decode_records(self.connections)
    }
}

/// What a source is asked for on each poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceQuery {
    /// Origin station name.
    pub origin: String,

    /// Destination station name.
    pub destination: String,

    /// Local time to search from (now plus the configured offset).
    pub reference_time: NaiveDateTime,

    /// Only return connections without changes.
    pub only_direct: bool,
}

impl SourceQuery {
    /// Date query parameter ("YYYY-MM-DD").
    pub fn date_param(&self) -> String {
        self.reference_time.format("%Y-%m-%d").to_string()
    }

    /// Time query parameter ("HH:MM").
    pub fn time_param(&self) -> String {
        self.reference_time.format("%H:%M").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ClockTime, Product};

    #[test]
    fn deserialize_web_record() {
        let json = r#"{
            "details": "https://reiseauskunft.example/details?id=1",
            "departure": "10:00",
            "arrival": "11:05",
            "transfers": 0,
            "time": "1:05",
            "products": ["ICE"],
            "price": 29.9,
            "ontime": false,
            "delay": {"delay_departure": 5, "delay_arrival": 3},
            "canceled": false
        }"#;

        let raw: RawConnection = serde_json::from_str(json).unwrap();
        let record = match raw {
            RawConnection::Web(record) => record,
            other => panic!("expected web record, got {other:?}"),
        };

        assert_eq!(record.departure.as_deref(), Some("10:00"));
        assert_eq!(record.products, vec!["ICE".to_string()]);
        assert_eq!(
            record.delay,
            Some(WebDelay {
                delay_departure: 5,
                delay_arrival: 3
            })
        );
        assert!(record.details.is_some());
    }

    #[test]
    fn mistyped_record_does_not_sink_the_response() {
        let json = r#"{"connections": [
            {"departure": "10:00"},
            {"departure": "10:30", "transfers": "1"},
            {"departure": 1045},
            {"departure": "11:00", "transfers": 1}
        ]}"#;

        let response: WebConnectionsResponse = serde_json::from_str(json).unwrap();
        let departures: Vec<Option<String>> =
            response.records().into_iter().map(|r| r.departure).collect();
        assert_eq!(
            departures,
            vec![Some("10:00".to_string()), Some("11:00".to_string())]
        );

        let response: TimetableConnectionsResponse = serde_json::from_str(
            r#"{"connections": [{"departure": "10:00", "delay": "late"}, {"departure": "10:15"}]}"#,
        )
        .unwrap();
        let records = response.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].departure.as_deref(), Some("10:15"));
    }

    #[test]
    fn deserialize_web_delay_partial() {
        let delay: WebDelay = serde_json::from_str(r#"{"delay_departure": 4}"#).unwrap();
        assert_eq!(delay.delay_departure, 4);
        assert_eq!(delay.delay_arrival, 0);
    }

    #[test]
    fn deserialize_timetable_record() {
        let json = r#"{
            "departure": "10:00",
            "arrival": "11:05",
            "products": ["RE"],
            "delay": 2
        }"#;

        let raw: RawConnection = serde_json::from_str(json).unwrap();
        let record = match raw {
            RawConnection::Timetable(record) => record,
            other => panic!("expected timetable record, got {other:?}"),
        };

        assert_eq!(record.delay, 2);
        assert_eq!(record.delay_arrival, 0);
        assert!(!record.ontime);
        assert!(!record.canceled);
    }

    #[test]
    fn deserialize_null_ontime_as_web_record() {
        let json = r#"{"departure": "10:00", "ontime": null}"#;
        let raw: RawConnection = serde_json::from_str(json).unwrap();
        assert!(matches!(raw, RawConnection::Web(_)));
    }

    #[test]
    fn connection_to_timetable_record() {
        let mut conn = Connection::new(ClockTime::parse_hhmm("08:15").unwrap());
        conn.arrival_scheduled = Some(ClockTime::parse_hhmm("09:00").unwrap());
        conn.delay_departure_minutes = 1;
        conn.products = vec![Product::parse("S").unwrap()];

        let record = TimetableRecord::from(&conn);
        assert_eq!(record.departure.as_deref(), Some("08:15"));
        assert_eq!(record.arrival.as_deref(), Some("09:00"));
        assert_eq!(record.delay, 1);
        assert_eq!(record.products, vec!["S".to_string()]);
    }

    #[test]
    fn query_params() {
        let query = SourceQuery {
            origin: "Hamburg Hbf".into(),
            destination: "Berlin Hbf".into(),
            reference_time: chrono::NaiveDate::from_ymd_opt(2024, 3, 5)
                .unwrap()
                .and_hms_opt(7, 4, 30)
                .unwrap(),
            only_direct: false,
        };

        assert_eq!(query.date_param(), "2024-03-05");
        assert_eq!(query.time_param(), "07:04");
    }
}
