//! Primary value and attributes exposed to the host.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::domain::{Connection, Product};

/// Primary value when no connection survived filtering.
pub const UNKNOWN: &str = "Unknown";

/// Attribution string shipped with every attribute set.
pub const ATTRIBUTION: &str = "Data provided by Deutsche Bahn API";

/// One exposed departure, delay-flattened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Departure {
    /// Scheduled departure ("HH:MM").
    pub departure: String,

    /// Scheduled arrival ("HH:MM").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrival: Option<String>,

    /// Departure delay in minutes.
    pub delay: i64,

    /// Arrival delay in minutes.
    pub delay_arrival: i64,

    pub ontime: bool,
    pub canceled: bool,
    pub products: Vec<Product>,

    /// Travel time as reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfers: Option<u32>,

    /// Delay-adjusted departure ("HH:MM").
    pub departure_current: String,

    /// Delay-adjusted arrival ("HH:MM"), when the arrival is known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrival_current: Option<String>,
}

impl From<&Connection> for Departure {
    fn from(conn: &Connection) -> Self {
        Self {
            departure: conn.departure_scheduled.to_string(),
            arrival: conn.arrival_scheduled.map(|t| t.to_string()),
            delay: conn.delay_departure_minutes,
            delay_arrival: conn.delay_arrival_minutes,
            ontime: conn.on_time,
            canceled: conn.canceled,
            products: conn.products.clone(),
            time: conn.duration.clone(),
            transfers: conn.transfers,
            departure_current: conn.departure_current().to_string(),
            arrival_current: conn.arrival_current().map(|t| t.to_string()),
        }
    }
}

/// Structured metadata published alongside the primary value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attributes {
    /// Filtered connections in schedule order.
    pub departures: Vec<Departure>,

    /// When these attributes were derived.
    pub last_update: DateTime<Local>,

    /// Scheduled departure of the second connection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,

    /// Scheduled departure of the third connection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_on: Option<String>,

    pub attribution: String,
}

/// Format the primary value for a connection.
///
/// ```
/// use departure_sensor::domain::{ClockTime, Connection};
/// use departure_sensor::pipeline::primary_value;
///
/// let mut conn = Connection::new(ClockTime::parse_hhmm("10:00").unwrap());
/// assert_eq!(primary_value(&conn), "10:00");
///
/// conn.delay_departure_minutes = 5;
/// assert_eq!(primary_value(&conn), "10:00 + 5");
/// ```
pub fn primary_value(conn: &Connection) -> String {
    if conn.delay_departure_minutes != 0 {
        format!(
            "{} + {}",
            conn.departure_scheduled, conn.delay_departure_minutes
        )
    } else {
        conn.departure_scheduled.to_string()
    }
}

/// Derive the primary value and attributes from filtered connections.
pub fn derive(connections: &[Connection], now: DateTime<Local>) -> (String, Attributes) {
    let value = connections
        .first()
        .map(primary_value)
        .unwrap_or_else(|| UNKNOWN.to_string());

    let attributes = Attributes {
        departures: connections.iter().map(Departure::from).collect(),
        last_update: now,
        next: connections
            .get(1)
            .map(|c| c.departure_scheduled.to_string()),
        next_on: connections
            .get(2)
            .map(|c| c.departure_scheduled.to_string()),
        attribution: ATTRIBUTION.to_string(),
    };

    (value, attributes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ClockTime;

    fn conn(departure: &str) -> Connection {
        Connection::new(ClockTime::parse_hhmm(departure).unwrap())
    }

    #[test]
    fn empty_is_unknown() {
        let now = Local::now();
        let (value, attributes) = derive(&[], now);

        assert_eq!(value, "Unknown");
        assert!(attributes.departures.is_empty());
        assert_eq!(attributes.last_update, now);
        assert!(attributes.next.is_none());
        assert!(attributes.next_on.is_none());
    }

    #[test]
    fn delayed_first_connection() {
        let delayed = Connection {
            delay_departure_minutes: 5,
            ..conn("10:00")
        };
        let (value, attributes) = derive(&[delayed], Local::now());

        assert_eq!(value, "10:00 + 5");
        assert_eq!(attributes.departures[0].departure_current, "10:05");
    }

    #[test]
    fn negative_delay_keeps_suffix_shape() {
        let early = Connection {
            delay_departure_minutes: -2,
            ..conn("10:00")
        };
        assert_eq!(primary_value(&early), "10:00 + -2");
    }

    #[test]
    fn current_times_wrap_at_midnight() {
        let late = Connection {
            arrival_scheduled: Some(ClockTime::parse_hhmm("23:58").unwrap()),
            delay_departure_minutes: 15,
            delay_arrival_minutes: 7,
            ..conn("23:50")
        };
        let departure = Departure::from(&late);

        assert_eq!(departure.departure_current, "00:05");
        assert_eq!(departure.arrival_current.as_deref(), Some("00:05"));
    }

    #[test]
    fn missing_arrival_omits_arrival_current() {
        let departure = Departure::from(&conn("10:00"));
        assert!(departure.arrival.is_none());
        assert!(departure.arrival_current.is_none());

        let json = serde_json::to_value(&departure).unwrap();
        assert!(json.get("arrival_current").is_none());
        assert_eq!(json["departure_current"], "10:00");
    }

    #[test]
    fn next_and_next_on() {
        let (value, attributes) = derive(
            &[conn("10:00"), conn("10:30"), conn("11:00")],
            Local::now(),
        );

        assert_eq!(value, "10:00");
        assert_eq!(attributes.departures.len(), 3);
        assert_eq!(attributes.next.as_deref(), Some("10:30"));
        assert_eq!(attributes.next_on.as_deref(), Some("11:00"));
    }

    #[test]
    fn attributes_serialize_flat() {
        let conn = Connection {
            arrival_scheduled: Some(ClockTime::parse_hhmm("11:05").unwrap()),
            delay_departure_minutes: 3,
            products: vec![Product::parse("ICE").unwrap()],
            duration: Some("1:05".into()),
            transfers: Some(0),
            ..conn("10:00")
        };
        let (_, attributes) = derive(&[conn], Local::now());
        let json = serde_json::to_value(&attributes).unwrap();

        let departure = &json["departures"][0];
        assert_eq!(departure["departure"], "10:00");
        assert_eq!(departure["arrival"], "11:05");
        assert_eq!(departure["delay"], 3);
        assert_eq!(departure["delay_arrival"], 0);
        assert_eq!(departure["ontime"], false);
        assert_eq!(departure["products"][0], "ICE");
        assert_eq!(departure["time"], "1:05");
        assert_eq!(departure["transfers"], 0);
        assert_eq!(departure["departure_current"], "10:03");
        assert_eq!(departure["arrival_current"], "11:05");
        assert!(departure.get("details").is_none());
        assert_eq!(json["attribution"], ATTRIBUTION);
        assert!(json["last_update"].is_string());
    }
}
