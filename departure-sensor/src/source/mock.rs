//! Mock schedule source for testing without network access.
//!
//! Serves raw records from a JSON file or from memory as if they were live
//! responses. Can be switched into a failing mode or given artificial
//! latency to exercise outage and timeout handling.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::RwLock;

use super::ConnectionSource;
use super::error::SourceError;
use super::http::decode_body;
use super::types::{RawConnection, SourceQuery, decode_records};

/// Mock source that serves a fixed list of raw records.
///
/// Clones share state, so a test can keep a clone to flip failure mode
/// while a monitor owns another.
#[derive(Debug, Clone, Default)]
pub struct MockSource {
    records: Arc<RwLock<Vec<RawConnection>>>,
    failing: Arc<AtomicBool>,
    latency: Arc<RwLock<Option<Duration>>>,
    fetches: Arc<AtomicUsize>,
    active: Arc<AtomicUsize>,
}

/// Counts a fetch as active until it completes or is dropped.
struct ActiveFetch(Arc<AtomicUsize>);

impl ActiveFetch {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for ActiveFetch {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockSource {
    /// Create a mock serving the given records.
    pub fn new(records: Vec<RawConnection>) -> Self {
        Self {
            records: Arc::new(RwLock::new(records)),
            ..Self::default()
        }
    }

    /// Load records from a JSON file holding an array of raw records.
    ///
    /// Each element may use either record shape; elements that fit neither
    /// are dropped.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            SourceError::NotConfigured(format!("failed to read mock data {path:?}: {e}"))
        })?;

        let values: Vec<serde_json::Value> = decode_body(&json)?;
        Ok(Self::new(decode_records(values)))
    }

    /// Replace the served records.
    pub async fn set_records(&self, records: Vec<RawConnection>) {
        *self.records.write().await = records;
    }

    /// Make subsequent fetches fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Delay every subsequent fetch by `latency`.
    pub async fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.write().await = latency;
    }

    /// Number of fetches started so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Number of fetches currently running.
    pub fn active_fetches(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

impl ConnectionSource for MockSource {
    async fn fetch(&self, _query: &SourceQuery) -> Result<Vec<RawConnection>, SourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let _active = ActiveFetch::enter(&self.active);

        let latency = *self.latency.read().await;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(SourceError::Unavailable(
                "mock source is in failing mode".to_string(),
            ));
        }

        Ok(self.records.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::types::TimetableRecord;
    use std::io::Write;

    fn query() -> SourceQuery {
        SourceQuery {
            origin: "A".into(),
            destination: "B".into(),
            reference_time: chrono::NaiveDate::from_ymd_opt(2024, 3, 15)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            only_direct: false,
        }
    }

    fn record(departure: &str) -> RawConnection {
        RawConnection::Timetable(TimetableRecord {
            departure: Some(departure.to_string()),
            ..TimetableRecord::default()
        })
    }

    #[tokio::test]
    async fn serves_records() {
        let source = MockSource::new(vec![record("10:05"), record("10:35")]);
        let records = source.fetch(&query()).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(source.fetch_count(), 1);
        assert_eq!(source.active_fetches(), 0);
    }

    #[tokio::test]
    async fn empty_is_not_an_error() {
        let source = MockSource::default();
        assert!(source.fetch(&query()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failing_mode() {
        let source = MockSource::new(vec![record("10:05")]);
        let handle = source.clone();

        handle.set_failing(true);
        assert!(matches!(
            source.fetch(&query()).await,
            Err(SourceError::Unavailable(_))
        ));

        handle.set_failing(false);
        assert_eq!(source.fetch(&query()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn set_records_replaces() {
        let source = MockSource::new(vec![record("10:05")]);
        source.set_records(vec![]).await;
        assert!(source.fetch(&query()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn load_mixed_shapes_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"departure": "10:05", "products": ["RE"], "delay": 2}},
                {{"departure": "10:35", "products": ["ICE"], "details": "x",
                  "delay": {{"delay_departure": 1, "delay_arrival": 0}}}}
            ]"#
        )
        .unwrap();

        let source = MockSource::from_file(file.path()).unwrap();
        let records = source.fetch(&query()).await.unwrap();

        assert!(matches!(records[0], RawConnection::Timetable(_)));
        assert!(matches!(records[1], RawConnection::Web(_)));
    }

    #[tokio::test]
    async fn file_with_one_bad_entry_keeps_the_rest() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"departure": "10:00"}}, {{"departure": "10:30", "transfers": "1"}}]"#
        )
        .unwrap();

        let source = MockSource::from_file(file.path()).unwrap();
        let records = source.fetch(&query()).await.unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn debug_format_is_available() {
        let source = MockSource::new(vec![]);
        assert!(format!("{source:?}").contains("MockSource"));
    }

    #[test]
    fn missing_file_is_not_configured() {
        let err = MockSource::from_file("/nonexistent/mock.json")
            .err()
            .unwrap();
        assert!(matches!(err, SourceError::NotConfigured(_)));
    }
}
