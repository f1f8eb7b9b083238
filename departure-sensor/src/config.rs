//! Host configuration.
//!
//! Loaded once at startup from a JSON file. Credentials for the timetable
//! API never live in the file; they come from `DB_CLIENT_ID` and
//! `DB_CLIENT_SECRET`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::monitor::MonitorOptions;
use crate::pipeline::QueryConfig;
use crate::source::{
    MockSource, Source, SourceError, TimetableClient, TimetableConfig, WebClient, WebClientConfig,
};

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "DEPARTURE_SENSOR_CONFIG";

/// Config file used when [`CONFIG_PATH_ENV`] is unset.
pub const DEFAULT_CONFIG_PATH: &str = "departure-sensor.json";

pub const CLIENT_ID_ENV: &str = "DB_CLIENT_ID";
pub const CLIENT_SECRET_ENV: &str = "DB_CLIENT_SECRET";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Which schedule backend to poll.
///
/// The HTTP backends have no built-in endpoint; see [`crate::source`] for
/// the JSON each one expects at `base_url`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendConfig {
    /// Web connection search; no credentials needed.
    Web { base_url: String },
    /// Authenticated timetable API.
    Timetable { base_url: String },
    /// Records served from a local JSON file.
    Mock { path: PathBuf },
}

/// Timetable API credentials.
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl Credentials {
    /// Read credentials from the environment, if both variables are set.
    pub fn from_env() -> Option<Self> {
        let client_id = std::env::var(CLIENT_ID_ENV).ok()?;
        let client_secret = std::env::var(CLIENT_SECRET_ENV).ok()?;
        Some(Self {
            client_id,
            client_secret,
        })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Top-level configuration of the reference host.
#[derive(Debug, Clone, Deserialize)]
pub struct HostConfig {
    /// Address the HTTP surface listens on.
    #[serde(default = "HostConfig::default_bind")]
    pub bind: String,

    pub backend: BackendConfig,

    /// Seconds between polls of each pair.
    #[serde(default = "HostConfig::default_scan_interval_secs")]
    pub scan_interval_secs: u64,

    /// Seconds before a poll is given up.
    #[serde(default = "HostConfig::default_tick_timeout_secs")]
    pub tick_timeout_secs: u64,

    /// Monitored origin/destination pairs.
    pub sensors: Vec<QueryConfig>,
}

impl HostConfig {
    fn default_bind() -> String {
        "127.0.0.1:3000".to_string()
    }
    fn default_scan_interval_secs() -> u64 {
        120
    }
    fn default_tick_timeout_secs() -> u64 {
        30
    }

    /// Load and validate a config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Load the file named by [`CONFIG_PATH_ENV`], or the default path.
    pub fn load_from_env() -> Result<Self, ConfigError> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load(path)
    }

    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sensors.is_empty() {
            return Err(ConfigError::Invalid("no sensors configured".into()));
        }
        if self.scan_interval_secs == 0 {
            return Err(ConfigError::Invalid("scan_interval_secs must be positive".into()));
        }
        if self.tick_timeout_secs == 0 {
            return Err(ConfigError::Invalid("tick_timeout_secs must be positive".into()));
        }

        let mut seen = HashSet::new();
        for sensor in &self.sensors {
            if sensor.origin.trim().is_empty() || sensor.destination.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "origin and destination must not be empty".into(),
                ));
            }
            if !seen.insert(sensor.unique_id()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate sensor {}",
                    sensor.unique_id()
                )));
            }
        }
        Ok(())
    }

    pub fn monitor_options(&self) -> MonitorOptions {
        MonitorOptions::default()
            .with_scan_interval(Duration::from_secs(self.scan_interval_secs))
            .with_tick_timeout(Duration::from_secs(self.tick_timeout_secs))
    }

    /// Build the configured backend.
    ///
    /// The timetable backend needs credentials; without them this returns
    /// [`SourceError::NotConfigured`].
    pub fn build_source(&self, credentials: Option<Credentials>) -> Result<Source, SourceError> {
        match &self.backend {
            BackendConfig::Web { base_url } => {
                let config = WebClientConfig::new(base_url).with_timeout(self.tick_timeout_secs);
                Ok(Source::Web(WebClient::new(config)?))
            }
            BackendConfig::Timetable { base_url } => {
                let credentials = credentials.ok_or_else(|| {
                    SourceError::NotConfigured(format!(
                        "{CLIENT_ID_ENV} and {CLIENT_SECRET_ENV} must be set"
                    ))
                })?;
                let config =
                    TimetableConfig::new(base_url, credentials.client_id, credentials.client_secret)
                        .with_timeout(self.tick_timeout_secs);
                Ok(Source::Timetable(TimetableClient::new(config)?))
            }
            BackendConfig::Mock { path } => Ok(Source::Mock(MockSource::from_file(path)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = HostConfig::from_json(
            r#"{
                "backend": {"type": "web", "base_url": "http://localhost:8080"},
                "sensors": [{"origin": "Hamburg Hbf", "destination": "Berlin Hbf"}]
            }"#,
        )
        .unwrap();

        assert_eq!(config.bind, "127.0.0.1:3000");
        assert_eq!(
            config.backend,
            BackendConfig::Web {
                base_url: "http://localhost:8080".into()
            }
        );
        assert_eq!(config.scan_interval_secs, 120);
        assert_eq!(config.tick_timeout_secs, 30);
        assert_eq!(config.sensors[0].max_connections, 2);

        let options = config.monitor_options();
        assert_eq!(options.scan_interval, Duration::from_secs(120));
        assert_eq!(options.tick_timeout, Duration::from_secs(30));
    }

    #[test]
    fn backend_variants() {
        let config = HostConfig::from_json(
            r#"{
                "backend": {"type": "timetable", "base_url": "http://localhost:8080"},
                "sensors": [{"origin": "A", "destination": "B"}]
            }"#,
        )
        .unwrap();
        assert_eq!(
            config.backend,
            BackendConfig::Timetable {
                base_url: "http://localhost:8080".into()
            }
        );

        let config = HostConfig::from_json(
            r#"{
                "backend": {"type": "mock", "path": "data/mock.json"},
                "sensors": [{"origin": "A", "destination": "B"}]
            }"#,
        )
        .unwrap();
        assert_eq!(
            config.backend,
            BackendConfig::Mock {
                path: PathBuf::from("data/mock.json")
            }
        );
    }

    #[test]
    fn http_backends_need_base_url() {
        for backend in [r#"{"type": "web"}"#, r#"{"type": "timetable"}"#] {
            let json = format!(
                r#"{{"backend": {backend}, "sensors": [{{"origin": "A", "destination": "B"}}]}}"#
            );
            let err = HostConfig::from_json(&json).unwrap_err();
            assert!(matches!(err, ConfigError::Json(_)));
        }

        let err = HostConfig::from_json(r#"{"sensors": [{"origin": "A", "destination": "B"}]}"#)
            .unwrap_err();
        assert!(err.to_string().contains("backend"));
    }

    #[test]
    fn blank_base_url_not_configured() {
        let config = HostConfig::from_json(
            r#"{"backend": {"type": "web", "base_url": ""}, "sensors": [{"origin": "A", "destination": "B"}]}"#,
        )
        .unwrap();
        let err = config.build_source(None).unwrap_err();
        assert!(matches!(err, SourceError::NotConfigured(_)));
    }

    #[test]
    fn rejects_empty_sensor_list() {
        let err = HostConfig::from_json(r#"{"backend": {"type": "mock", "path": "x"}, "sensors": []}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_duplicate_pairs() {
        let err = HostConfig::from_json(
            r#"{"backend": {"type": "mock", "path": "x"}, "sensors": [
                {"origin": "A", "destination": "B"},
                {"origin": "A", "destination": "B", "offset_mins": 10}
            ]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate sensor A-B"));
    }

    #[test]
    fn rejects_zero_interval() {
        let err = HostConfig::from_json(
            r#"{"backend": {"type": "mock", "path": "x"}, "scan_interval_secs": 0, "sensors": [{"origin": "A", "destination": "B"}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_blank_station() {
        let err = HostConfig::from_json(
            r#"{"backend": {"type": "mock", "path": "x"}, "sensors": [{"origin": " ", "destination": "B"}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn malformed_json() {
        let err = HostConfig::from_json("{").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"bind": "0.0.0.0:8123", "backend": {{"type": "mock", "path": "x"}}, "sensors": [{{"origin": "A", "destination": "B"}}]}}"#
        )
        .unwrap();

        let config = HostConfig::load(file.path()).unwrap();
        assert_eq!(config.bind, "0.0.0.0:8123");
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = HostConfig::load("/nonexistent/departure-sensor.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn timetable_without_credentials_not_configured() {
        let config = HostConfig::from_json(
            r#"{
                "backend": {"type": "timetable", "base_url": "http://localhost:8080"},
                "sensors": [{"origin": "A", "destination": "B"}]
            }"#,
        )
        .unwrap();

        let err = config.build_source(None).unwrap_err();
        assert!(matches!(err, SourceError::NotConfigured(_)));

        let source = config
            .build_source(Some(Credentials {
                client_id: "id".into(),
                client_secret: "secret".into(),
            }))
            .unwrap();
        assert_eq!(source.kind(), "timetable");
    }

    #[test]
    fn mock_backend_reads_file() {
        let mut data = tempfile::NamedTempFile::new().unwrap();
        write!(data, r#"[{{"departure": "10:05"}}]"#).unwrap();

        let json = format!(
            r#"{{"backend": {{"type": "mock", "path": {:?}}}, "sensors": [{{"origin": "A", "destination": "B"}}]}}"#,
            data.path()
        );
        let config = HostConfig::from_json(&json).unwrap();
        assert_eq!(config.build_source(None).unwrap().kind(), "mock");
    }

    #[test]
    fn credentials_debug_hides_secret() {
        let credentials = Credentials {
            client_id: "id".into(),
            client_secret: "hunter2".into(),
        };
        assert!(!format!("{credentials:?}").contains("hunter2"));
    }
}
