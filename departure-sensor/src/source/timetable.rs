//! Authenticated timetable API client.
//!
//! The timetable API requires a client id and secret, sent as the
//! `DB-Client-Id` and `DB-Api-Key` headers on every request. Credentials are
//! validated once when a monitor is set up; a rejection there is fatal for
//! that monitor until it is reconfigured.
//!
//! There is no public default; the base URL must point at a JSON gateway
//! answering
//!
//! ```text
//! GET {base_url}/stations?name=..        -> {"stations": [{"name": ..}]}
//! GET {base_url}/connections?from=..&to=..&date=YYYY-MM-DD&time=HH:MM&direct=true|false
//!                                        -> {"connections": [...]}
//! ```
//!
//! with connection elements shaped like
//! [`TimetableRecord`](super::types::TimetableRecord). A 401 or 403 from
//! either endpoint means the credentials were rejected.

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use super::error::SourceError;
use super::http::read_json;
use super::types::{RawConnection, SourceQuery, TimetableConnectionsResponse};
use super::ConnectionSource;

/// Default maximum concurrent requests.
const DEFAULT_MAX_CONCURRENT: usize = 4;

const CLIENT_ID_HEADER: &str = "db-client-id";
const API_KEY_HEADER: &str = "db-api-key";

/// Configuration for the timetable API client.
#[derive(Clone)]
pub struct TimetableConfig {
    /// Client id issued by the API marketplace
    pub client_id: String,
    /// Client secret issued by the API marketplace
    pub client_secret: String,
    /// Base URL of the gateway
    pub base_url: String,
    /// Maximum concurrent requests across all monitors sharing the client
    pub max_concurrent: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl TimetableConfig {
    /// Create a config for the gateway at `base_url` with the given credentials.
    pub fn new(
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            base_url: base_url.into(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            timeout_secs: 30,
        }
    }

    /// Set maximum concurrent requests.
    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n;
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl std::fmt::Debug for TimetableConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimetableConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("max_concurrent", &self.max_concurrent)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Station lookup response, used to validate credentials.
#[derive(Debug, Deserialize)]
struct StationsResponse {
    #[serde(default)]
    stations: Vec<StationDto>,
}

#[derive(Debug, Deserialize)]
struct StationDto {
    name: String,
}

/// Timetable API client.
#[derive(Debug, Clone)]
pub struct TimetableClient {
    http: reqwest::Client,
    base_url: String,
    semaphore: Arc<Semaphore>,
}

impl TimetableClient {
    /// Create a new client. Does not contact the API.
    pub fn new(config: TimetableConfig) -> Result<Self, SourceError> {
        let base_url = config.base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(SourceError::NotConfigured(
                "timetable backend needs a base_url".to_string(),
            ));
        }
        if config.client_id.trim().is_empty() || config.client_secret.trim().is_empty() {
            return Err(SourceError::NotConfigured(
                "timetable API needs a client id and secret".to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static(CLIENT_ID_HEADER),
            header_value(&config.client_id, "client id")?,
        );
        headers.insert(
            HeaderName::from_static(API_KEY_HEADER),
            secret_header_value(&config.client_secret)?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.to_string(),
            semaphore: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
        })
    }

    /// Create a client and validate its credentials against `station`.
    pub async fn connect(config: TimetableConfig, station: &str) -> Result<Self, SourceError> {
        let client = Self::new(config)?;
        client.validate_credentials(station).await?;
        Ok(client)
    }

    /// Validate the credentials by looking up a station.
    ///
    /// Returns [`SourceError::CredentialInvalid`] if the API rejects the
    /// client id or secret.
    pub async fn validate_credentials(&self, station: &str) -> Result<(), SourceError> {
        let _permit = self.acquire().await?;

        let url = format!("{}/stations", self.base_url);
        let response = self.http.get(&url).query(&[("name", station)]).send().await?;
        let body: StationsResponse = read_json(response).await?;

        info!(
            station,
            matches = body.stations.len(),
            first = body.stations.first().map(|s| s.name.as_str()),
            "timetable API credentials accepted"
        );

        Ok(())
    }

    /// Fetch connections between two stations.
    pub async fn connections(&self, query: &SourceQuery) -> Result<Vec<RawConnection>, SourceError> {
        let _permit = self.acquire().await?;

        let url = format!("{}/connections", self.base_url);

        debug!(
            origin = %query.origin,
            destination = %query.destination,
            at = %query.reference_time,
            "querying timetable API"
        );

        let response = self
            .http
            .get(&url)
            .query(&[
                ("from", query.origin.clone()),
                ("to", query.destination.clone()),
                ("date", query.date_param()),
                ("time", query.time_param()),
                ("direct", query.only_direct.to_string()),
            ])
            .send()
            .await?;

        let body: TimetableConnectionsResponse = read_json(response).await?;

        Ok(body
            .records()
            .into_iter()
            .map(RawConnection::Timetable)
            .collect())
    }

    async fn acquire(&self) -> Result<tokio::sync::SemaphorePermit<'_>, SourceError> {
        self.semaphore
            .acquire()
            .await
            .map_err(|_| SourceError::Unavailable("request limiter closed".to_string()))
    }
}

fn header_value(value: &str, what: &str) -> Result<HeaderValue, SourceError> {
    HeaderValue::from_str(value)
        .map_err(|_| SourceError::NotConfigured(format!("{what} contains invalid characters")))
}

/// Header value for the secret, hidden from `Debug` output.
fn secret_header_value(secret: &str) -> Result<HeaderValue, SourceError> {
    let mut value = header_value(secret, "client secret")?;
    value.set_sensitive(true);
    Ok(value)
}

impl ConnectionSource for TimetableClient {
    async fn fetch(&self, query: &SourceQuery) -> Result<Vec<RawConnection>, SourceError> {
        self.connections(query).await
    }

    async fn validate(&self, origin: &str) -> Result<(), SourceError> {
        self.validate_credentials(origin).await
    }
}
