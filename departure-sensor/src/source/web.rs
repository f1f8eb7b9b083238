//! Web connection search client.
//!
//! Talks to a JSON connection search service that needs no credentials.
//! There is no public default; the base URL must be configured. The service
//! must answer
//!
//! ```text
//! GET {base_url}/connections?from=..&to=..&date=YYYY-MM-DD&time=HH:MM&direct=true|false
//! ```
//!
//! with `{"connections": [...]}`, each element shaped like
//! [`WebRecord`](super::types::WebRecord) (flat fields, nested `delay`
//! object).

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::debug;

use super::error::SourceError;
use super::http::read_json;
use super::types::{RawConnection, SourceQuery, WebConnectionsResponse};
use super::ConnectionSource;

/// Default maximum concurrent requests.
const DEFAULT_MAX_CONCURRENT: usize = 4;

/// Configuration for the web search client.
#[derive(Debug, Clone)]
pub struct WebClientConfig {
    /// Base URL of the search service
    pub base_url: String,
    /// Maximum concurrent requests across all monitors sharing the client
    pub max_concurrent: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl WebClientConfig {
    /// Create a config for the service at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
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

/// Web connection search client.
///
/// Cheap to clone; clones share the HTTP connection pool and the
/// concurrency limit.
#[derive(Debug, Clone)]
pub struct WebClient {
    http: reqwest::Client,
    base_url: String,
    semaphore: Arc<Semaphore>,
}

impl WebClient {
    /// Create a new client with the given configuration.
    ///
    /// A blank base URL is [`SourceError::NotConfigured`].
    pub fn new(config: WebClientConfig) -> Result<Self, SourceError> {
        let base_url = config.base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(SourceError::NotConfigured(
                "web backend needs a base_url".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.to_string(),
            semaphore: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
        })
    }

    /// Search connections between two stations.
    pub async fn connections(&self, query: &SourceQuery) -> Result<Vec<RawConnection>, SourceError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| SourceError::Unavailable("request limiter closed".to_string()))?;

        let url = format!("{}/connections", self.base_url);

        debug!(
            origin = %query.origin,
            destination = %query.destination,
            at = %query.reference_time,
            "querying web connection search"
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

        let body: WebConnectionsResponse = read_json(response).await?;

        Ok(body.records().into_iter().map(RawConnection::Web).collect())
    }
}

impl ConnectionSource for WebClient {
    async fn fetch(&self, query: &SourceQuery) -> Result<Vec<RawConnection>, SourceError> {
        self.connections(query).await
    }
}
