//! Schedule sources.
//!
//! A source returns raw connection records for a station pair, in schedule
//! order, starting at a reference time. Two backends exist in practice and
//! they disagree on record shape:
//! - the web connection search returns [`WebRecord`]s with nested delays
//! - the authenticated timetable API returns canonical [`TimetableRecord`]s
//!
//! Both converge on [`Connection`](crate::domain::Connection) in the
//! normalizer; nothing downstream looks at record shapes.

mod error;
mod http;
mod mock;
mod timetable;
mod types;
mod web;

use std::future::Future;

pub use error::SourceError;
pub use mock::MockSource;
pub use timetable::{TimetableClient, TimetableConfig};
pub use types::{
    RawConnection, SourceQuery, TimetableConnectionsResponse, TimetableRecord, WebConnectionsResponse,
    WebDelay, WebRecord, decode_records,
};
pub use web::{WebClient, WebClientConfig};

/// A backend that can be polled for connections.
///
/// Fetching may take a while (it is a network call); the monitor runs it on
/// its own task so other monitors are never held up.
pub trait ConnectionSource: Send + Sync + 'static {
    /// Fetch raw records for the query, in schedule order.
    ///
    /// An empty result is `Ok(vec![])`, not an error.
    fn fetch(
        &self,
        query: &SourceQuery,
    ) -> impl Future<Output = Result<Vec<RawConnection>, SourceError>> + Send;

    /// Check that the source is usable for `origin` before polling starts.
    fn validate(&self, _origin: &str) -> impl Future<Output = Result<(), SourceError>> + Send {
        async { Ok(()) }
    }
}

/// Any of the supported backends, chosen at startup from configuration.
#[derive(Debug, Clone)]
pub enum Source {
    Web(WebClient),
    Timetable(TimetableClient),
    Mock(MockSource),
}

impl Source {
    /// Short backend name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Source::Web(_) => "web",
            Source::Timetable(_) => "timetable",
            Source::Mock(_) => "mock",
        }
    }
}

impl ConnectionSource for Source {
    async fn fetch(&self, query: &SourceQuery) -> Result<Vec<RawConnection>, SourceError> {
        match self {
            Source::Web(client) => client.fetch(query).await,
            Source::Timetable(client) => client.fetch(query).await,
            Source::Mock(mock) => mock.fetch(query).await,
        }
    }

    async fn validate(&self, origin: &str) -> Result<(), SourceError> {
        match self {
            Source::Web(client) => client.validate(origin).await,
            Source::Timetable(client) => client.validate(origin).await,
            Source::Mock(mock) => mock.validate(origin).await,
        }
    }
}
