//! Schedule source error types.

/// Errors from a schedule source.
///
/// Everything except [`CredentialInvalid`](SourceError::CredentialInvalid)
/// and [`NotConfigured`](SourceError::NotConfigured) means the source is
/// temporarily unavailable; the next poll simply tries again.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error status code
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Response body could not be decoded
    #[error("JSON parse error: {message}")]
    Json {
        message: String,
        body: Option<String>,
    },

    /// Source could not serve data for another reason
    #[error("source unavailable: {0}")]
    Unavailable(String),

    /// Client credentials were rejected
    #[error("credentials rejected (status {status}): check DB_CLIENT_ID and DB_CLIENT_SECRET")]
    CredentialInvalid { status: u16 },

    /// Source is missing required configuration
    #[error("not configured: {0}")]
    NotConfigured(String),
}

impl SourceError {
    /// Whether this error is fatal to setting up a monitor.
    ///
    /// Such errors need the user to reconfigure; retrying on the next poll
    /// will not help.
    pub fn is_setup_fatal(&self) -> bool {
        matches!(
            self,
            SourceError::CredentialInvalid { .. } | SourceError::NotConfigured(_)
        )
    }
}
