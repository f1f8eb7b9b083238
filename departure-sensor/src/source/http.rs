//! Response handling shared by the HTTP backends.

use serde::de::DeserializeOwned;

use super::error::SourceError;

/// How much of an undecodable body to keep for diagnostics.
const BODY_EXCERPT_CHARS: usize = 500;

/// Check the status of a response and decode its JSON body.
pub(super) async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, SourceError> {
    let status = response.status();

    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(SourceError::CredentialInvalid {
            status: status.as_u16(),
        });
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SourceError::Api {
            status: status.as_u16(),
            message: body,
        });
    }

    let body = response.text().await?;
    decode_body(&body)
}

/// Decode a JSON body, keeping an excerpt of it on failure.
pub(super) fn decode_body<T: DeserializeOwned>(body: &str) -> Result<T, SourceError> {
    serde_json::from_str(body).map_err(|e| SourceError::Json {
        message: e.to_string(),
        body: Some(body.chars().take(BODY_EXCERPT_CHARS).collect()),
    })
}
