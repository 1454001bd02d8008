//! Error types for the Tower client.

use reqwest::StatusCode;
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

/// An unclassified `>399` response from the Tower API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: u16,
    pub message: String,
    pub url: String,
}

impl ApiError {
    pub fn new(status: u16, message: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            url: url.into(),
        }
    }

    /// Build from a raw error response, extracting `{"message": ...}` when present.
    pub fn from_body(status: StatusCode, body: &[u8], url: &str) -> Self {
        Self::new(status.as_u16(), parse_error_message(status, body), url)
    }

    pub fn status(&self) -> u16 {
        self.status
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Tower API returned status {} for {}: {}",
            self.status, self.url, self.message
        )
    }
}

impl std::error::Error for ApiError {}

/// Errors surfaced by every client operation.
#[derive(Debug, Error)]
pub enum TowerError {
    /// Connection, DNS or protocol failure talking to the API.
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The caller's deadline elapsed before the call completed.
    #[error("request to {url} timed out")]
    Timeout { url: String },

    /// The caller's cancellation token fired.
    #[error("request to {url} was cancelled")]
    Cancelled { url: String },

    /// Response body did not match the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// Request body could not be built.
    #[error("failed to encode request: {0}")]
    Encode(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    /// Compute environment platform discriminator with no registered codec.
    #[error("unsupported compute environment platform: {0}")]
    UnsupportedPlatform(String),

    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),

    #[error("could not find an organization with the name {0}")]
    OrganizationNotFound(String),

    /// Lookup by name or id found nothing.
    #[error("could not find {kind} '{name}'")]
    NotFound { kind: &'static str, name: String },

    #[error("empty response from server")]
    EmptyResponse,

    /// The remote state contradicts what a previous call reported.
    #[error("inconsistent remote state: {0}")]
    Inconsistent(String),
}

impl TowerError {
    /// HTTP status when this is an API error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api(err) => Some(err.status),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. } | Self::Timeout { .. })
    }
}

impl From<serde_json::Error> for TowerError {
    fn from(error: serde_json::Error) -> Self {
        Self::Decode(error.to_string())
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, TowerError>;

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    message: Option<String>,
}

/// Pull a human readable message out of an error body.
pub fn parse_error_message(status: StatusCode, body: &[u8]) -> String {
    if let Ok(ErrorPayload {
        message: Some(message),
    }) = serde_json::from_slice::<ErrorPayload>(body)
    {
        if !message.is_empty() {
            return message;
        }
    }

    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_from_json_body() {
        let msg = parse_error_message(
            StatusCode::CONFLICT,
            br#"{"message":"Already a participant"}"#,
        );
        assert_eq!(msg, "Already a participant");
    }

    #[test]
    fn test_message_falls_back_to_raw_body() {
        let msg = parse_error_message(StatusCode::BAD_REQUEST, b"bad things");
        assert_eq!(msg, "bad things");
    }

    #[test]
    fn test_message_falls_back_to_reason_phrase() {
        let msg = parse_error_message(StatusCode::NOT_FOUND, b"");
        assert_eq!(msg, "Not Found");
    }

    #[test]
    fn test_api_error_display_and_status() {
        let err = TowerError::from(ApiError::new(404, "gone", "https://api/x"));
        assert_eq!(err.status(), Some(404));
        assert!(err.to_string().contains("404"));
        assert!(err.to_string().contains("https://api/x"));
    }
}
