//! Error types for the Wise API client.

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::http::HttpError;

/// Error body returned by the Wise API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    pub status: u16,
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub path: String,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.message.is_empty() {
            write!(f, "{} {}", self.status, self.error)
        } else {
            f.write_str(&self.message)
        }
    }
}

impl std::error::Error for ApiError {}

/// Errors returned by [`crate::WiseApi`] operations.
#[derive(Debug, Error)]
pub enum WiseError {
    /// The service answered with a structured error.
    #[error("{0}")]
    Api(ApiError),

    /// The service answered with a non-success status and an unstructured body.
    #[error("unexpected status {status}: {body}")]
    UnexpectedStatus { status: StatusCode, body: String },

    /// The request never produced a response.
    #[error(transparent)]
    Transport(#[from] HttpError),

    /// The response body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The API base URL could not be parsed.
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),

    /// The bearer token is not a valid header value.
    #[error("invalid API token")]
    InvalidToken,
}

impl WiseError {
    /// Build the error for a failed response body.
    pub(crate) fn from_failed_response(status: StatusCode, body: &[u8]) -> Self {
        match serde_json::from_slice::<ApiError>(body) {
            Ok(api) => WiseError::Api(api),
            Err(_) => WiseError::UnexpectedStatus {
                status,
                body: String::from_utf8_lossy(body).into_owned(),
            },
        }
    }

    /// Message reported by the service, if this is a structured service error.
    pub fn api_message(&self) -> Option<&str> {
        match self {
            WiseError::Api(api) => Some(&api.message),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_api_error_deserialization() {
        let body = br#"{"timestamp":"2022-04-07T07:15:31.399+00:00","status":403,"error":"Forbidden","message":"You are forbidden to send this request","path":"/v1/profiles/12345678/balance-statements/12345678/statement.pdf"}"#;

        let parsed: ApiError = serde_json::from_slice(body).unwrap();
        let expected = ApiError {
            timestamp: Some(
                Utc.with_ymd_and_hms(2022, 4, 7, 7, 15, 31).unwrap()
                    + chrono::Duration::milliseconds(399),
            ),
            status: 403,
            error: "Forbidden".to_string(),
            message: "You are forbidden to send this request".to_string(),
            path: "/v1/profiles/12345678/balance-statements/12345678/statement.pdf".to_string(),
        };

        assert_eq!(parsed, expected);
        assert_eq!(parsed.to_string(), "You are forbidden to send this request");
    }

    #[test]
    fn test_failed_response_classification() {
        let structured = WiseError::from_failed_response(
            StatusCode::NOT_FOUND,
            br#"{"status":404,"error":"Not Found","message":"no such profile"}"#,
        );
        assert_eq!(structured.api_message(), Some("no such profile"));

        let plain = WiseError::from_failed_response(StatusCode::BAD_GATEWAY, b"upstream down");
        match plain {
            WiseError::UnexpectedStatus { status, body } => {
                assert_eq!(status, StatusCode::BAD_GATEWAY);
                assert_eq!(body, "upstream down");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_api_error_display_without_message() {
        let err = ApiError {
            timestamp: None,
            status: 401,
            error: "Unauthorized".to_string(),
            message: String::new(),
            path: String::new(),
        };
        assert_eq!(err.to_string(), "401 Unauthorized");
    }
}
