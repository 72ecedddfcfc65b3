//! API error handling
//!
//! Every failed call to the Weld Connect API is normalized into [`ApiError`].
//! Non-success responses carry a human-readable message extracted from the
//! response body (`details`, then `message`) or the HTTP status line.

use reqwest::{Method, StatusCode};
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur while talking to the Weld Connect API
#[derive(Error, Debug)]
pub enum ApiError {
    /// No API key was supplied
    #[error("No API key configured. Set WELD_CONNECT_API_KEY or run `weld-connect config set api_key <key>`.")]
    MissingApiKey,

    /// Base URL cannot be used to build request URLs
    #[error("Invalid API base URL '{url}'")]
    InvalidBaseUrl { url: String },

    /// The server answered with a non-success status
    #[error("API {method} failed: {message}")]
    Request {
        method: Method,
        path: String,
        status: StatusCode,
        message: String,
    },

    /// The request never produced a response (DNS, TLS, connection refused, timeout)
    #[error("Could not reach the Weld Connect API: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body did not match the expected shape
    #[error("Unexpected response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    /// Build a request error from a non-success response body
    pub fn from_response(method: Method, path: &str, status: StatusCode, body: &[u8]) -> Self {
        ApiError::Request {
            method,
            path: path.to_string(),
            status,
            message: extract_message(status, body),
        }
    }

    /// HTTP status of the failed request, if the server answered
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Request { status, .. } => Some(*status),
            ApiError::Transport(err) => err.status(),
            _ => None,
        }
    }

    /// Whether re-triggering the same action may succeed
    ///
    /// Nothing is retried automatically; this only drives the hint shown to the user.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Transport(_) => true,
            ApiError::Request { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }

    /// Whether the failure points at a bad or missing API key
    pub fn is_auth_failure(&self) -> bool {
        match self {
            ApiError::MissingApiKey => true,
            ApiError::Request { status, .. } => {
                *status == StatusCode::UNAUTHORIZED || *status == StatusCode::FORBIDDEN
            }
            _ => false,
        }
    }

    /// Get a recovery suggestion for this error
    pub fn suggestion(&self) -> Option<&'static str> {
        if self.is_auth_failure() {
            return Some("Check your API key in the Weld app and update it with `config set api_key`.");
        }
        match self {
            ApiError::Transport(_) => Some("Check your network connection and the base_url setting."),
            ApiError::InvalidBaseUrl { .. } => Some("Set base_url to an absolute http(s) URL."),
            _ if self.is_retryable() => Some("The service had a problem. Try again in a moment."),
            _ => None,
        }
    }
}

/// Pull a message out of an error body, falling back to the status line
fn extract_message(status: StatusCode, body: &[u8]) -> String {
    if let Ok(value) = serde_json::from_slice::<Value>(body) {
        for key in ["details", "message"] {
            match value.get(key) {
                Some(Value::String(text)) if !text.is_empty() => return text.clone(),
                Some(other) if !other.is_null() && !matches!(other, Value::String(_)) => {
                    return other.to_string();
                }
                _ => {}
            }
        }
    }
    status_line(status)
}

fn status_line(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => reason.to_string(),
        None => status.as_str().to_string(),
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_from_details() {
        let err = ApiError::from_response(
            Method::GET,
            "/integrations",
            StatusCode::UNAUTHORIZED,
            br#"{"details":"bad key"}"#,
        );
        assert!(err.to_string().contains("bad key"));
        assert!(err.to_string().starts_with("API GET failed"));
        assert!(err.is_auth_failure());
    }

    #[test]
    fn test_details_preferred_over_message() {
        let err = ApiError::from_response(
            Method::POST,
            "/elt_syncs",
            StatusCode::BAD_REQUEST,
            br#"{"message":"generic","details":"schema name taken"}"#,
        );
        assert!(err.to_string().contains("schema name taken"));
        assert!(!err.to_string().contains("generic"));
    }

    #[test]
    fn test_message_field_fallback() {
        let err = ApiError::from_response(
            Method::POST,
            "/elt_syncs",
            StatusCode::UNPROCESSABLE_ENTITY,
            br#"{"message":"invalid cron"}"#,
        );
        assert_eq!(err.to_string(), "API POST failed: invalid cron");
    }

    #[test]
    fn test_status_line_fallback() {
        let err = ApiError::from_response(
            Method::GET,
            "/elt_syncs/1",
            StatusCode::NOT_FOUND,
            b"<html>nope</html>",
        );
        assert_eq!(err.to_string(), "API GET failed: Not Found");

        let err = ApiError::from_response(Method::GET, "/x", StatusCode::BAD_GATEWAY, b"");
        assert_eq!(err.to_string(), "API GET failed: Bad Gateway");
    }

    #[test]
    fn test_retryable_classification() {
        let server = ApiError::from_response(Method::GET, "/x", StatusCode::SERVICE_UNAVAILABLE, b"");
        assert!(server.is_retryable());
        assert!(server.suggestion().is_some());

        let client = ApiError::from_response(Method::GET, "/x", StatusCode::BAD_REQUEST, b"");
        assert!(!client.is_retryable());
        assert!(client.suggestion().is_none());
    }

    #[test]
    fn test_missing_key_suggestion() {
        let err = ApiError::MissingApiKey;
        assert!(err.is_auth_failure());
        assert!(err.suggestion().unwrap().contains("api_key"));
        assert!(err.status().is_none());
    }
}
