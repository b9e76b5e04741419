//! Error types for the SystemLink clients
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use serde::Deserialize;
use thiserror::Error;

/// Message carried by a rejected Arrow ingestion request
pub const ARROW_REJECTED_MESSAGE: &str =
    "Arrow ingestion request was rejected. The target DataFrame Service doesn't support Arrow streaming";

/// The main error type for the SystemLink clients
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Rate limited, retry after {retry_after_seconds}s")]
    RateLimited { retry_after_seconds: u64 },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Usage Errors
    // ============================================================================
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    // ============================================================================
    // Ingestion Errors
    // ============================================================================
    #[error("Arrow ingestion request was rejected. The target DataFrame Service doesn't support Arrow streaming ({reason}). HTTP {status}: {body}")]
    ArrowIngestionRejected {
        reason: String,
        status: u16,
        body: String,
    },

    // ============================================================================
    // Data Errors
    // ============================================================================
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Failed to decode response: {message}")]
    Decode { message: String },

    #[error("Cannot parse '{value}' in column '{column}': {message}")]
    CellParse {
        column: String,
        value: String,
        message: String,
    },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

/// Error detail decoded from a SystemLink error response body
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub inner_errors: Vec<ApiError>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create a usage error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create a cell parse error
    pub fn cell_parse(
        column: impl Into<String>,
        value: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::CellParse {
            column: column.into(),
            value: value.into(),
            message: message.into(),
        }
    }

    /// HTTP status code, for errors that came back from the server
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::HttpStatus { status, .. } | Error::ArrowIngestionRejected { status, .. } => {
                Some(*status)
            }
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Decode the server's error payload, if the body carries one
    pub fn api_error(&self) -> Option<ApiError> {
        match self {
            Error::HttpStatus { body, .. } | Error::ArrowIngestionRejected { body, .. } => {
                serde_json::from_str::<ErrorEnvelope>(body)
                    .ok()
                    .map(|envelope| envelope.error)
            }
            _ => None,
        }
    }

    /// Check if this error was raised before any request was sent
    pub fn is_usage(&self) -> bool {
        matches!(self, Error::InvalidArgument { .. })
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(_) | Error::RateLimited { .. } | Error::Timeout { .. } => true,
            Error::HttpStatus { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }
}

/// Check if an HTTP status code is retryable
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Result type alias for the SystemLink clients
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("test message");
        assert_eq!(err.to_string(), "Configuration error: test message");

        let err = Error::missing_field("server_uri");
        assert_eq!(err.to_string(), "Missing required config field: server_uri");

        let err = Error::http_status(404, "Not found");
        assert_eq!(err.to_string(), "HTTP 404: Not found");

        let err = Error::invalid_argument("end_of_data is required");
        assert_eq!(err.to_string(), "Invalid argument: end_of_data is required");
    }

    #[test]
    fn test_rejected_display_mentions_arrow() {
        let err = Error::ArrowIngestionRejected {
            reason: "writeData version 1".to_string(),
            status: 400,
            body: "bad".to_string(),
        };
        let text = err.to_string();
        assert!(text.starts_with(ARROW_REJECTED_MESSAGE));
        assert!(text.contains("writeData version 1"));
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn test_api_error_decoding() {
        let body = r#"{"error":{"name":"DataFrame.InvalidColumn","code":-251041,"message":"Column 'x' not found","args":["x"],"innerErrors":[]}}"#;
        let err = Error::http_status(400, body);
        let api = err.api_error().unwrap();
        assert_eq!(api.name.as_deref(), Some("DataFrame.InvalidColumn"));
        assert_eq!(api.code, Some(-251_041));
        assert_eq!(api.args, vec!["x".to_string()]);

        assert!(Error::http_status(500, "<html>").api_error().is_none());
        assert!(Error::config("x").api_error().is_none());
    }

    #[test]
    fn test_is_retryable() {
        assert!(Error::RateLimited {
            retry_after_seconds: 60
        }
        .is_retryable());
        assert!(Error::Timeout { timeout_ms: 1000 }.is_retryable());
        assert!(Error::http_status(429, "").is_retryable());
        assert!(Error::http_status(503, "").is_retryable());

        assert!(!Error::http_status(400, "").is_retryable());
        assert!(!Error::http_status(404, "").is_retryable());
        assert!(!Error::invalid_argument("x").is_retryable());
    }

    #[test]
    fn test_is_usage() {
        assert!(Error::invalid_argument("x").is_usage());
        assert!(!Error::http_status(400, "").is_usage());
    }

    #[test]
    fn test_result_context() {
        let result: Result<()> = Err(Error::config("inner"));
        let with_context = result.context("outer");
        assert!(with_context
            .unwrap_err()
            .to_string()
            .contains("outer: Configuration error: inner"));
    }
}
