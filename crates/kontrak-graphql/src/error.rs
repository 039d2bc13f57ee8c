//! Error types for the GraphQL client.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// HTTP error information captured from reqwest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpErrorInfo {
    /// Error message.
    pub message: String,
    /// HTTP status code (if available).
    pub status_code: Option<u16>,
    /// Whether the error was a timeout.
    pub is_timeout: bool,
    /// Whether the error was a connection failure.
    pub is_connect: bool,
}

impl From<reqwest::Error> for HttpErrorInfo {
    fn from(err: reqwest::Error) -> Self {
        Self {
            message: err.to_string(),
            status_code: err.status().map(|status| status.as_u16()),
            is_timeout: err.is_timeout(),
            is_connect: err.is_connect(),
        }
    }
}

/// GraphQL error location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphqlErrorLocation {
    /// Line number in the query (1-based).
    pub line: u32,
    /// Column number in the query (1-based).
    pub column: u32,
}

/// GraphQL path segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GraphqlPathSegment {
    /// Field name.
    Key(String),
    /// Array index.
    Index(i64),
}

/// Entry of a response envelope's `errors` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphqlError {
    /// Human-readable error message.
    #[serde(default)]
    pub message: String,
    /// Location(s) within the query.
    #[serde(default)]
    pub locations: Vec<GraphqlErrorLocation>,
    /// Path within the response where the error occurred.
    #[serde(default)]
    pub path: Vec<GraphqlPathSegment>,
    /// Extensions metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<serde_json::Value>,
}

impl GraphqlError {
    /// Create an error carrying only a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: Vec::new(),
            path: Vec::new(),
            extensions: None,
        }
    }

    /// Attach `extensions.code`.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.extensions = Some(serde_json::json!({ "code": code.into() }));
        self
    }

    /// `extensions.code`, when it is a string.
    #[must_use]
    pub fn extension_code(&self) -> Option<&str> {
        self.extensions
            .as_ref()
            .and_then(|ext| ext.get("code"))
            .and_then(serde_json::Value::as_str)
    }
}

/// Error type for GraphQL client operations.
#[derive(Debug, Clone, Error)]
pub enum GraphqlClientError {
    /// HTTP/network error.
    #[error("{}", .0.message)]
    Http(HttpErrorInfo),

    /// Non-success HTTP response. `errors` holds the GraphQL errors found in
    /// the response body, if it was a GraphQL envelope.
    #[error("Response not successful: Received status code {}", .status.as_u16())]
    HttpStatus {
        /// HTTP status code.
        status: StatusCode,
        /// Response body (truncated if needed).
        body: String,
        /// GraphQL errors parsed from the body.
        errors: Vec<GraphqlError>,
    },

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(String),

    /// GraphQL-level errors returned by the server.
    #[error("{}", first_message(.errors))]
    GraphqlErrors {
        /// GraphQL error list.
        errors: Vec<GraphqlError>,
    },

    /// GraphQL protocol violation.
    #[error("GraphQL protocol error: {message}")]
    Protocol {
        /// Details.
        message: String,
    },
}

fn first_message(errors: &[GraphqlError]) -> &str {
    errors
        .first()
        .map(|err| err.message.as_str())
        .filter(|message| !message.is_empty())
        .unwrap_or("GraphQL error")
}

impl From<reqwest::Error> for GraphqlClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(HttpErrorInfo::from(err))
    }
}

impl From<serde_json::Error> for GraphqlClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl GraphqlClientError {
    /// Top-level error message.
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// HTTP status code of the failed exchange, if any.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(status.as_u16()),
            Self::Http(info) => info.status_code,
            _ => None,
        }
    }

    /// GraphQL errors carried in a failed HTTP response body.
    #[must_use]
    pub fn network_errors(&self) -> &[GraphqlError] {
        match self {
            Self::HttpStatus { errors, .. } => errors,
            _ => &[],
        }
    }

    /// GraphQL errors returned in a successful HTTP envelope.
    #[must_use]
    pub fn graphql_errors(&self) -> &[GraphqlError] {
        match self {
            Self::GraphqlErrors { errors } => errors,
            _ => &[],
        }
    }

    /// Generic error code for failures that are not GraphQL errors.
    #[must_use]
    pub const fn code(&self) -> Option<&'static str> {
        match self {
            Self::Http(info) if info.is_timeout => Some("TIMEOUT"),
            Self::Http(info) if info.is_connect => Some("CONNECTION_FAILED"),
            Self::Json(_) => Some("BAD_RESPONSE"),
            _ => None,
        }
    }

    /// Whether the failure happened at the network layer (no GraphQL envelope).
    #[must_use]
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Http(_) | Self::HttpStatus { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_message_mentions_code() {
        let err = GraphqlClientError::HttpStatus {
            status: StatusCode::UNAUTHORIZED,
            body: String::new(),
            errors: Vec::new(),
        };
        assert_eq!(
            err.message(),
            "Response not successful: Received status code 401"
        );
        assert_eq!(err.status_code(), Some(401));
        assert!(err.is_network());
    }

    #[test]
    fn graphql_errors_message_uses_first_error() {
        let err = GraphqlClientError::GraphqlErrors {
            errors: vec![GraphqlError::new("X"), GraphqlError::new("Y")],
        };
        assert_eq!(err.message(), "X");
        assert_eq!(err.graphql_errors().len(), 2);
        assert!(err.network_errors().is_empty());
    }

    #[test]
    fn extension_code_reads_string_codes_only() {
        let coded = GraphqlError::new("denied").with_code("FORBIDDEN");
        assert_eq!(coded.extension_code(), Some("FORBIDDEN"));

        let mut numeric = GraphqlError::new("denied");
        numeric.extensions = Some(serde_json::json!({"code": 403}));
        assert_eq!(numeric.extension_code(), None);
    }
}
