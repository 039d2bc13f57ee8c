//! Error classification: authorization failures and user-facing error shapes.

use std::fmt;
use std::time::Duration;

use kontrak_graphql::GraphqlClientError;
use serde::Serialize;
use tracing::{info, warn};

use crate::navigation::Navigator;
use crate::notification::{Notifier, Severity};
use crate::session::SessionStore;

/// Shown when the session is torn down.
pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired, please log in again.";

/// Where the client goes after an authorization failure.
pub const LOGOUT_PATH: &str = "/logout";

const CASE_SENSITIVE_MARKERS: &[&str] = &["tahun_input"];
const CASE_INSENSITIVE_MARKERS: &[&str] = &[
    "user not logged in",
    "token",
    "jwt",
    "authorization",
    "unauthorized",
    "auth",
];
const AUTH_CODES: &[&str] = &["UNAUTHENTICATED", "FORBIDDEN", "401", "403"];

/// Error code attached to a [`ClassifiedError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ErrorCode {
    /// GraphQL extension code, e.g. `BAD_USER_INPUT`.
    Text(String),
    /// HTTP status.
    Status(u16),
}

impl ErrorCode {
    /// Whether this is the textual code `code`.
    #[must_use]
    pub fn is(&self, code: &str) -> bool {
        matches!(self, Self::Text(text) if text == code)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Status(status) => write!(f, "{status}"),
        }
    }
}

/// Error state exposed by executors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct ClassifiedError {
    pub message: String,
    pub code: Option<ErrorCode>,
}

impl ClassifiedError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    #[must_use]
    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Shape a failed exchange.
    ///
    /// The validation error is the first error of a failed HTTP body, else the
    /// first GraphQL error. Its message and extension code win; otherwise the
    /// top-level message and the HTTP status are used.
    #[must_use]
    pub fn from_failure(failure: &GraphqlClientError, fallback: &str) -> Self {
        let validation = failure
            .network_errors()
            .first()
            .or_else(|| failure.graphql_errors().first());

        let message = validation
            .map(|err| err.message.clone())
            .filter(|message| !message.is_empty())
            .or_else(|| Some(failure.message()).filter(|message| !message.is_empty()))
            .unwrap_or_else(|| fallback.to_string());

        let code = validation
            .and_then(|err| err.extension_code())
            .map(|code| ErrorCode::Text(code.to_string()))
            .or_else(|| failure.status_code().map(ErrorCode::Status));

        Self { message, code }
    }
}

/// Recognizes authorization failures and tears the session down.
#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    session: SessionStore,
    notifier: Notifier,
    navigator: Navigator,
    expired_duration: Duration,
}

impl ErrorClassifier {
    #[must_use]
    pub const fn new(
        session: SessionStore,
        notifier: Notifier,
        navigator: Navigator,
        expired_duration: Duration,
    ) -> Self {
        Self {
            session,
            notifier,
            navigator,
            expired_duration,
        }
    }

    /// Returns `true` for an authorization failure, after logging out,
    /// notifying and navigating to `/logout`.
    pub fn handle(&self, failure: &GraphqlClientError) -> bool {
        if !Self::is_authorization_error(failure) {
            return false;
        }
        warn!(error = %failure, "authorization failure; ending session");
        self.session.logout();
        self.notifier.show(
            SESSION_EXPIRED_MESSAGE,
            Severity::Error,
            self.expired_duration,
            false,
        );
        self.navigator.navigate(LOGOUT_PATH);
        info!("redirected to logout");
        true
    }

    /// Pure predicate behind [`handle`](Self::handle).
    #[must_use]
    pub fn is_authorization_error(failure: &GraphqlClientError) -> bool {
        let message = failure.message();
        let lowered = message.to_lowercase();
        let by_message = CASE_SENSITIVE_MARKERS
            .iter()
            .any(|marker| message.contains(marker))
            || CASE_INSENSITIVE_MARKERS
                .iter()
                .any(|marker| lowered.contains(marker));

        by_message
            || resolve_code(failure).is_some_and(|code| AUTH_CODES.contains(&code.as_str()))
    }
}

/// Status code, else first GraphQL extension code, else the generic code.
fn resolve_code(failure: &GraphqlClientError) -> Option<String> {
    failure
        .status_code()
        .map(|status| status.to_string())
        .or_else(|| {
            failure
                .graphql_errors()
                .first()
                .and_then(|err| err.extension_code())
                .map(ToString::to_string)
        })
        .or_else(|| failure.code().map(ToString::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kontrak_graphql::{GraphqlError, HttpErrorInfo, StatusCode};

    fn gql(message: &str) -> GraphqlClientError {
        GraphqlClientError::GraphqlErrors {
            errors: vec![GraphqlError::new(message)],
        }
    }

    fn status(code: u16, errors: Vec<GraphqlError>) -> GraphqlClientError {
        GraphqlClientError::HttpStatus {
            status: StatusCode::from_u16(code).expect("status"),
            body: String::new(),
            errors,
        }
    }

    #[test]
    fn message_markers_are_detected() {
        assert!(ErrorClassifier::is_authorization_error(&gql("jwt expired")));
        assert!(ErrorClassifier::is_authorization_error(&gql("Invalid TOKEN")));
        assert!(ErrorClassifier::is_authorization_error(&gql("User not logged in")));
        assert!(ErrorClassifier::is_authorization_error(&gql(
            "tahun_input is required"
        )));
        assert!(!ErrorClassifier::is_authorization_error(&gql(
            "TAHUN_INPUT is required"
        )));
        assert!(!ErrorClassifier::is_authorization_error(&gql("nilai kontrak invalid")));
    }

    #[test]
    fn codes_are_detected() {
        let forbidden = GraphqlClientError::GraphqlErrors {
            errors: vec![GraphqlError::new("denied").with_code("FORBIDDEN")],
        };
        assert!(ErrorClassifier::is_authorization_error(&forbidden));

        let bad_input = GraphqlClientError::GraphqlErrors {
            errors: vec![GraphqlError::new("denied").with_code("BAD_USER_INPUT")],
        };
        assert!(!ErrorClassifier::is_authorization_error(&bad_input));

        // Status message never mentions auth; the code alone decides.
        assert!(ErrorClassifier::is_authorization_error(&status(403, Vec::new())));
        assert!(!ErrorClassifier::is_authorization_error(&status(500, Vec::new())));
    }

    #[test]
    fn status_code_takes_priority_over_extension_code() {
        let failure = status(
            500,
            vec![GraphqlError::new("denied").with_code("UNAUTHENTICATED")],
        );
        assert_eq!(resolve_code(&failure).as_deref(), Some("500"));
    }

    #[test]
    fn generic_code_is_last_resort() {
        let timeout = GraphqlClientError::Http(HttpErrorInfo {
            message: "operation timed out".to_string(),
            status_code: None,
            is_timeout: true,
            is_connect: false,
        });
        assert_eq!(resolve_code(&timeout).as_deref(), Some("TIMEOUT"));
        assert!(!ErrorClassifier::is_authorization_error(&timeout));
    }

    #[test]
    fn classified_error_prefers_body_validation_error() {
        let failure = status(
            400,
            vec![GraphqlError::new("nama wajib diisi").with_code("GRAPHQL_VALIDATION_FAILED")],
        );
        let classified = ClassifiedError::from_failure(&failure, "Unknown error");
        assert_eq!(classified.message, "nama wajib diisi");
        assert_eq!(
            classified.code,
            Some(ErrorCode::Text("GRAPHQL_VALIDATION_FAILED".to_string()))
        );
    }

    #[test]
    fn classified_error_falls_back_to_status() {
        let classified = ClassifiedError::from_failure(&status(502, Vec::new()), "Unknown error");
        assert_eq!(
            classified.message,
            "Response not successful: Received status code 502"
        );
        assert_eq!(classified.code, Some(ErrorCode::Status(502)));
    }

    #[test]
    fn classified_error_uses_first_graphql_error() {
        let classified = ClassifiedError::from_failure(&gql("X"), "Unknown error");
        assert_eq!(classified, ClassifiedError::new("X"));
    }

    #[test]
    fn classified_error_uses_fallback_for_empty_messages() {
        let failure = GraphqlClientError::Http(HttpErrorInfo {
            message: String::new(),
            status_code: None,
            is_timeout: false,
            is_connect: true,
        });
        let classified = ClassifiedError::from_failure(&failure, "Unknown error");
        assert_eq!(classified.message, "Unknown error");
        assert!(classified.code.is_none());
    }

    #[test]
    fn error_code_displays_both_forms() {
        assert_eq!(ErrorCode::Status(401).to_string(), "401");
        assert!(ErrorCode::Text("FORBIDDEN".to_string()).is("FORBIDDEN"));
        assert!(!ErrorCode::Status(403).is("403"));
    }
}
