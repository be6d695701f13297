//! Error types for Superset API operations.
//!
//! Every remote call returns [`Result`]. Errors are categorized so callers
//! can tell a missing object (which clears recorded state) apart from a
//! genuine failure.

use std::fmt;
use std::io;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of client errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Transport-level failure (connection, DNS, TLS).
    Network,
    /// The requested object does not exist.
    NotFound,
    /// The server rejected the request.
    Api,
    /// Login failed or the token was rejected.
    Auth,
    /// The operation deadline elapsed.
    Timeout,
    /// The response could not be decoded.
    Format,
    /// Client misconfiguration.
    Config,
    /// Other/unknown errors.
    Other,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "Network connectivity issue",
            Self::NotFound => "Object not found",
            Self::Api => "Request rejected by the server",
            Self::Auth => "Authentication failed",
            Self::Timeout => "Operation timed out",
            Self::Format => "Unexpected response format",
            Self::Config => "Invalid client configuration",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Network => "Check that the Superset server URL is reachable",
            Self::NotFound => "Verify the object still exists on the server",
            Self::Api => "Check the response body for the server's validation message",
            Self::Auth => "Check the username and password",
            Self::Timeout => "Raise the operation timeout or check server load",
            Self::Format => "The server may run an incompatible Superset version",
            Self::Config => "Check the provider settings",
            Self::Other => "Check the error details for more information",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while talking to Superset.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The object does not exist (HTTP 404 or empty lookup).
    #[error("{resource} not found (id={id})")]
    NotFound {
        /// Kind of object, e.g. "User".
        resource: &'static str,
        /// Identifier that was looked up.
        id: String,
    },

    /// The server answered with a non-success status.
    #[error("status code: {status}, body: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// HTTP transport failed.
    #[error("HTTP request failed: {message}")]
    Http {
        /// Error message.
        message: String,
        /// HTTP status code if available.
        status: Option<u16>,
    },

    /// The operation deadline elapsed.
    #[error("operation timed out: {0}")]
    Timeout(String),

    /// Invalid response from API.
    #[error("invalid API response: {0}")]
    InvalidResponse(String),

    /// Login failed.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Client misconfiguration.
    #[error("invalid client configuration: {0}")]
    Config(String),

    /// Request body could not be encoded.
    #[error("JSON encoding failed: {0}")]
    Json(String),

    /// IO error while reading a response.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Create a not-found error.
    pub fn not_found(resource: &'static str, id: impl fmt::Display) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// Create an HTTP error.
    pub fn http(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Http {
            message: message.into(),
            status,
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::NotFound { .. } => ErrorCategory::NotFound,
            Error::Api { status: 401 | 403, .. } => ErrorCategory::Auth,
            Error::Api { .. } => ErrorCategory::Api,
            Error::Http { .. } => ErrorCategory::Network,
            Error::Timeout(_) => ErrorCategory::Timeout,
            Error::InvalidResponse(_) => ErrorCategory::Format,
            Error::Auth(_) => ErrorCategory::Auth,
            Error::Config(_) => ErrorCategory::Config,
            Error::Json(_) => ErrorCategory::Format,
            Error::Io(_) => ErrorCategory::Other,
        }
    }

    /// Whether the error means the object is gone.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.category() == ErrorCategory::NotFound
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::Http {
                message: format!("HTTP {code}"),
                status: Some(code),
            },
            ureq::Error::Timeout(which) => Self::Timeout(format!("{which:?}")),
            other => Self::Http {
                message: other.to_string(),
                status: None,
            },
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_category() {
        let err = Error::not_found("User", 42);
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "User not found (id=42)");
    }

    #[test]
    fn test_api_error_keeps_status_and_body() {
        let err = Error::Api {
            status: 422,
            body: r#"{"message":{"columns":["invalid"]}}"#.to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Api);
        assert!(!err.is_not_found());
        assert!(err.to_string().contains("422"));
        assert!(err.to_string().contains("columns"));
    }

    #[test]
    fn test_unauthorized_is_auth() {
        let err = Error::Api {
            status: 401,
            body: String::new(),
        };
        assert_eq!(err.category(), ErrorCategory::Auth);
    }

    #[test]
    fn test_http_error_category() {
        let err = Error::http("connection refused", None);
        assert_eq!(err.category(), ErrorCategory::Network);
    }

    #[test]
    fn test_ureq_status_conversion() {
        let err: Error = ureq::Error::StatusCode(503).into();
        match err {
            Error::Http { status, .. } => assert_eq!(status, Some(503)),
            other => panic!("Expected Error::Http, got {other:?}"),
        }
    }

    #[test]
    fn test_json_error_is_invalid_response() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: Error = json_err.into();
        assert_eq!(err.category(), ErrorCategory::Format);
    }

    #[test]
    fn test_category_text() {
        assert!(!ErrorCategory::Timeout.description().is_empty());
        assert!(!ErrorCategory::Auth.advice().is_empty());
        assert!(format!("{}", ErrorCategory::NotFound).contains("not found"));
    }
}
