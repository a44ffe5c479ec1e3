//! Error types for the jsonfetch client.
//!
//! Uses `thiserror` for structured error handling with automatic `From` implementations.

use std::time::Duration;

use reqwest::Method;

/// Errors from the HTTP client layer.
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    /// HTTP transport error (connection, DNS, TLS, invalid URL, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Error raised by a layer of the transport middleware stack
    #[error("Transport middleware error: {0}")]
    Middleware(#[source] reqwest_middleware::Error),

    /// Non-2xx response
    #[error("{method} {url} failed with status {status}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Request method
        method: Method,
        /// Full request URL
        url: String,
        /// Response body, possibly empty
        body: String,
    },

    /// The per-call timeout elapsed before the response was read
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Response body is not JSON, or does not fit the requested type
    #[error("Failed to decode response: {0}")]
    Decode(#[source] serde_json::Error),

    /// Request data could not be serialized
    #[error("Failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    /// Header name or value cannot be sent
    #[error("Invalid header {name}: {reason}")]
    InvalidHeader {
        /// Offending header name
        name: String,
        /// Why it was refused
        reason: String,
    },

    /// A request middleware refused to let the request through
    #[error("Request rejected by middleware: {0}")]
    Rejected(String),
}

impl ClientError {
    /// Create a status error for a failed response.
    #[must_use]
    pub fn status_error(
        status: u16,
        method: &Method,
        url: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self::Status { status, method: method.clone(), url: url.into(), body: body.into() }
    }

    /// Create an invalid header error.
    #[must_use]
    pub fn invalid_header(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidHeader { name: name.into(), reason: reason.to_string() }
    }

    /// Create a middleware rejection.
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }

    /// Split a transport-stack error so plain reqwest failures surface unchanged.
    pub(crate) fn from_transport(err: reqwest_middleware::Error) -> Self {
        match err {
            reqwest_middleware::Error::Reqwest(err) => Self::Http(err),
            other => Self::Middleware(other),
        }
    }

    /// HTTP status code, if the server answered.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns true if the server answered with `code`.
    #[must_use]
    pub fn is_status(&self, code: u16) -> bool {
        self.status() == Some(code)
    }

    /// Returns true if the call was cancelled by a timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Http(err) => err.is_timeout(),
            _ => false,
        }
    }
}

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_carries_code() {
        let err = ClientError::status_error(404, &Method::GET, "https://x/y", "");
        assert_eq!(err.status(), Some(404));
        assert!(err.is_status(404));
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_status_error_message_names_method_and_url() {
        let err = ClientError::status_error(500, &Method::POST, "https://x/items", "boom");
        let message = err.to_string();
        assert!(message.contains("POST"));
        assert!(message.contains("https://x/items"));
        assert!(message.contains("500"));
    }

    #[test]
    fn test_timeout_error() {
        let err = ClientError::Timeout(Duration::from_millis(50));
        assert!(err.is_timeout());
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_decode_error_has_no_status() {
        let json_err = serde_json::from_str::<serde_json::Value>("{ nope").unwrap_err();
        let err = ClientError::Decode(json_err);
        assert_eq!(err.status(), None);
        assert!(err.to_string().starts_with("Failed to decode response"));
    }

    #[test]
    fn test_transport_middleware_error_keeps_source() {
        let err = ClientError::from_transport(reqwest_middleware::Error::middleware(
            std::io::Error::other("layer failed"),
        ));
        assert!(matches!(err, ClientError::Middleware(_)));

        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert!(source.is_some_and(|s| s.contains("layer failed")));
    }
}
