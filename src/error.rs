//! Typed error hierarchy for the punchout-tester crate.
//!
//! `PunchoutError` covers every failure boundary the crate touches:
//! - user input that is not a usable URL (`InvalidUrl`, `Validation`),
//! - the backend API answering with a non-success status (`Api`) or with a
//!   success status but an unusable payload (`Backend`),
//! - decoding failures for JSON (`Parse`) and cXML (`Xml`),
//! - transport-level failures (`Network`) and configuration problems (`Config`).
//!
//! The OCI synchronizer keeps its own narrow [`crate::sync::SyncError`]
//! because it has exactly one recoverable failure; it converts into
//! `PunchoutError::InvalidUrl` when it crosses into the rest of the crate.

use reqwest::StatusCode;

/// Unified error type for all punchout-tester library operations.
#[derive(Debug, thiserror::Error)]
pub enum PunchoutError {
    /// A string that had to be a URL could not be parsed as one.
    #[error("{message}")]
    InvalidUrl {
        /// User-facing explanation (e.g. `Invalid URL format`).
        message: String,
        /// The parser error, when one exists.
        #[source]
        source: Option<url::ParseError>,
    },

    /// A form precondition was not met before sending (missing supplier
    /// URL, empty payload, ...). The message is user-facing.
    #[error("{0}")]
    Validation(String),

    /// The backend API returned a non-success HTTP status code.
    ///
    /// `body` holds the raw response text; for JSON error bodies the
    /// `message` (or `error`/`details`) field is lifted into `message`.
    #[error("API error {status}: {message}")]
    Api {
        /// HTTP status returned by the backend.
        status: StatusCode,
        /// Human-readable error extracted from the body, or the body itself.
        message: String,
        /// Raw response body text.
        body: String,
    },

    /// The backend answered 2xx but the payload did not contain what the
    /// operation needs (no punchout URL, non-JSON header report, ...).
    #[error("{0}")]
    Backend(String),

    /// JSON deserialization failed.
    #[error("failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    /// A cXML document could not be read.
    #[error("failed to parse cXML: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Transport-level failure (DNS, TCP, TLS, timeout).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The configuration file could not be read or decoded.
    #[error("configuration error: {0}")]
    Config(String),
}

impl PunchoutError {
    /// Shorthand for an `InvalidUrl` error without an underlying parser error.
    pub fn invalid_url(message: impl Into<String>) -> Self {
        PunchoutError::InvalidUrl {
            message: message.into(),
            source: None,
        }
    }
}

/// Convenience alias used throughout the library.
pub type Result<T> = std::result::Result<T, PunchoutError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn invalid_url_displays_user_message() {
        let err = PunchoutError::InvalidUrl {
            message: "Invalid URL format".to_string(),
            source: Some(url::ParseError::RelativeUrlWithoutBase),
        };
        assert_eq!(err.to_string(), "Invalid URL format");
        assert!(
            err.source().is_some(),
            "InvalidUrl with a parser error should chain it"
        );
    }

    #[test]
    fn api_error_includes_status_and_message() {
        let err = PunchoutError::Api {
            status: StatusCode::BAD_REQUEST,
            message: "Missing baseURL".to_string(),
            body: r#"{"message":"Missing baseURL"}"#.to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("400"), "display should include status code");
        assert!(msg.contains("Missing baseURL"));
    }

    #[test]
    fn validation_error_is_shown_verbatim() {
        let err = PunchoutError::Validation("Please enter Supplier URL".to_string());
        assert_eq!(err.to_string(), "Please enter Supplier URL");
    }

    #[test]
    fn parse_error_wraps_serde_json() {
        let json_err = serde_json::from_str::<String>("{{bad json}}").unwrap_err();
        let err = PunchoutError::Parse(json_err);
        assert!(err.to_string().contains("failed to parse response"));
        assert!(err.source().is_some());
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PunchoutError>();
    }
}
