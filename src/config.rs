//! Runtime configuration.
//!
//! Settings come from an optional TOML file, then the `PUNCHOUT_BACKEND_URL`
//! environment variable, then CLI flags (applied by the binary). Every key
//! in the file is optional:
//!
//! ```toml
//! backend_url = "https://punchout-backend.example.com"
//! session_id = "3f0c..."
//! extract_delay_ms = 500
//! rebuild_delay_ms = 1000
//! error_ttl_secs = 6
//! request_timeout_secs = 60
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::client::DEFAULT_REQUEST_TIMEOUT;
use crate::error::{PunchoutError, Result};
use crate::session::SyncTiming;

/// Environment variable overriding `backend_url`.
pub const BACKEND_URL_ENV: &str = "PUNCHOUT_BACKEND_URL";

/// Backend used when nothing else is configured.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:3001";

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    backend_url: Option<String>,
    session_id: Option<String>,
    extract_delay_ms: Option<u64>,
    rebuild_delay_ms: Option<u64>,
    error_ttl_secs: Option<u64>,
    request_timeout_secs: Option<u64>,
}

/// Resolved settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the backend API.
    pub backend_url: String,
    /// Sent as `Session-ID` with cXML punchouts; generated when absent.
    pub session_id: Option<String>,
    /// Debounce delays and error lifetime for OCI sessions.
    pub timing: SyncTiming,
    /// Overall HTTP request timeout.
    pub request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            session_id: None,
            timing: SyncTiming::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl Config {
    /// Parses a TOML document over the defaults.
    pub fn from_toml(content: &str) -> Result<Self> {
        let file: FileConfig =
            toml::from_str(content).map_err(|e| PunchoutError::Config(e.to_string()))?;
        let defaults = Config::default();
        Ok(Config {
            backend_url: file.backend_url.unwrap_or(defaults.backend_url),
            session_id: file.session_id,
            timing: SyncTiming {
                extract_delay: file
                    .extract_delay_ms
                    .map_or(defaults.timing.extract_delay, Duration::from_millis),
                rebuild_delay: file
                    .rebuild_delay_ms
                    .map_or(defaults.timing.rebuild_delay, Duration::from_millis),
                error_ttl: file
                    .error_ttl_secs
                    .map_or(defaults.timing.error_ttl, Duration::from_secs),
            },
            request_timeout: file
                .request_timeout_secs
                .map_or(defaults.request_timeout, Duration::from_secs),
        })
    }

    /// Loads `path` when given, otherwise the defaults, then applies the
    /// environment override.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    PunchoutError::Config(format!("cannot read {}: {e}", path.display()))
                })?;
                Config::from_toml(&content)?
            }
            None => Config::default(),
        };
        if let Ok(url) = std::env::var(BACKEND_URL_ENV) {
            config.apply_backend_override(Some(url));
        }
        Ok(config)
    }

    /// Replaces the backend URL when `url` is a non-empty value.
    pub fn apply_backend_override(&mut self, url: Option<String>) {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.backend_url = url.trim().to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn file_values_override_defaults() {
        let config = Config::from_toml(
            r#"
            backend_url = "https://backend.test"
            session_id = "abc"
            extract_delay_ms = 250
            error_ttl_secs = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.backend_url, "https://backend.test");
        assert_eq!(config.session_id.as_deref(), Some("abc"));
        assert_eq!(config.timing.extract_delay, Duration::from_millis(250));
        assert_eq!(config.timing.rebuild_delay, Duration::from_millis(1000));
        assert_eq!(config.timing.error_ttl, Duration::from_secs(10));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = Config::from_toml("backend = \"typo\"").unwrap_err();
        assert!(matches!(err, PunchoutError::Config(_)));
    }

    #[test]
    fn blank_override_is_ignored() {
        let mut config = Config::default();
        config.apply_backend_override(Some("   ".to_string()));
        assert_eq!(config.backend_url, DEFAULT_BACKEND_URL);
        config.apply_backend_override(Some(" https://b.test ".to_string()));
        assert_eq!(config.backend_url, "https://b.test");
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = Config::load(Some(Path::new("/nonexistent/punchout.toml"))).unwrap_err();
        assert!(err.to_string().contains("configuration error"));
    }
}
