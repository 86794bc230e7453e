//! HTTP client for the punchout test backend.
//!
//! The backend does the heavy lifting (proxying punchout round trips,
//! storing returned carts, inspecting remote sites). `BackendClient` wraps a
//! `reqwest::Client` with explicit timeouts and a base URL, and turns
//! non-success responses into [`PunchoutError::Api`] with the backend's
//! diagnostic message preserved.
//!
//! There is no authentication: the backend is reached over plain HTTP(S)
//! with JSON or text bodies.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Serialize, de::DeserializeOwned};

use crate::error::{PunchoutError, Result};

/// Connect timeout (TCP + TLS handshake).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Overall request timeout. A punchout round trip waits on the supplier
/// behind the backend, so this is more generous than the connect timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Header carrying the per-user session identifier on cXML sends.
pub const SESSION_ID_HEADER: &str = "Session-ID";

/// Builds a `reqwest::Client` with explicit timeouts.
pub fn build_http_client(connect_timeout: Duration, request_timeout: Duration) -> Result<Client> {
    Ok(Client::builder()
        .connect_timeout(connect_timeout)
        .timeout(request_timeout)
        .build()?)
}

/// A backend response that was accepted (2xx) but not yet decoded.
#[derive(Debug)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: StatusCode,
    /// `Content-Type` header, if any.
    pub content_type: Option<String>,
    /// Response body text.
    pub body: String,
}

impl RawResponse {
    /// True when the declared content type is JSON.
    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("application/json"))
    }
}

/// Client for the backend REST API.
///
/// `base_url` is stored as a `String` so tests can point it at a wiremock
/// server.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    /// Creates a client with the default timeouts.
    pub fn new(base_url: &str) -> Result<Self> {
        BackendClient::with_timeouts(base_url, DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Creates a client with explicit connect and request timeouts.
    pub fn with_timeouts(
        base_url: &str,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self> {
        Ok(BackendClient {
            client: build_http_client(connect_timeout, request_timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The underlying HTTP client, for requests that go straight to a
    /// target site rather than through the backend.
    pub fn http(&self) -> &Client {
        &self.client
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Sends a request and converts non-2xx statuses into `PunchoutError::Api`.
    ///
    /// The body is read as text before the status check so the backend's
    /// error message survives.
    async fn send(&self, request: RequestBuilder) -> Result<RawResponse> {
        let response: Response = request.send().await?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let body = response.text().await?;

        if !status.is_success() {
            log::warn!("backend returned {status}");
            return Err(api_error(status, body));
        }
        Ok(RawResponse {
            status,
            content_type,
            body,
        })
    }

    fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        headers: &[(&str, &str)],
    ) -> RequestBuilder {
        let url = self.url(path);
        log::debug!("{method} {url}");
        let mut req = self.client.request(method, url);
        for (name, value) in headers {
            req = req.header(*name, *value);
        }
        if let Some(payload) = body {
            req = req.json(payload);
        }
        req
    }

    /// Sends a GET request and deserializes the JSON response.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let raw = self
            .send(self.request::<()>(Method::GET, path, None, &[]))
            .await?;
        Ok(serde_json::from_str(&raw.body)?)
    }

    /// Sends a POST request with a JSON body and deserializes the JSON
    /// response.
    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let raw = self.post_raw(path, body, &[]).await?;
        Ok(serde_json::from_str(&raw.body)?)
    }

    /// Sends a POST request with a JSON body and extra headers, returning
    /// the undecoded response.
    pub async fn post_raw<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        headers: &[(&str, &str)],
    ) -> Result<RawResponse> {
        self.send(self.request(Method::POST, path, Some(body), headers))
            .await
    }
}

/// Builds an `Api` error, lifting a readable message out of JSON bodies.
///
/// The backend reports failures either as `{ "message": ... }` or as
/// `{ "error": ..., "details": ... }`.
fn api_error(status: StatusCode, body: String) -> PunchoutError {
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|json| {
            if let Some(message) = json.get("message").and_then(|m| m.as_str()) {
                return Some(message.to_string());
            }
            let parts: Vec<&str> = ["error", "details"]
                .iter()
                .filter_map(|key| json.get(*key).and_then(|v| v.as_str()))
                .collect();
            (!parts.is_empty()).then(|| parts.join(" "))
        })
        .unwrap_or_else(|| body.clone());
    PunchoutError::Api {
        status,
        message,
        body,
    }
}
