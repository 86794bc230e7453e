//! Security posture checks for a supplier site.
//!
//! - [`check_headers`] asks the backend to inspect the target (HTTP headers,
//!   TLS details, CORS, mixed content, iframes, cookies).
//! - [`check_framing`] fetches the target directly and decides whether a
//!   buyer application could embed it in an iframe, which is how many
//!   procurement suites display punchout catalogs.
//!
//! Both operate on the target's origin only; see [`normalize_target`].

use reqwest::header::{CONTENT_SECURITY_POLICY, HeaderMap, X_FRAME_OPTIONS};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::client::BackendClient;
use crate::error::{PunchoutError, Result};

const MISSING_PROTOCOL: &str = "Please enter a valid URL with the HTTP(S) protocol.";
const UNPARSABLE: &str = "Please add the HTTP(S) protocol to the URL.";

/// Validates a user-entered target URL and reduces it to its origin.
///
/// Only `http` and `https` URLs are accepted.
pub fn normalize_target(input: &str) -> Result<String> {
    let input = input.trim();
    if input.is_empty() {
        return Err(PunchoutError::invalid_url(MISSING_PROTOCOL));
    }
    let url = Url::parse(input).map_err(|source| PunchoutError::InvalidUrl {
        message: UNPARSABLE.to_string(),
        source: Some(source),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(PunchoutError::invalid_url(MISSING_PROTOCOL));
    }
    Ok(url.origin().ascii_serialization())
}

#[derive(Debug, Serialize)]
struct HeaderCheckRequest<'a> {
    #[serde(rename = "punchoutURL")]
    punchout_url: &'a str,
}

/// Attributes the backend reports for an iframe found on the target page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IframeAttributes {
    /// `width` attribute.
    #[serde(default)]
    pub width: Option<String>,
    /// `height` attribute.
    #[serde(default)]
    pub height: Option<String>,
    /// `frameborder` attribute.
    #[serde(default)]
    pub frameborder: Option<String>,
}

/// An iframe found on the target page.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IframeInfo {
    /// Frame source URL.
    #[serde(default)]
    pub src: String,
    /// Whether `src` is served over HTTPS.
    #[serde(default)]
    pub is_secure: bool,
    /// Size and border attributes.
    #[serde(default)]
    pub attributes: IframeAttributes,
}

/// CORS section of the report; only `status` is displayed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CorsInfo {
    /// Free-form CORS verdict.
    #[serde(default)]
    pub status: Value,
}

/// The backend's inspection report for a target origin.
///
/// Sections the backend produces in free form stay as JSON values and are
/// shown through [`crate::render`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderReport {
    /// Response headers of the target.
    #[serde(default)]
    pub http_headers: Value,
    /// Certificate and protocol details.
    #[serde(default)]
    pub ssl_tls_info: Value,
    /// CORS headers summary.
    #[serde(default)]
    pub cors_info: CorsInfo,
    /// HTTP resources loaded by an HTTPS page.
    #[serde(default)]
    pub mixed_content: Value,
    /// Iframes embedded in the target page.
    #[serde(default)]
    pub iframes: Vec<IframeInfo>,
    /// Cookies and their `SameSite` attributes.
    #[serde(default)]
    pub same_site_cookies: Value,
    /// `X-Frame-Options` as reported by the backend.
    #[serde(default)]
    pub x_frame_options: Value,
}

/// Asks the backend to inspect `target` (any URL; only its origin is sent).
///
/// # Errors
///
/// - `PunchoutError::InvalidUrl`: `target` is not an http(s) URL.
/// - `PunchoutError::Api`: the backend failed; its `error` and `details`
///   fields are surfaced.
/// - `PunchoutError::Backend`: the backend answered with something other
///   than JSON.
pub async fn check_headers(client: &BackendClient, target: &str) -> Result<HeaderReport> {
    let origin = normalize_target(target)?;
    let raw = client
        .post_raw(
            "api/check-headers",
            &HeaderCheckRequest {
                punchout_url: &origin,
            },
            &[],
        )
        .await?;
    if !raw.is_json() {
        return Err(PunchoutError::Backend(
            "Data sent, but the response is not JSON.".to_string(),
        ));
    }
    Ok(serde_json::from_str(&raw.body)?)
}

/// Whether a site can be shown inside a third-party iframe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FramingVerdict {
    /// The origin that was fetched.
    pub origin: String,
    /// `X-Frame-Options` header value.
    pub x_frame_options: Option<String>,
    /// Value of the CSP `frame-ancestors` directive.
    pub frame_ancestors: Option<String>,
    /// True unless a header forbids third-party framing.
    pub embeddable: bool,
}

impl FramingVerdict {
    /// Decides embeddability from response headers.
    ///
    /// Embedding is blocked by `X-Frame-Options: DENY | SAMEORIGIN` or by a
    /// CSP `frame-ancestors` directive other than `*`.
    pub fn from_headers(origin: String, headers: &HeaderMap) -> Self {
        let x_frame_options = headers
            .get(X_FRAME_OPTIONS)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_string());
        let frame_ancestors = headers
            .get_all(CONTENT_SECURITY_POLICY)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|policy| policy.split(';'))
            .map(str::trim)
            .find_map(|directive| {
                let mut parts = directive.splitn(2, char::is_whitespace);
                let name = parts.next()?;
                name.eq_ignore_ascii_case("frame-ancestors")
                    .then(|| parts.next().unwrap_or("").trim().to_string())
            });

        let blocked_by_xfo = x_frame_options.as_deref().is_some_and(|v| {
            v.eq_ignore_ascii_case("deny") || v.eq_ignore_ascii_case("sameorigin")
        });
        let blocked_by_csp = frame_ancestors.as_deref().is_some_and(|v| v != "*");

        FramingVerdict {
            origin,
            x_frame_options,
            frame_ancestors,
            embeddable: !blocked_by_xfo && !blocked_by_csp,
        }
    }
}

/// Fetches the target's origin directly and reports its framing policy.
pub async fn check_framing(client: &BackendClient, target: &str) -> Result<FramingVerdict> {
    let origin = normalize_target(target)?;
    log::debug!("checking framing policy of {origin}");
    let response = client.http().get(&origin).send().await?;
    Ok(FramingVerdict::from_headers(origin, response.headers()))
}
