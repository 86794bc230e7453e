//! Send actions: starting OCI and cXML punchout sessions through the backend.
//!
//! - OCI: the structured [`OciConfig`] is posted to `/api/oci-roundtrip`;
//!   the backend answers with the supplier URL to open.
//! - cXML: the setup request document is posted to `/api/cxml-punchout`
//!   together with the supplier URL; the backend relays the supplier's
//!   `PunchOutSetupResponse` as text, from which the start page is taken.

use serde::{Deserialize, Serialize};

use crate::client::{BackendClient, SESSION_ID_HEADER};
use crate::cxml::{SetupRequestForm, extract_start_page_url};
use crate::error::{PunchoutError, Result};
use crate::oci::OciConfig;

/// Response of the OCI round-trip endpoint.
#[derive(Debug, Deserialize)]
pub struct OciRoundtripResponse {
    /// Whether the backend reached the supplier.
    #[serde(default)]
    pub success: bool,
    /// Supplier URL of the started session.
    #[serde(rename = "OciPunchoutURL", default)]
    pub oci_punchout_url: Option<String>,
}

/// Body of the cXML punchout endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CxmlPunchoutRequest<'a> {
    /// The setup request document.
    pub cxml_payload: &'a str,
    /// Supplier setup endpoint.
    pub supplier_url: &'a str,
}

#[derive(Debug, Deserialize)]
struct VisitorCount {
    count: u64,
}

/// Starts an OCI punchout and returns the URL of the supplier session.
///
/// # Errors
///
/// - `PunchoutError::Validation`: the base URL is empty.
/// - `PunchoutError::Api`: the backend rejected the request; its
///   `message` field is surfaced.
/// - `PunchoutError::Backend`: the backend answered without a URL.
pub async fn send_oci_roundtrip(client: &BackendClient, config: &OciConfig) -> Result<String> {
    if config.base_url.is_empty() {
        return Err(PunchoutError::Validation(
            "Please enter a valid URL with the HTTP(S) protocol.".to_string(),
        ));
    }

    let response: OciRoundtripResponse = client.post("api/oci-roundtrip", config).await?;
    match response.oci_punchout_url {
        Some(url) if response.success && !url.is_empty() => {
            log::info!("OCI punchout session ready");
            Ok(url)
        }
        _ => Err(PunchoutError::Backend(
            "The Punchout URL was not retrieved!".to_string(),
        )),
    }
}

/// Sends a cXML setup request and returns the supplier's start-page URL.
///
/// `payload` is sent as-is; it is usually `form.to_payload()` but may have
/// been edited by hand. The supplier URL comes from the form.
///
/// # Errors
///
/// - `PunchoutError::Validation`: supplier URL or payload is empty.
/// - `PunchoutError::Api`: the backend answered with a non-success status.
/// - `PunchoutError::Backend`: the response carried no `<URL>`.
pub async fn send_cxml_punchout(
    client: &BackendClient,
    form: &SetupRequestForm,
    payload: &str,
    session_id: &str,
) -> Result<String> {
    let supplier_url = form.supplier_url.trim();
    if supplier_url.is_empty() {
        return Err(PunchoutError::Validation(
            "Please enter Supplier URL".to_string(),
        ));
    }
    if payload.trim().is_empty() {
        return Err(PunchoutError::Validation(
            "cXML Payload is missing".to_string(),
        ));
    }

    let body = CxmlPunchoutRequest {
        cxml_payload: payload,
        supplier_url,
    };
    let raw = client
        .post_raw(
            "api/cxml-punchout",
            &body,
            &[(SESSION_ID_HEADER, session_id)],
        )
        .await?;

    extract_start_page_url(&raw.body).ok_or_else(|| {
        log::warn!("setup response from {supplier_url} had no <URL> element");
        PunchoutError::Backend("No response received from the punchout endpoint".to_string())
    })
}

/// Number of visitors recorded by the backend.
pub async fn visitor_count(client: &BackendClient) -> Result<u64> {
    let count: VisitorCount = client.get("api/visitor-count").await?;
    Ok(count.count)
}
