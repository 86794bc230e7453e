//! Integration tests for starting OCI punchouts using wiremock.
//!
//! The backend is mocked to verify that the structured configuration built
//! by an `OciSession` reaches `POST /api/oci-roundtrip` in the expected
//! shape, and that backend answers are mapped onto the right errors.

use punchout_tester::client::BackendClient;
use punchout_tester::error::PunchoutError;
use punchout_tester::oci::{OciConfig, OciField, ParamField};
use punchout_tester::roundtrip::send_oci_roundtrip;
use punchout_tester::session::{OciSession, SyncTiming};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn mock_client(server: &MockServer) -> BackendClient {
    BackendClient::new(&server.uri()).expect("client should build")
}

fn edited_config() -> OciConfig {
    let session = OciSession::new(SyncTiming::default());
    session.set_field(
        OciField::BaseUrl,
        "https://supplier.test/oci?USERNAME=buyer&lang=EN",
    );
    session.flush();
    session.set_field(OciField::Password, "pw");
    session.set_field(OciField::HookUrl, "https://backend.test/api/oci-data");
    session.add_custom_param();
    session.set_custom_param(1, ParamField::Key, "catalog");
    session.set_custom_param(1, ParamField::Value, "office");
    session.flush();
    session.close()
}

// ── session output ─────────────────────────────────────────────────────

#[tokio::test]
async fn session_produces_canonical_url_and_fields() {
    let config = edited_config();

    assert_eq!(config.username, "buyer");
    assert_eq!(config.password, "pw");
    assert_eq!(
        config.base_url,
        "https://supplier.test/oci?username=buyer&password=pw\
         &hook_url=https%3A%2F%2Fbackend.test%2Fapi%2Foci-data&lang=EN&catalog=office"
    );
    let keys: Vec<&str> = config
        .custom_params
        .iter()
        .map(|row| row.key.as_str())
        .collect();
    assert_eq!(keys, ["lang", "catalog"]);
}

// ── send_oci_roundtrip ─────────────────────────────────────────────────

#[tokio::test]
async fn roundtrip_posts_config_and_returns_supplier_url() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    Mock::given(method("POST"))
        .and(path("/api/oci-roundtrip"))
        .and(body_partial_json(json!({
            "username": "buyer",
            "password": "pw",
            "hookURL": "https://backend.test/api/oci-data",
            "customParams": [
                { "key": "lang", "value": "EN" },
                { "key": "catalog", "value": "office" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "OciPunchoutURL": "https://supplier.test/session/abc"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let url = send_oci_roundtrip(&client, &edited_config()).await.unwrap();
    assert_eq!(url, "https://supplier.test/session/abc");
}

#[tokio::test]
async fn roundtrip_without_url_is_a_backend_error() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    Mock::given(method("POST"))
        .and(path("/api/oci-roundtrip"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": false })))
        .mount(&server)
        .await;

    let err = send_oci_roundtrip(&client, &edited_config())
        .await
        .unwrap_err();
    assert!(matches!(err, PunchoutError::Backend(_)));
    assert_eq!(err.to_string(), "The Punchout URL was not retrieved!");
}

#[tokio::test]
async fn roundtrip_surfaces_backend_message_on_failure() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    Mock::given(method("POST"))
        .and(path("/api/oci-roundtrip"))
        .respond_with(
            ResponseTemplate::new(502).set_body_json(json!({ "message": "Supplier unreachable" })),
        )
        .mount(&server)
        .await;

    let err = send_oci_roundtrip(&client, &edited_config())
        .await
        .unwrap_err();
    match err {
        PunchoutError::Api {
            status, message, ..
        } => {
            assert_eq!(status.as_u16(), 502);
            assert_eq!(message, "Supplier unreachable");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn roundtrip_with_empty_base_url_never_calls_backend() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = send_oci_roundtrip(&client, &OciConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, PunchoutError::Validation(_)));
}
