//! Integration tests for supplier site inspection using wiremock.
//!
//! - POST /api/check-headers: check_headers (through the backend)
//! - GET {origin}/: check_framing (direct to the target)

use punchout_tester::client::BackendClient;
use punchout_tester::error::PunchoutError;
use punchout_tester::inspect::{check_framing, check_headers};
use punchout_tester::roundtrip::visitor_count;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn mock_client(server: &MockServer) -> BackendClient {
    BackendClient::new(&server.uri()).expect("client should build")
}

// ── check_headers ──────────────────────────────────────────────────────

#[tokio::test]
async fn header_check_sends_only_the_origin() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    Mock::given(method("POST"))
        .and(path("/api/check-headers"))
        .and(body_json(json!({ "punchoutURL": "https://supplier.test" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "httpHeaders": { "strict-transport-security": "max-age=31536000" },
            "sslTlsInfo": { "protocol": "TLSv1.3" },
            "corsInfo": { "status": "No CORS headers" },
            "mixedContent": [],
            "iframes": [
                { "src": "http://ads.test/frame", "isSecure": false, "attributes": { "width": "300" } }
            ],
            "sameSiteCookies": [],
            "xFrameOptions": "DENY"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let report = check_headers(&client, "https://supplier.test/punchout?sid=1")
        .await
        .unwrap();
    assert_eq!(report.ssl_tls_info["protocol"], "TLSv1.3");
    assert_eq!(report.cors_info.status, "No CORS headers");
    assert_eq!(report.x_frame_options, "DENY");
    assert_eq!(report.iframes.len(), 1);
    assert!(!report.iframes[0].is_secure);
}

#[tokio::test]
async fn header_check_rejects_non_json_answers() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    Mock::given(method("POST"))
        .and(path("/api/check-headers"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .mount(&server)
        .await;

    let err = check_headers(&client, "https://supplier.test")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Data sent, but the response is not JSON.");
}

#[tokio::test]
async fn header_check_validates_target_before_sending() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = check_headers(&client, "supplier.test").await.unwrap_err();
    assert!(matches!(err, PunchoutError::InvalidUrl { .. }));
}

// ── check_framing ──────────────────────────────────────────────────────

#[tokio::test]
async fn framing_check_reads_target_headers() {
    let backend = MockServer::start().await;
    let target = MockServer::start().await;
    let client = mock_client(&backend);

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-frame-options", "SAMEORIGIN")
                .set_body_string("<html></html>"),
        )
        .expect(1)
        .mount(&target)
        .await;

    let verdict = check_framing(&client, &format!("{}/catalog", target.uri()))
        .await
        .unwrap();
    assert_eq!(verdict.origin, target.uri());
    assert_eq!(verdict.x_frame_options.as_deref(), Some("SAMEORIGIN"));
    assert!(!verdict.embeddable);
}

// ── visitor_count ──────────────────────────────────────────────────────

#[tokio::test]
async fn visitor_count_reads_counter() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    Mock::given(method("GET"))
        .and(path("/api/visitor-count"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "count": 1234 })))
        .mount(&server)
        .await;

    assert_eq!(visitor_count(&client).await.unwrap(), 1234);
}
