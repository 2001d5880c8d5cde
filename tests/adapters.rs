//! Remote adapters against in-process stub backends on 127.0.0.1:0.

use axum::body::Bytes;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use html2pdf_fit::provider::gateway::GatewayProvider;
use html2pdf_fit::provider::html2pdf_app::Html2PdfAppProvider;
use html2pdf_fit::{AttemptError, GatewayConfig, PdfProvider, RemoteProviderConfig};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

const PDF: &[u8] = b"%PDF-1.7\n%stub\n%%EOF\n";

/// Serve `router` on an ephemeral port for the rest of the test.
async fn spawn(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

fn app_provider(addr: SocketAddr) -> Html2PdfAppProvider {
    Html2PdfAppProvider::new(
        RemoteProviderConfig {
            endpoint: format!("http://{addr}/v1/generate"),
            api_key: Some("test-key".into()),
            ..RemoteProviderConfig::default()
        },
        1024,
        800,
    )
}

fn gateway_provider(addr: SocketAddr) -> GatewayProvider {
    GatewayProvider::new(
        GatewayConfig {
            endpoint: format!("http://{addr}/api/html-to-pdf"),
            timeout_secs: 5,
        },
        1024,
        800,
    )
}

// ── html2pdf.app ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn html2pdf_app_success_returns_raw_body() {
    let seen: Arc<Mutex<Option<Value>>> = Arc::default();
    let sink = seen.clone();
    let addr = spawn(Router::new().route(
        "/v1/generate",
        post(move |Json(body): Json<Value>| async move {
            *sink.lock().unwrap() = Some(body);
            PDF
        }),
    ))
    .await;

    let pdf = assert_ok!(app_provider(addr).invoke("<h1>x</h1>", Duration::from_secs(5)).await);
    assert_eq!(pdf.bytes, PDF);
    assert_eq!(pdf.content_height_px, None);

    let body = seen.lock().unwrap().take().unwrap();
    assert_eq!(body["html"], "<h1>x</h1>");
    assert_eq!(body["apiKey"], "test-key");
    assert_eq!(body["options"]["width"], "1024px");
}

#[tokio::test]
async fn html2pdf_app_non_200_is_an_http_failure() {
    let addr = spawn(Router::new().route(
        "/v1/generate",
        post(|| async { (StatusCode::PAYMENT_REQUIRED, "quota exceeded") }),
    ))
    .await;

    let err = assert_err!(app_provider(addr).invoke("<p/>", Duration::from_secs(5)).await);
    assert_eq!(
        err,
        AttemptError::ProviderHttp {
            status: 402,
            body: "quota exceeded".into()
        }
    );
}

#[tokio::test]
async fn html2pdf_app_slow_backend_times_out() {
    let addr = spawn(Router::new().route(
        "/v1/generate",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            PDF
        }),
    ))
    .await;

    let err = assert_err!(
        app_provider(addr)
            .invoke("<p/>", Duration::from_millis(100))
            .await
    );
    assert!(matches!(err, AttemptError::ProviderTimeout { .. }), "{err:?}");
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_failure() {
    // Bind then drop so nothing listens on the port.
    let addr = {
        let l = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        l.local_addr().unwrap()
    };
    let err = assert_err!(app_provider(addr).invoke("<p/>", Duration::from_secs(2)).await);
    assert!(matches!(err, AttemptError::ProviderTransport(_)), "{err:?}");
}

// ── JSON gateway ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn gateway_round_trips_base64() {
    let addr = spawn(Router::new().route(
        "/api/html-to-pdf",
        post(|Json(body): Json<Value>| async move {
            use base64::{engine::general_purpose::STANDARD, Engine as _};
            let html = STANDARD
                .decode(body["html_base64"].as_str().unwrap_or_default())
                .unwrap_or_default();
            assert_eq!(html, b"<h1>gw</h1>");
            Json(json!({"success": true, "pdf": STANDARD.encode(PDF)}))
        }),
    ))
    .await;

    let pdf = assert_ok!(
        gateway_provider(addr)
            .invoke("<h1>gw</h1>", Duration::from_secs(5))
            .await
    );
    assert_eq!(pdf.bytes, PDF);
}

#[tokio::test]
async fn gateway_success_false_is_a_failure_even_with_200() {
    let addr = spawn(Router::new().route(
        "/api/html-to-pdf",
        post(|| async { Json(json!({"success": false, "error": "renderer crashed"})) }),
    ))
    .await;

    let err = assert_err!(gateway_provider(addr).invoke("<p/>", Duration::from_secs(5)).await);
    assert_eq!(
        err,
        AttemptError::ProviderHttp {
            status: 200,
            body: "renderer crashed".into()
        }
    );
}

#[tokio::test]
async fn gateway_garbage_body_is_a_transport_failure() {
    let addr = spawn(Router::new().route(
        "/api/html-to-pdf",
        post(|_body: Bytes| async { "<html>not json</html>".into_response() }),
    ))
    .await;

    let err = assert_err!(gateway_provider(addr).invoke("<p/>", Duration::from_secs(5)).await);
    assert!(matches!(err, AttemptError::ProviderTransport(_)), "{err:?}");
}
