//! HTTP layer: routes, status codes and headers, driven with `oneshot`.

#![cfg(feature = "server")]

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use common::{launch_error, pdf_bytes, FakeProvider};
use html2pdf_fit::{server, ConversionConfig, Converter, ProviderDescriptor};
use serde_json::{json, Value};
use std::time::Duration;
use tower::ServiceExt;

const BUDGET: Duration = Duration::from_secs(2);

fn app(providers: Vec<ProviderDescriptor>) -> Router {
    let converter =
        Converter::from_providers(&ConversionConfig::default(), providers).expect("converter");
    server::router(converter)
}

fn healthy() -> Router {
    app(vec![
        FakeProvider::failing("local", launch_error()).descriptor(0, BUDGET),
        FakeProvider::succeeding("html2pdf-app").descriptor(10, BUDGET),
    ])
}

fn post_json(body: impl Into<Body>) -> Request<Body> {
    Request::post("/api/html-to-pdf")
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

async fn body_bytes(res: axum::response::Response) -> Vec<u8> {
    to_bytes(res.into_body(), usize::MAX).await.unwrap().to_vec()
}

async fn body_json(res: axum::response::Response) -> Value {
    serde_json::from_slice(&body_bytes(res).await).unwrap()
}

#[tokio::test]
async fn file_response_has_pdf_headers() {
    let res = healthy()
        .oneshot(post_json(
            json!({"html": "<h1>Test</h1>", "filename": "report"}).to_string(),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(
        res.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"report.pdf\""
    );
    assert_eq!(res.headers()["x-pdf-provider"], "html2pdf-app");
    assert_eq!(body_bytes(res).await, pdf_bytes("html2pdf-app"));
}

#[tokio::test]
async fn base64_response_is_json_envelope() {
    let res = healthy()
        .oneshot(post_json(
            json!({"html": "<h1>Test</h1>", "returnType": "base64"}).to_string(),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let v = body_json(res).await;
    assert_eq!(v["success"], true);
    assert_eq!(v["size"], pdf_bytes("html2pdf-app").len());
    assert!(v["pdf"].as_str().unwrap().starts_with("JVBER"));
    assert_eq!(v.as_object().unwrap().len(), 3);
}

#[tokio::test]
async fn missing_html_is_400_and_no_provider_runs() {
    let local = FakeProvider::succeeding("local");
    let router = app(vec![local.descriptor(0, BUDGET)]);

    for body in [r#"{"filename":"x"}"#, r#"{"html":""}"#, ""] {
        let res = router.clone().oneshot(post_json(body)).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "body {body:?}");
        assert_eq!(body_json(res).await, json!({"error": "Missing \"html\" field"}));
    }
    assert_eq!(local.calls(), 0);
}

#[tokio::test]
async fn malformed_body_and_unknown_return_type_are_400() {
    for body in ["{not json", r#"{"html":"<p/>","returnType":"docx"}"#] {
        let res = healthy().oneshot(post_json(body)).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "body {body:?}");
        assert!(body_json(res).await["error"].is_string());
    }
}

#[tokio::test]
async fn exhaustion_is_503_with_attempts() {
    let router = app(vec![
        FakeProvider::hanging("local").descriptor(0, Duration::from_millis(30)),
        FakeProvider::hanging("html2pdf-app").descriptor(10, Duration::from_millis(30)),
    ]);

    let res = router
        .oneshot(post_json(json!({"html": "<p>x</p>"}).to_string()))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    let v = body_json(res).await;
    assert_eq!(v["error"], "PDF generation failed");
    let attempts = v["attempts"].as_array().unwrap();
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[0]["provider"], "local");
    assert_eq!(attempts[1]["kind"], "provider_timeout");
}

#[tokio::test]
async fn health_lists_providers_in_order() {
    let res = healthy()
        .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        body_json(res).await,
        json!({"status": "ok", "viewport": "1024x800", "providers": ["local", "html2pdf-app"]})
    );
}

#[tokio::test]
async fn index_describes_the_service() {
    let res = healthy()
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let v = body_json(res).await;
    assert_eq!(v["name"], "HTML to PDF API");
    assert_eq!(v["viewport"], "1024x800");
    assert!(v["usage"].as_str().unwrap().contains("/api/html-to-pdf"));
}

/// A peer instance reached through the gateway adapter.
#[tokio::test]
async fn gateway_adapter_talks_to_a_peer_instance() {
    use html2pdf_fit::provider::gateway::GatewayProvider;
    use html2pdf_fit::{GatewayConfig, PdfProvider};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, healthy()).await.unwrap() });

    let gateway = GatewayProvider::new(
        GatewayConfig {
            endpoint: format!("http://{addr}/api/html-to-pdf"),
            timeout_secs: 5,
        },
        1024,
        800,
    );
    let pdf = gateway
        .invoke("<h1>via peer</h1>", Duration::from_secs(5))
        .await
        .expect("peer conversion");
    assert_eq!(pdf.bytes, pdf_bytes("html2pdf-app"));
}
