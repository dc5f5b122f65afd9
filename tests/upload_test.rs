use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use bytes::Bytes;
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tower::ServiceExt;
use upload_timing_server::config::ServerConfig;
use upload_timing_server::{AppState, create_app};

const BOUNDARY: &str = "---------------------------123456789012345678901234567";
const API_KEY: &str = "secret_value";

fn app_with_limit(max_file_bytes: usize) -> Router {
    let _ = tracing_subscriber::fmt::try_init();
    create_app(AppState::new(ServerConfig {
        api_key: Some(API_KEY.to_string()),
        max_file_bytes,
        ..ServerConfig::default()
    }))
}

fn file_part_header(filename: &str) -> String {
    format!(
        "--{boundary}\r\n\
        Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
        Content-Type: application/octet-stream\r\n\r\n",
        boundary = BOUNDARY,
        filename = filename
    )
}

fn multipart_body(filename: &str, content: &[u8]) -> Vec<u8> {
    let mut body = file_part_header(filename).into_bytes();
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn upload_request(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/upload")
        .header("x-api-key", API_KEY)
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(body.into())
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body)
        .unwrap_or_else(|_| panic!("non-JSON body: {}", String::from_utf8_lossy(&body)));
    (status, json)
}

#[tokio::test]
async fn test_upload_ten_byte_file() {
    let app = app_with_limit(1024);
    let (status, json) = send(app, upload_request(multipart_body("t.txt", b"0123456789"))).await;

    assert_eq!(status, StatusCode::OK, "body: {}", json);
    assert_eq!(json["ok"], true);
    assert_eq!(json["filename"], "t.txt");
    assert_eq!(json["size"], 10);

    let received = json["serverReceivedAt"].as_i64().unwrap();
    let processed = json["serverProcessedAt"].as_i64().unwrap();
    let processing = json["serverProcessingMs"].as_i64().unwrap();
    assert!(processing >= 0);
    assert_eq!(processing, processed - received);
    assert!(json.get("error").is_none());
}

#[tokio::test]
async fn test_file_exactly_at_limit_succeeds() {
    let app = app_with_limit(64);
    let (status, json) = send(app, upload_request(multipart_body("edge.bin", &[7u8; 64]))).await;

    assert_eq!(status, StatusCode::OK, "body: {}", json);
    assert_eq!(json["size"], 64);
}

#[tokio::test]
async fn test_file_one_byte_over_limit_rejected() {
    let app = app_with_limit(64);
    let (status, json) = send(app, upload_request(multipart_body("edge.bin", &[7u8; 65]))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["ok"], false);
    assert!(
        json["error"].as_str().unwrap().contains("maxFileSize exceeded"),
        "body: {}",
        json
    );
    assert!(json.get("serverReceivedAt").is_none());
}

#[tokio::test]
async fn test_endless_upload_is_cut_off_at_limit() {
    let limit = 1024;
    let app = app_with_limit(limit);

    let pulled = Arc::new(AtomicUsize::new(0));
    let counter = pulled.clone();
    let head = file_part_header("endless.bin");
    let chunks = futures::stream::unfold(0u64, move |n| {
        let counter = counter.clone();
        let head = head.clone();
        async move {
            // hand control back between chunks like a socket would
            tokio::task::yield_now().await;
            let chunk = if n == 0 {
                Bytes::from(head)
            } else {
                Bytes::from(vec![b'a'; 512])
            };
            counter.fetch_add(chunk.len(), Ordering::SeqCst);
            Some((Ok::<Bytes, std::io::Error>(chunk), n + 1))
        }
    });

    let request = upload_request(Body::from_stream(chunks));
    let (status, json) = tokio::time::timeout(Duration::from_secs(10), send(app, request))
        .await
        .expect("ingestion did not stop at the limit");

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["ok"], false);
    assert!(
        pulled.load(Ordering::SeqCst) < 64 * 1024,
        "pulled {} bytes before aborting",
        pulled.load(Ordering::SeqCst)
    );
}

#[tokio::test]
async fn test_form_without_file_field() {
    let app = app_with_limit(1024);
    let body = format!(
        "--{boundary}\r\n\
        Content-Disposition: form-data; name=\"note\"\r\n\r\n\
        hello\r\n\
        --{boundary}--\r\n",
        boundary = BOUNDARY
    );
    let (status, json) = send(app, upload_request(body)).await;

    assert_eq!(status, StatusCode::OK, "body: {}", json);
    assert!(json["filename"].is_null());
    assert_eq!(json["size"], 0);
    assert!(json["serverProcessingMs"].as_i64().unwrap() >= 0);
}

#[tokio::test]
async fn test_other_fields_do_not_count() {
    let app = app_with_limit(1024);
    let mut body = format!(
        "--{boundary}\r\n\
        Content-Disposition: form-data; name=\"meta\"\r\n\r\n\
        {padding}\r\n",
        boundary = BOUNDARY,
        padding = "x".repeat(300)
    )
    .into_bytes();
    body.extend(multipart_body("small.txt", b"abc"));

    let (status, json) = send(app, upload_request(body)).await;
    assert_eq!(status, StatusCode::OK, "body: {}", json);
    assert_eq!(json["size"], 3);
    assert_eq!(json["filename"], "small.txt");
}

#[tokio::test]
async fn test_not_multipart_is_malformed() {
    let app = app_with_limit(1024);
    let request = Request::builder()
        .method("POST")
        .uri("/upload")
        .header("x-api-key", API_KEY)
        .header("Content-Type", "text/plain")
        .body(Body::from("just text"))
        .unwrap();
    let (status, json) = send(app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["ok"], false);
    assert!(!json["error"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_truncated_multipart_is_malformed() {
    let app = app_with_limit(1024);
    let mut body = file_part_header("cut.txt").into_bytes();
    body.extend_from_slice(b"no closing boundary");
    let (status, json) = send(app, upload_request(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["ok"], false);
}

#[tokio::test]
async fn test_get_is_method_not_allowed() {
    let app = app_with_limit(1024);
    let request = Request::builder()
        .method("GET")
        .uri("/upload")
        .header("x-api-key", API_KEY)
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers()[header::ALLOW], "POST");
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["ok"], false);
    assert_eq!(json["error"], "Method not allowed");
}

#[tokio::test]
async fn test_put_never_reads_the_body() {
    // Oversized and not even multipart: a POST would fail ingestion, a PUT must not get that far
    let app = app_with_limit(8);
    let request = Request::builder()
        .method("PUT")
        .uri("/upload")
        .header("x-api-key", API_KEY)
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body("big.bin", &[1u8; 4096])))
        .unwrap();
    let (status, json) = send(app, request).await;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(json["error"], "Method not allowed");
}
