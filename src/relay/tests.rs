use super::*;
use crate::utils::test_utils::serve_once;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

fn post(path: &str, body: &str) -> HttpRequest {
    HttpRequest {
        method: "POST".to_string(),
        path: path.to_string(),
        headers: vec![("Content-Type".to_string(), "application/json".to_string())],
        body: body.as_bytes().to_vec(),
    }
}

fn get(path: &str) -> HttpRequest {
    HttpRequest {
        method: "GET".to_string(),
        path: path.to_string(),
        headers: Vec::new(),
        body: Vec::new(),
    }
}

fn forwarder(url: &str) -> LogForwarder {
    LogForwarder::new(url, Some(std::time::Duration::from_secs(5))).unwrap()
}

/// A URL nothing is listening on.
async fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{address}/analyze")
}

#[tokio::test]
async fn upload_forwards_batch_unmodified_and_relays_reply() {
    let (url, downstream) =
        serve_once(200, r#"{"summary":"disk full","anomalies":[{"line":2}]}"#).await;
    let forwarder = forwarder(&format!("{url}/analyze"));

    let response = route(
        &forwarder,
        &post("/logs/upload", r#"{"logs":["ERROR disk full","WARN retrying"]}"#),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.body_json().unwrap(),
        serde_json::json!({"summary": "disk full", "anomalies": [{"line": 2}]})
    );

    let sent = downstream.await.unwrap();
    assert_eq!(sent.method, "POST");
    assert_eq!(sent.path, "/analyze");
    let forwarded: Value = serde_json::from_slice(&sent.body).unwrap();
    assert_eq!(
        forwarded,
        serde_json::json!({"logs": ["ERROR disk full", "WARN retrying"]})
    );
}

#[tokio::test]
async fn empty_batch_is_still_forwarded() {
    let (url, downstream) = serve_once(200, r#"{"ok":true}"#).await;
    let forwarder = forwarder(&url);

    let response = route(&forwarder, &post("/logs/upload", r#"{"logs":[]}"#)).await;
    assert_eq!(response.status, StatusCode::OK);
    let sent = downstream.await.unwrap();
    assert_eq!(sent.body, br#"{"logs":[]}"#);
}

#[tokio::test]
async fn unreachable_downstream_is_a_500_with_fixed_detail() {
    let forwarder = forwarder(&dead_url().await);
    let response = route(&forwarder, &post("/logs/upload", r#"{"logs":["x"]}"#)).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.body_json().unwrap(),
        serde_json::json!({"detail": "Failed to reach analysis service"})
    );
}

#[tokio::test]
async fn downstream_status_is_propagated() {
    let (url, _downstream) = serve_once(503, r#"{"detail":"model loading"}"#).await;
    let forwarder = forwarder(&url);
    let response = route(&forwarder, &post("/logs/upload", r#"{"logs":["x"]}"#)).await;

    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        response.body_json().unwrap(),
        serde_json::json!({"detail": "Analysis service returned an error"})
    );
}

#[tokio::test]
async fn non_json_downstream_reply_is_a_500() {
    let (url, _downstream) = serve_once(200, "<html>ok</html>").await;
    let forwarder = forwarder(&url);
    let response = route(&forwarder, &post("/logs/upload", r#"{"logs":["x"]}"#)).await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn malformed_upload_bodies_are_rejected_without_forwarding() {
    // No downstream exists; reaching it would produce a 500 instead.
    let forwarder = forwarder(&dead_url().await);
    for body in [
        "not json",
        r#"{"entries":["x"]}"#,
        r#"{"logs":"x"}"#,
        r#"{"logs":[1,2]}"#,
    ] {
        let response = route(&forwarder, &post("/logs/upload", body)).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "body: {body}");
        assert_eq!(
            response.body_json().unwrap()["detail"],
            "Invalid request format"
        );
    }
}

#[tokio::test]
async fn health_and_unknown_routes() {
    let forwarder = forwarder("http://127.0.0.1:9/analyze");

    let health = route(&forwarder, &get("/health")).await;
    assert_eq!(health.status, StatusCode::OK);
    let body = health.body_json().unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["downstream"], "http://127.0.0.1:9/analyze");
    assert!(body["timestamp"].as_str().is_some());

    assert_eq!(
        route(&forwarder, &get("/logs/upload")).await.status,
        StatusCode::METHOD_NOT_ALLOWED
    );
    assert_eq!(
        route(&forwarder, &get("/analyze")).await.status,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn serve_answers_over_tcp() {
    let (url, _downstream) = serve_once(200, r#"{"summary":"ok"}"#).await;
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let server = tokio::spawn(serve(listener, Arc::new(forwarder(&url))));

    let body = r#"{"logs":["INFO boot"]}"#;
    let mut stream = TcpStream::connect(address).await.unwrap();
    let request = format!(
        "POST /logs/upload HTTP/1.1\r\nHost: relay\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = String::new();
    stream.read_to_string(&mut raw).await.unwrap();
    assert!(raw.starts_with("HTTP/1.1 200 OK\r\n"), "got: {raw}");
    assert!(raw.ends_with(r#"{"summary":"ok"}"#));

    server.abort();
}
