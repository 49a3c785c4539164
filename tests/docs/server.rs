//! Server behavior around the routed handlers.

use std::time::Duration;

use routedoc::{Router, response, server};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use super::{get, json_body, local_config, raw_request};

async fn start_test_server() -> server::Server {
    let mut router = Router::new();
    router.post("/echo", |ctx| async move {
        let input: serde_json::Value = ctx.json()?;
        response::ok(&serde_json::json!({ "echoed": input }))
    });
    router.get("/ping", |_ctx| async move {
        response::ok(&serde_json::json!({ "pong": true }))
    });

    server::start(&local_config(), router.into_handle())
        .await
        .expect("failed to start test server")
}

/// Bodies declaring more than the limit are rejected from the header alone.
#[tokio::test]
async fn server_rejects_oversized_body() {
    let server = start_test_server().await;

    let response = raw_request(
        server.addr(),
        b"POST /echo HTTP/1.1\r\nHost: localhost\r\nContent-Length: 10485760\r\nConnection: close\r\n\r\n",
    )
    .await;
    server.shutdown().await.unwrap();

    assert!(response.starts_with("HTTP/1.1 413"), "got:\n{response}");
}

#[tokio::test]
async fn server_reports_unknown_paths_and_methods() {
    let server = start_test_server().await;
    let addr = server.addr();

    let missing = get(addr, "/nowhere").await;
    let wrong_method = get(addr, "/echo").await;
    server.shutdown().await.unwrap();

    assert!(missing.starts_with("HTTP/1.1 404"), "got:\n{missing}");
    assert_eq!(json_body(&missing).1["error"], "Not found");
    assert!(wrong_method.starts_with("HTTP/1.1 405"), "got:\n{wrong_method}");
}

/// Malformed JSON is a client error, not a server error.
#[tokio::test]
async fn server_rejects_malformed_json() {
    let server = start_test_server().await;

    let response = raw_request(
        server.addr(),
        b"POST /echo HTTP/1.1\r\nHost: localhost\r\nContent-Length: 5\r\nConnection: close\r\n\r\n{nope",
    )
    .await;
    server.shutdown().await.unwrap();

    assert!(response.starts_with("HTTP/1.1 400"), "got:\n{response}");
}

/// Connections that never finish their headers are closed.
#[tokio::test]
async fn server_closes_slow_connections() {
    let server = start_test_server().await;

    let mut stream = TcpStream::connect(server.addr()).await.unwrap();
    stream
        .write_all(b"GET /ping HTTP/1.1\r\nHost: localhost\r\n")
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(3)).await;

    let mut buf = vec![0u8; 4096];
    let result = tokio::time::timeout(Duration::from_secs(2), stream.read(&mut buf)).await;
    server.shutdown().await.unwrap();

    match result {
        Ok(Ok(0)) | Ok(Err(_)) => {}
        Ok(Ok(n)) => {
            let resp = String::from_utf8_lossy(&buf[..n]);
            assert!(resp.contains("408"), "Expected close or 408, got:\n{resp}");
        }
        Err(_) => panic!("connection still open after header read timeout"),
    }
}

/// After shutdown the listener stops accepting.
#[tokio::test]
async fn server_shutdown_stops_accepting() {
    let server = start_test_server().await;
    let addr = server.addr();

    let before = get(addr, "/ping").await;
    assert!(before.starts_with("HTTP/1.1 200"), "got:\n{before}");

    server.shutdown().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(TcpStream::connect(addr).await.is_err());
}
