//! HttpTransport against a loopback server speaking plain HTTP/1.1.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use datapulse::api::{ApiClient, RequestError};

type Routes = Arc<HashMap<&'static str, (&'static str, &'static str)>>;

/// Serve canned `(status line, body)` pairs keyed by request path, one
/// request per connection.
async fn serve(routes: Routes) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            let routes = routes.clone();
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }
                let head = String::from_utf8_lossy(&buf).to_string();
                let path = head.split_whitespace().nth(1).unwrap_or("/").to_string();
                let (status, body) = routes
                    .get(path.as_str())
                    .copied()
                    .unwrap_or(("404 Not Found", ""));
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });
    addr
}

fn routes() -> Routes {
    let mut map = HashMap::new();
    map.insert(
        "/api/analysis/s1/overview",
        (
            "200 OK",
            r#"{"shape":[2,1],"info":{"memory_usage":512},"head":[{"x":1},{"x":2}]}"#,
        ),
    );
    map.insert(
        "/api/analysis/gone/overview",
        ("404 Not Found", r#"{"detail":"Session not found"}"#),
    );
    map.insert("/api/analysis/s1/stats", ("500 Internal Server Error", ""));
    map.insert("/api/analysis/s1/visualizations", ("200 OK", "{not json"));
    map.insert("/api/settings/has_key/gemini", ("200 OK", r#"{"exists":false}"#));
    map.insert("/explorer/api/settings/has_key/gemini", ("200 OK", r#"{"exists":true}"#));
    map.insert(
        "/api/analysis/x%3Fy%23z/overview",
        ("404 Not Found", r#"{"detail":"Session x?y#z not found"}"#),
    );
    Arc::new(map)
}

#[tokio::test]
async fn decodes_success_over_http() {
    let addr = serve(routes()).await;
    let client = ApiClient::http(&format!("http://{}", addr)).unwrap();

    let overview = client.overview("s1").await.unwrap();
    assert_eq!(overview.shape, (2, 1));
    assert_eq!(overview.head.len(), 2);

    assert!(!client.has_key("gemini").await.unwrap());
}

#[tokio::test]
async fn not_found_carries_detail() {
    let addr = serve(routes()).await;
    let client = ApiClient::http(&format!("http://{}", addr)).unwrap();

    let err = client.overview("gone").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.detail(), Some("Session not found"));
}

#[tokio::test]
async fn empty_error_body_uses_reason_phrase() {
    let addr = serve(routes()).await;
    let client = ApiClient::http(&format!("http://{}", addr)).unwrap();

    let err = client.stats("s1").await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert_eq!(err.to_string(), "Internal Server Error");
}

#[tokio::test]
async fn malformed_success_body_is_parse_failure() {
    let addr = serve(routes()).await;
    let client = ApiClient::http(&format!("http://{}", addr)).unwrap();

    let err = client.visualizations("s1").await.unwrap_err();
    assert!(matches!(err, RequestError::Parse(_)));
}

#[tokio::test]
async fn unreachable_server_is_transport_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let client = ApiClient::http(&format!("http://{}", addr)).unwrap();

    let err = client.list_files().await.unwrap_err();
    assert!(matches!(err, RequestError::Transport(_)));
}

#[tokio::test]
async fn base_path_prefix_is_kept() {
    let addr = serve(routes()).await;
    let client = ApiClient::http(&format!("http://{}/explorer", addr)).unwrap();

    assert!(client.has_key("gemini").await.unwrap());
}

#[tokio::test]
async fn session_id_is_sent_as_one_segment() {
    let addr = serve(routes()).await;
    let client = ApiClient::http(&format!("http://{}", addr)).unwrap();

    let err = client.overview("x?y#z").await.unwrap_err();
    assert_eq!(err.detail(), Some("Session x?y#z not found"));
}
