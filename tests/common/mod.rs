//! Shared utilities for integration tests.

use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use devserve::{ListeningServer, ServerConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

pub const INDEX_HTML: &str = "<!doctype html><title>shell</title><div id=app></div>";

/// Temporary served root with an SPA shell and a few assets.
pub fn site() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("index.html"), INDEX_HTML).unwrap();
    fs::write(dir.path().join("app.js"), "console.log('app');").unwrap();
    fs::write(dir.path().join("style.css"), "body { margin: 0; }\n".repeat(64)).unwrap();
    fs::create_dir_all(dir.path().join("docs")).unwrap();
    fs::write(dir.path().join("docs").join("index.html"), "<h1>docs</h1>").unwrap();
    dir
}

/// Config serving `root` on an ephemeral loopback port.
pub fn loopback_config(root: &Path) -> ServerConfig {
    ServerConfig {
        root: root.to_path_buf(),
        hostname: "127.0.0.1".to_string(),
        port: 0,
        silent: true,
        cert_store_path: root.join("ssl").join("devserve.pem"),
        ..ServerConfig::default()
    }
}

/// Start the server and return it once it is accepting.
#[allow(dead_code)]
pub async fn spawn_server(config: ServerConfig) -> ListeningServer {
    devserve::launch(config).await.unwrap()
}

/// Start a backend that answers every request with a JSON echo of the
/// request line and headers.
#[allow(dead_code)]
pub async fn start_echo_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let head = read_head(&mut socket).await;
                        let body = echo_body(&head);
                        let response_str = format!(
                            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Start a backend that always answers with `status` and `body`.
#[allow(dead_code)]
pub async fn start_status_backend(status: u16, body: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let _ = read_head(&mut socket).await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };
                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nX-Upstream: mock\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Read until the end of the request head.
async fn read_head(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// `{"method", "path", "headers": {lowercased name: value}}`.
fn echo_body(head: &str) -> String {
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split(' ');
    let method = request_line.next().unwrap_or_default();
    let path = request_line.next().unwrap_or_default();

    let headers: serde_json::Map<String, serde_json::Value> = lines
        .take_while(|line| !line.is_empty())
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().into()))
        .collect();

    serde_json::json!({ "method": method, "path": path, "headers": headers }).to_string()
}
