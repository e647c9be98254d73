//! Canned HTTP responder for exercising the API surface in tests.
//!
//! Serves a scripted sequence of responses over a local TCP listener and
//! records every request it saw, so tests can assert on paths, headers,
//! and bodies without a live backend.

use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// One recorded HTTP request.
#[derive(Debug, Clone)]
pub(crate) struct StubRequest {
    /// The request line, e.g. `GET /health HTTP/1.1`.
    pub(crate) line: String,
    /// The raw header block. Header names arrive lowercased on the wire.
    pub(crate) headers: String,
    /// The body as (lossy) text.
    pub(crate) body: String,
    /// The body bytes as received.
    pub(crate) raw_body: Vec<u8>,
}

/// A local listener that answers each connection with the next scripted
/// `(status, body)` pair.
pub(crate) struct StubServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<StubRequest>>>,
}

impl StubServer {
    pub(crate) async fn start(responses: Vec<(u16, String)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub listener");
        let addr = listener.local_addr().expect("stub listener address");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = requests.clone();

        tokio::spawn(async move {
            let mut script = responses.into_iter();
            while let Ok((mut stream, _)) = listener.accept().await {
                let Some((status, body)) = script.next() else {
                    break;
                };
                let request = read_request(&mut stream).await;
                recorded.lock().push(request);

                let response = format!(
                    "HTTP/1.1 {} {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status,
                    reason(status),
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        Self { addr, requests }
    }

    pub(crate) fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub(crate) fn requests(&self) -> Vec<StubRequest> {
        self.requests.lock().clone()
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        409 => "Conflict",
        422 => "Unprocessable Entity",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

async fn read_request(stream: &mut TcpStream) -> StubRequest {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    let header_end = loop {
        if let Some(pos) = find_header_end(&buf) {
            break pos;
        }
        let n = stream.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break find_header_end(&buf).unwrap_or(buf.len());
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut head_lines = head.lines();
    let line = head_lines.next().unwrap_or_default().to_string();
    let headers = head_lines.collect::<Vec<_>>().join("\r\n");

    let content_length = headers
        .lines()
        .find_map(|l| {
            l.to_ascii_lowercase()
                .strip_prefix("content-length:")
                .and_then(|v| v.trim().parse::<usize>().ok())
        })
        .unwrap_or(0);

    let body_start = (header_end + 4).min(buf.len());
    let mut raw_body = buf[body_start..].to_vec();
    while raw_body.len() < content_length {
        let n = stream.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        raw_body.extend_from_slice(&chunk[..n]);
    }
    raw_body.truncate(content_length);

    StubRequest {
        line,
        headers,
        body: String::from_utf8_lossy(&raw_body).to_string(),
        raw_body,
    }
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}
