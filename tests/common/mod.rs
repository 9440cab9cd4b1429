//! Shared utilities for integration and load testing.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use resilient_fetch::config::{ClientConfig, EndpointConfig};
use resilient_fetch::lifecycle::build_service;
use resilient_fetch::FetchService;

/// What the backend saw for one request.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub accept: Option<String>,
}

/// Handle to a running mock backend.
#[derive(Clone)]
pub struct Backend {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

#[allow(dead_code)]
impl Backend {
    pub fn base_address(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn hits(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

/// Start a mock backend that always returns the same response.
#[allow(dead_code)]
pub async fn start_mock_backend(status: u16, body: &'static str) -> Backend {
    start_programmable_backend(move |_| async move { (status, body.to_string()) }).await
}

/// Start a programmable mock backend with async support.
///
/// The closure sees each request and returns `(status, body)`; it may sleep
/// first to simulate a slow dependency.
pub async fn start_programmable_backend<F, Fut>(f: F) -> Backend
where
    F: Fn(RecordedRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    serve(move |request| {
        let response = f(request);
        async move {
            let (status, body) = response.await;
            (status, body.into_bytes())
        }
    })
    .await
}

/// Start a mock backend that writes `body` verbatim, valid UTF-8 or not.
#[allow(dead_code)]
pub async fn start_raw_backend(status: u16, body: &'static [u8]) -> Backend {
    serve(move |_| async move { (status, body.to_vec()) }).await
}

async fn serve<F, Fut>(f: F) -> Backend
where
    F: Fn(RecordedRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, Vec<u8>)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let f = Arc::new(f);

    let recorded = requests.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    let recorded = recorded.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request(&mut socket).await else {
                            return;
                        };
                        recorded.lock().unwrap().push(request.clone());

                        let (status, body) = f(request).await;
                        let head = if status == 204 {
                            format!("HTTP/1.1 {}\r\nConnection: close\r\n\r\n", status_line(status))
                        } else {
                            format!(
                                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                                status_line(status),
                                body.len()
                            )
                        };
                        let _ = socket.write_all(head.as_bytes()).await;
                        if status != 204 {
                            let _ = socket.write_all(&body).await;
                        }
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    Backend { addr, requests }
}

/// Address nothing is listening on.
#[allow(dead_code)]
pub async fn closed_address() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Endpoint config with delays small enough for real-time tests.
#[allow(dead_code)]
pub fn fast_endpoint(name: &str, base_address: String) -> EndpointConfig {
    let mut endpoint = EndpointConfig::new(name, base_address);
    endpoint.retry.base_delay_ms = 10;
    endpoint.circuit_breaker.cooldown_ms = 300;
    endpoint.timeouts.attempt_ms = 2_000;
    endpoint.timeouts.call_ms = 5_000;
    endpoint
}

/// Fetch service over the real HTTP transport.
#[allow(dead_code)]
pub fn service_for(endpoints: Vec<EndpointConfig>) -> FetchService {
    let config = ClientConfig {
        endpoints,
        ..ClientConfig::default()
    };
    build_service(&config).unwrap()
}

async fn read_request(socket: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 || buf.len() > 16 * 1024 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let head = String::from_utf8_lossy(&buf);
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();
    let accept = lines
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("accept"))
        .map(|(_, value)| value.trim().to_string());

    Some(RecordedRequest { method, path, accept })
}

fn status_line(status: u16) -> &'static str {
    match status {
        200 => "200 OK",
        204 => "204 No Content",
        400 => "400 Bad Request",
        404 => "404 Not Found",
        408 => "408 Request Timeout",
        429 => "429 Too Many Requests",
        500 => "500 Internal Server Error",
        502 => "502 Bad Gateway",
        503 => "503 Service Unavailable",
        504 => "504 Gateway Timeout",
        _ => "200 OK",
    }
}
