//! Shared helpers for integration tests: markdown fixtures and a minimal
//! in-process HTTP responder standing in for the contents API.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// A well-formed story document
pub fn story_doc(name: &str, title: &str) -> String {
    format!(
        "---\nname: {name}\ntitle: {title}\ndescription: A client story\ndate: 2024-05-02\ntags: [web]\n---\n# {title}\n\nWe shipped it.\n"
    )
}

/// A story marked as draft
pub fn ignored_story_doc(name: &str) -> String {
    format!(
        "---\nname: {name}\ntitle: Draft\ndescription: Not ready\ndate: 2024-05-02\nignore: true\n---\nWIP\n"
    )
}

/// A story missing its required `name`
pub fn invalid_story_doc() -> String {
    "---\ntitle: Broken\ndescription: Missing name\ndate: 2024-05-02\n---\nBody\n".to_string()
}

pub fn blog_doc(title: &str) -> String {
    format!(
        "---\ntitle: {title}\ndescription: Notes\nauthor: Jane\ndate: 2024-01-15\n---\nHello\n"
    )
}

pub fn page_doc(title: &str) -> String {
    format!("---\ntitle: {title}\ndescription: Static page\n---\nPage body\n")
}

/// Write a file under `root`, creating parent directories
pub fn write_file(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}

/// Canned response for one request path
#[derive(Debug, Clone)]
pub struct StubResponse {
    pub status: u16,
    pub body: String,
    pub delay: Duration,
}

impl StubResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Request as seen by the stub
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub headers: HashMap<String, String>,
}

/// Minimal HTTP/1.1 responder. Unknown paths answer 404.
pub struct StubServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    max_in_flight: Arc<AtomicUsize>,
    handle: JoinHandle<()>,
}

impl StubServer {
    pub async fn start(routes: Vec<(&str, StubResponse)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let routes: Arc<HashMap<String, StubResponse>> = Arc::new(
            routes
                .into_iter()
                .map(|(path, response)| (path.to_string(), response))
                .collect(),
        );
        let requests = Arc::new(Mutex::new(Vec::new()));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_in_flight = Arc::new(AtomicUsize::new(0));

        let handle = {
            let requests = Arc::clone(&requests);
            let max_in_flight = Arc::clone(&max_in_flight);
            tokio::spawn(async move {
                loop {
                    let Ok((stream, _)) = listener.accept().await else {
                        break;
                    };
                    let routes = Arc::clone(&routes);
                    let requests = Arc::clone(&requests);
                    let in_flight = Arc::clone(&in_flight);
                    let max_in_flight = Arc::clone(&max_in_flight);
                    tokio::spawn(async move {
                        let current = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        max_in_flight.fetch_max(current, Ordering::SeqCst);
                        handle_connection(stream, &routes, &requests, &in_flight).await;
                    });
                }
            })
        };

        Self {
            base_url: format!("http://{addr}"),
            requests,
            max_in_flight,
            handle,
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    routes: &HashMap<String, StubResponse>,
    requests: &Mutex<Vec<RecordedRequest>>,
    in_flight: &AtomicUsize,
) {
    let reply = route_request(&mut stream, routes, requests).await;

    // In flight only until the reply is ready
    in_flight.fetch_sub(1, Ordering::SeqCst);

    if let Some(reply) = reply {
        let _ = stream.write_all(reply.as_bytes()).await;
        let _ = stream.shutdown().await;
    }
}

async fn route_request(
    stream: &mut TcpStream,
    routes: &HashMap<String, StubResponse>,
    requests: &Mutex<Vec<RecordedRequest>>,
) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return None,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }

    let head = String::from_utf8_lossy(&buf).to_string();
    let mut lines = head.lines();
    let path = lines
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();
    let headers = lines
        .take_while(|line| !line.is_empty())
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_lowercase(), v.trim().to_string()))
        .collect();

    requests.lock().unwrap().push(RecordedRequest {
        path: path.clone(),
        headers,
    });

    let response = routes
        .get(&path)
        .cloned()
        .unwrap_or_else(|| StubResponse::status(404, "Not Found"));

    if !response.delay.is_zero() {
        tokio::time::sleep(response.delay).await;
    }

    Some(format!(
        "HTTP/1.1 {} Stub\r\nContent-Length: {}\r\nContent-Type: text/plain\r\nConnection: close\r\n\r\n{}",
        response.status,
        response.body.len(),
        response.body
    ))
}

/// A listener that accepts connections and never answers
pub struct SilentServer {
    pub base_url: String,
    handle: JoinHandle<()>,
}

impl SilentServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });

        Self {
            base_url: format!("http://{addr}"),
            handle,
        }
    }
}

impl Drop for SilentServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// JSON directory listing in the contents-API shape
pub fn listing(dir: &str, names: &[&str]) -> String {
    let entries: Vec<serde_json::Value> = names
        .iter()
        .map(|name| {
            let kind = if name.contains('.') { "file" } else { "dir" };
            serde_json::json!({
                "name": name,
                "path": format!("{dir}/{name}"),
                "type": kind,
                "size": 100,
                "sha": format!("sha-{name}"),
            })
        })
        .collect();
    serde_json::Value::Array(entries).to_string()
}
