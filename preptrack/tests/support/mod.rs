//! Minimal HTTP/1.1 stub server for exercising the real adapters.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use preptrack::storage::{KeyValueStore, MemoryStore, SessionStorage};
use preptrack::{ClientConfig, LoginRedirect, PrepClient};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub const API_KEY: &str = "test-api-key";

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    /// Path plus query string, as sent on the request line.
    pub target: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl RecordedRequest {
    pub fn path(&self) -> &str {
        self.target.split('?').next().unwrap_or_default()
    }

    pub fn query(&self) -> &str {
        self.target.split_once('?').map(|(_, q)| q).unwrap_or_default()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

#[derive(Debug, Clone)]
struct Route {
    method: String,
    path: String,
    status: u16,
    body: String,
    delay: Option<Duration>,
    once: bool,
    used: bool,
}

#[derive(Default)]
struct ServerState {
    routes: Vec<Route>,
    requests: Vec<RecordedRequest>,
}

pub struct StubServer {
    base_url: String,
    state: Arc<Mutex<ServerState>>,
}

impl StubServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(Mutex::new(ServerState::default()));

        let accept_state = state.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let state = accept_state.clone();
                tokio::spawn(async move {
                    let _ = handle(stream, state).await;
                });
            }
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn add(&self, method: &str, path: &str, status: u16, body: &str, delay: Option<Duration>, once: bool) {
        self.state.lock().unwrap().routes.push(Route {
            method: method.to_string(),
            path: path.to_string(),
            status,
            body: body.to_string(),
            delay,
            once,
            used: false,
        });
    }

    /// Answer every matching request.
    pub fn respond(&self, method: &str, path: &str, status: u16, body: &str) {
        self.add(method, path, status, body, None, false);
    }

    /// Answer the next matching request only. Earlier routes win, so register
    /// one-shot routes before a repeating fallback.
    pub fn respond_once(&self, method: &str, path: &str, status: u16, body: &str) {
        self.add(method, path, status, body, None, true);
    }

    pub fn respond_after(&self, delay: Duration, method: &str, path: &str, status: u16, body: &str) {
        self.add(method, path, status, body, Some(delay), false);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn last_request(&self, method: &str, path: &str) -> RecordedRequest {
        self.requests()
            .into_iter()
            .rev()
            .find(|r| r.method == method && r.path() == path)
            .unwrap_or_else(|| panic!("no {} {} request recorded", method, path))
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig {
            auth_base_url: self.base_url.clone(),
            auth_api_key: API_KEY.to_string(),
            api_base_url: format!("{}/api", self.base_url),
        }
    }
}

async fn handle(mut stream: TcpStream, state: Arc<Mutex<ServerState>>) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let target = request_line.next().unwrap_or_default().to_string();

    let headers: HashMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();
    let content_length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);

    let mut body = buf[header_end..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    let request = RecordedRequest {
        method: method.clone(),
        target: target.clone(),
        headers,
        body: String::from_utf8_lossy(&body).to_string(),
    };
    let path = request.path().to_string();

    let route = {
        let mut state = state.lock().unwrap();
        state.requests.push(request);
        let route = state
            .routes
            .iter_mut()
            .find(|r| r.method == method && r.path == path && !(r.once && r.used));
        match route {
            Some(route) => {
                route.used = true;
                Some(route.clone())
            }
            None => None,
        }
    };

    let (status, body, delay) = match route {
        Some(route) => (route.status, route.body, route.delay),
        None => (404, r#"{"message":"No stub route"}"#.to_string(), None),
    };
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let response = if status == 204 {
        "HTTP/1.1 204 Stub\r\nConnection: close\r\n\r\n".to_string()
    } else {
        format!(
            "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        )
    };
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

/// Counts login redirects.
#[derive(Debug, Default)]
pub struct CountingRedirect(AtomicUsize);

impl CountingRedirect {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl LoginRedirect for CountingRedirect {
    fn redirect_to_login(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct Harness {
    pub server: StubServer,
    pub client: PrepClient,
    pub redirect: Arc<CountingRedirect>,
    pub durable: MemoryStore,
    pub ephemeral: MemoryStore,
}

impl Harness {
    pub async fn start() -> Self {
        let server = StubServer::start().await;
        let durable = MemoryStore::new();
        let ephemeral = MemoryStore::new();
        let storage = SessionStorage::new(Arc::new(durable.clone()), Arc::new(ephemeral.clone()));
        let redirect = Arc::new(CountingRedirect::default());
        let client = PrepClient::new(&server.config(), storage, redirect.clone()).unwrap();
        client.session().hydrate();
        Self {
            server,
            client,
            redirect,
            durable,
            ephemeral,
        }
    }

    pub fn persisted_token(&self) -> Option<String> {
        self.durable
            .get("token")
            .unwrap()
            .or_else(|| self.ephemeral.get("token").unwrap())
    }
}

pub fn login_body(token: &str) -> String {
    serde_json::json!({
        "accessToken": token,
        "refreshToken": "refresh",
        "user": { "id": "user-1", "role": "user" }
    })
    .to_string()
}

pub fn entry_json(id: &str, title: &str) -> serde_json::Value {
    serde_json::json!({
        "_id": id,
        "title": title,
        "status": "pending",
        "category": "dsa",
        "tags": ["arrays"],
        "userId": "user-1",
        "deadline": "2024-01-01T00:00:00.000Z",
        "isRecurring": false,
        "createdAt": "2024-01-01T00:00:00.000Z",
        "updatedAt": "2024-01-01T00:00:00.000Z"
    })
}

pub fn day_json(date: &str, tasks: Vec<serde_json::Value>) -> String {
    let count = tasks.len();
    let summary = serde_json::json!({
        "total": count, "completed": 0, "in_progress": 0, "pending": count
    });
    serde_json::json!({
        "date": date,
        "summary": summary,
        "groups": if count == 0 {
            serde_json::json!([])
        } else {
            serde_json::json!([{ "category": "dsa", "summary": summary, "tasks": tasks }])
        }
    })
    .to_string()
}
