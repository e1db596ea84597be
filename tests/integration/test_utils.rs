//! Shared test utilities for integration tests
//!
//! Provides isolated XDG directories for config loading tests, a scripted
//! transport that stands in for the backend, and a small HTTP backend for
//! tests that need real cookies on the wire.

use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use foodsnap::pipeline::{
    ApiResponse, PipelineOptions, PreparedRequest, RefreshPolicy, RequestPipeline, Transport,
};
use foodsnap::config::ApiConfig;
use foodsnap::storage::Storage;
use foodsnap::{PipelineError, TokenStore};
use tempfile::TempDir;

/// Global mutex to serialize environment variable access across all tests
static XDG_ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Environment variable state to restore after test
struct EnvState {
    home: Option<String>,
    xdg_config_home: Option<String>,
    foodsnap_env: Option<String>,
}

impl EnvState {
    fn capture() -> Self {
        Self {
            home: std::env::var("HOME").ok(),
            xdg_config_home: std::env::var("XDG_CONFIG_HOME").ok(),
            foodsnap_env: std::env::var("FOODSNAP_ENV").ok(),
        }
    }

    fn restore(self) {
        restore_var("HOME", self.home);
        restore_var("XDG_CONFIG_HOME", self.xdg_config_home);
        restore_var("FOODSNAP_ENV", self.foodsnap_env);
    }
}

fn restore_var(name: &str, value: Option<String>) {
    match value {
        Some(orig) => std::env::set_var(name, orig),
        None => std::env::remove_var(name),
    }
}

/// Run `f` with HOME and XDG_CONFIG_HOME pointed into `test_dir`.
///
/// The user-level config file then lives at `test_dir/foodsnap/config.toml`.
/// The original environment is restored afterwards.
pub fn with_xdg_env<F, R>(test_dir: &TempDir, f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = XDG_ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let env_state = EnvState::capture();

    let test_home = test_dir.path().join("home");
    std::fs::create_dir_all(&test_home).unwrap();

    std::env::set_var("HOME", test_home.to_str().unwrap());
    std::env::set_var("XDG_CONFIG_HOME", test_dir.path().to_str().unwrap());
    std::env::remove_var("FOODSNAP_ENV");

    let result = f();

    env_state.restore();

    result
}

/// Step the scripted transport takes for one incoming request
pub enum Reply {
    Respond(Result<ApiResponse, PipelineError>),
    /// Yield to the runtime `n` times before responding, so that concurrent
    /// requests interleave
    Delayed(usize, Result<ApiResponse, PipelineError>),
}

pub fn ok(status: u16, body: &str) -> Reply {
    Reply::Respond(Ok(ApiResponse::new(status, body.as_bytes().to_vec())))
}

pub fn delayed(yields: usize, status: u16, body: &str) -> Reply {
    Reply::Delayed(yields, Ok(ApiResponse::new(status, body.as_bytes().to_vec())))
}

/// Replies keyed by request path suffix, replayed in order per path
pub struct ScriptedTransport {
    routes: Mutex<Vec<(String, VecDeque<Reply>)>>,
    sent: Mutex<Vec<PreparedRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            routes: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
        })
    }

    /// Queue a reply for requests whose URL ends with `path`
    pub fn on(self: &Arc<Self>, path: &str, reply: Reply) -> Arc<Self> {
        {
            let mut routes = self.routes.lock().unwrap();
            match routes.iter_mut().find(|(p, _)| p == path) {
                Some((_, queue)) => queue.push_back(reply),
                None => routes.push((path.to_string(), VecDeque::from([reply]))),
            }
        }
        Arc::clone(self)
    }

    pub fn sent(&self) -> Vec<PreparedRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count(&self, path: &str) -> usize {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url.ends_with(path))
            .count()
    }

    fn next_reply(&self, url: &str) -> Option<Reply> {
        let mut routes = self.routes.lock().unwrap();
        routes
            .iter_mut()
            .filter(|(p, _)| url.ends_with(p.as_str()))
            .max_by_key(|(p, _)| p.len())
            .and_then(|(_, queue)| queue.pop_front())
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &PreparedRequest) -> Result<ApiResponse, PipelineError> {
        self.sent.lock().unwrap().push(request.clone());
        match self.next_reply(&request.url) {
            Some(Reply::Respond(result)) => result,
            Some(Reply::Delayed(yields, result)) => {
                for _ in 0..yields {
                    tokio::task::yield_now().await;
                }
                result
            }
            None => Err(PipelineError::Network(format!(
                "no scripted reply for {}",
                request.url
            ))),
        }
    }
}

pub const BASE_URL: &str = "http://api.test";

/// Pipeline over `transport` with a fresh token store on temporary storage
pub fn pipeline_with(
    transport: Arc<ScriptedTransport>,
    policy: RefreshPolicy,
) -> (Arc<RequestPipeline>, Arc<TokenStore>, Storage) {
    let storage = Storage::temporary().unwrap();
    let tokens = Arc::new(TokenStore::new(storage.clone()));
    let pipeline = RequestPipeline::new(
        transport,
        Arc::clone(&tokens),
        PipelineOptions::new(BASE_URL).with_refresh_policy(policy),
    );
    (Arc::new(pipeline), tokens, storage)
}

pub const EVENT_TIMEOUT: Duration = Duration::from_secs(2);

/// Access token handed out at sign-in
pub const SIGN_IN_TOKEN: &str = "t1";

/// Access token handed out by a successful refresh
pub const REFRESHED_TOKEN: &str = "t2";

const REFRESH_COOKIE: &str = "refresh_token=r1";

/// HTTP/1.1 backend on a loopback port.
///
/// Sign-in sets an HTTP-only refresh cookie and refresh only succeeds when
/// that cookie comes back. Every request is logged as
/// `"<METHOD> <path> cookie=<bool>"`.
pub struct AuthBackend {
    base_url: String,
    log: Arc<Mutex<Vec<String>>>,
}

impl AuthBackend {
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let log = Arc::new(Mutex::new(Vec::new()));

        let server_log = Arc::clone(&log);
        std::thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let _ = handle_connection(stream, &server_log);
            }
        });

        Self { base_url, log }
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.base_url.clone(),
            ..ApiConfig::default()
        }
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

fn handle_connection(stream: TcpStream, log: &Mutex<Vec<String>>) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);

    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;
    let mut words = request_line.split_whitespace();
    let method = words.next().unwrap_or_default().to_string();
    let path = words.next().unwrap_or_default().to_string();

    let mut content_length = 0usize;
    let mut chunked = false;
    let mut cookie = String::new();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 || line.trim().is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            let value = value.trim();
            match name.trim().to_ascii_lowercase().as_str() {
                "content-length" => content_length = value.parse().unwrap_or(0),
                "transfer-encoding" => chunked = value.eq_ignore_ascii_case("chunked"),
                "cookie" => cookie = value.to_string(),
                _ => {}
            }
        }
    }
    read_body(&mut reader, content_length, chunked)?;

    let has_cookie = cookie.split(';').any(|c| c.trim() == REFRESH_COOKIE);
    log.lock()
        .unwrap()
        .push(format!("{} {} cookie={}", method, path, has_cookie));

    let (status, set_cookie, body) = match (method.as_str(), path.as_str()) {
        ("POST", "/auth/token") => (
            200,
            Some(format!("{}; HttpOnly; Path=/", REFRESH_COOKIE)),
            format!(r#"{{"access_token":"{}","token_type":"bearer"}}"#, SIGN_IN_TOKEN),
        ),
        ("GET", "/auth/me") => (200, None, r#"{"id":1,"username":"ann"}"#.to_string()),
        ("POST", "/auth/refresh") if has_cookie => (
            200,
            None,
            format!(r#"{{"access_token":"{}"}}"#, REFRESHED_TOKEN),
        ),
        ("POST", "/auth/refresh") => (401, None, r#"{"detail":"Refresh token missing"}"#.to_string()),
        ("POST", "/auth/logout") => (
            200,
            Some("refresh_token=; Max-Age=0; Path=/".to_string()),
            r#"{"message":"Logged out"}"#.to_string(),
        ),
        ("POST", "/dish/") => (
            200,
            None,
            r#"{"filename":"plate.jpg","analysis":{"dish_name":"Shakshuka","ingredients":["eggs","tomato"],"recipe":"Simmer sauce\nCrack eggs\nCover"}}"#.to_string(),
        ),
        ("POST", "/dish/save/") => (
            200,
            None,
            r#"{"message":"Recipe saved successfully","recipe_id":7}"#.to_string(),
        ),
        _ => (404, None, r#"{"detail":"Not Found"}"#.to_string()),
    };

    let reason = match status {
        200 => "OK",
        401 => "Unauthorized",
        _ => "Not Found",
    };
    let mut response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n",
        status,
        reason,
        body.len()
    );
    if let Some(set_cookie) = set_cookie {
        response.push_str(&format!("Set-Cookie: {}\r\n", set_cookie));
    }
    response.push_str("\r\n");
    response.push_str(&body);

    let mut stream = reader.into_inner();
    stream.write_all(response.as_bytes())?;
    stream.flush()
}

fn read_body(reader: &mut BufReader<TcpStream>, length: usize, chunked: bool) -> std::io::Result<()> {
    if !chunked {
        let mut body = vec![0u8; length];
        return reader.read_exact(&mut body);
    }
    loop {
        let mut size_line = String::new();
        reader.read_line(&mut size_line)?;
        let size = usize::from_str_radix(size_line.trim().split(';').next().unwrap_or("0"), 16)
            .unwrap_or(0);
        let mut chunk = vec![0u8; size + 2];
        reader.read_exact(&mut chunk)?;
        if size == 0 {
            return Ok(());
        }
    }
}
