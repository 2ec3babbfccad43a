#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use iracing_auth::{Config, ManualClock, TokenManager};
use tracing::subscriber::{DefaultGuard, set_default};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{Registry, fmt};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockBuilder, MockServer, Request, ResponseTemplate};

pub const TOKEN_PATH: &str = "/oauth2/token";
pub const CLIENT_ID: &str = "test-client";
pub const CLIENT_SECRET: &str = "client-secret";
pub const USERNAME: &str = "Driver@Example.com";
pub const PASSWORD: &str = "hunter2";

pub fn config(server: &MockServer) -> Config {
    Config::from_values(CLIENT_SECRET, USERNAME, PASSWORD)
        .with_client_id(CLIENT_ID)
        .with_token_url(format!("{}{}", server.uri(), TOKEN_PATH))
}

pub fn manager(server: &MockServer) -> (Arc<TokenManager>, Arc<ManualClock>) {
    manager_with_config(config(server))
}

pub fn manager_with_config(config: Config) -> (Arc<TokenManager>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::starting_now());
    let manager = TokenManager::with_parts(config, reqwest::Client::new(), clock.clone());
    (Arc::new(manager), clock)
}

pub fn token_body(access: &str, refresh: Option<&str>, expires_in: i64, refresh_expires_in: Option<i64>) -> serde_json::Value {
    let mut body = serde_json::json!({
        "access_token": access,
        "token_type": "Bearer",
        "expires_in": expires_in,
    });
    if let Some(refresh) = refresh {
        body["refresh_token"] = serde_json::json!(refresh);
    }
    if let Some(secs) = refresh_expires_in {
        body["refresh_token_expires_in"] = serde_json::json!(secs);
    }
    body
}

pub fn password_grant() -> MockBuilder {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=password_limited"))
}

pub fn refresh_grant(refresh_token: &str) -> MockBuilder {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains(format!("refresh_token={refresh_token}")))
}

pub fn ok_json(body: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

pub async fn token_requests(server: &MockServer) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() == TOKEN_PATH)
        .collect()
}

/// Decodes a form-encoded request body.
pub fn form_fields(request: &Request) -> HashMap<String, String> {
    let body = String::from_utf8_lossy(&request.body);
    let url = reqwest::Url::parse(&format!("http://form.local/?{body}")).unwrap();
    url.query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

pub fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

struct VecWriter {
    lines: Arc<Mutex<Vec<String>>>,
}

impl std::io::Write for VecWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut guard = self.lines.lock().unwrap();
        guard.push(String::from_utf8_lossy(buf).into_owned());
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

pub fn capture_logs() -> (Arc<Mutex<Vec<String>>>, DefaultGuard) {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let writer_lines = lines.clone();
    let subscriber = Registry::default().with(
        fmt::Layer::default()
            .with_writer(move || VecWriter {
                lines: writer_lines.clone(),
            })
            .with_target(false)
            .with_level(true)
            .with_ansi(false),
    );
    let guard = set_default(subscriber);
    (lines, guard)
}
