#![allow(dead_code)]

use std::time::Duration;

use pet_core::{GeminiClient, GeminiOptions};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_KEY: &str = "test-key";
pub const GENERATE_PATH: &str = "/v1/models/gemini-2.5-flash:generateContent";

pub fn options(api_base: &str) -> GeminiOptions {
    GeminiOptions {
        api_base: api_base.to_string(),
        connect_timeout: Duration::from_secs(2),
        request_timeout: Duration::from_secs(5),
        ..GeminiOptions::default()
    }
}

pub fn client_for(server: &MockServer) -> GeminiClient {
    GeminiClient::new(&options(&server.uri()), Some(TEST_KEY)).expect("build client")
}

pub fn reply_body(text: &str) -> serde_json::Value {
    json!({
        "candidates": [
            { "content": { "role": "model", "parts": [ { "text": text } ] } }
        ]
    })
}

pub fn generate_mock() -> wiremock::MockBuilder {
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(query_param("key", TEST_KEY))
}

pub async fn mount_reply(server: &MockServer, text: &str) {
    generate_mock()
        .respond_with(ResponseTemplate::new(200).set_body_json(reply_body(text)))
        .mount(server)
        .await;
}

/// Poll `is_busy` until it reports idle, failing the test after a few seconds.
pub async fn wait_until_idle(is_busy: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(10), async {
        while is_busy() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("request did not finish in time");
}

/// Address on which nothing is listening.
pub fn closed_port_base() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}
