//! Shared test utilities and fixtures
//!
//! A wiremock server standing in for the Generative Language API, plus
//! helpers to point a [`GeminiGateway`] at it.

#![allow(dead_code)]

use std::time::Duration;

use iadess_providers::{ApiKey, GeminiConfig, GeminiGateway, RetryPolicy};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_API_KEY: &str = "test-key";

pub const TEXT_PATH: &str = "/models/gemini-3-pro-preview:generateContent";
pub const ARTIFACT_PATH: &str = "/models/gemini-3-flash-preview:generateContent";
pub const IMAGE_PATH: &str = "/models/gemini-2.5-flash-image:generateContent";
pub const SPEECH_PATH: &str = "/models/gemini-2.5-flash-preview-tts:generateContent";

pub async fn start_gemini_mock() -> MockServer {
    MockServer::start().await
}

/// Retries with millisecond backoff so quota tests stay fast.
pub fn fast_retry(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(4),
        jitter_factor: 0.0,
    }
}

pub fn gateway_config(server: &MockServer) -> GeminiConfig {
    let mut config = GeminiConfig::new(ApiKey::new(TEST_API_KEY));
    config.base_url = server.uri();
    config.retry = fast_retry(2);
    config.request_timeout = Duration::from_secs(5);
    config
}

/// Gateway over plain HTTP to the mock server.
pub fn gateway(server: &MockServer) -> GeminiGateway {
    GeminiGateway::with_client(gateway_config(server), reqwest::Client::new())
}

/// Gateway that gives up on each attempt after `timeout`.
pub fn gateway_with_timeout(server: &MockServer, timeout: Duration) -> GeminiGateway {
    let mut config = gateway_config(server);
    config.request_timeout = timeout;
    GeminiGateway::with_client(config, reqwest::Client::new())
}

fn text_candidate(text: &str) -> serde_json::Value {
    serde_json::json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] }
        }]
    })
}

fn inline_candidate(mime_type: &str, data: &str) -> serde_json::Value {
    serde_json::json!({
        "candidates": [{
            "content": {
                "parts": [{ "inlineData": { "mimeType": mime_type, "data": data } }]
            }
        }]
    })
}

/// Chat reply with one grounding chunk (title and uri may be absent).
pub async fn mount_text_response(
    server: &MockServer,
    text: &str,
    grounding: Option<(Option<&str>, Option<&str>)>,
) {
    let mut body = text_candidate(text);
    if let Some((title, uri)) = grounding {
        body["candidates"][0]["groundingMetadata"] = serde_json::json!({
            "groundingChunks": [{ "web": { "title": title, "uri": uri } }]
        });
    }

    Mock::given(method("POST"))
        .and(path(TEXT_PATH))
        .and(header("x-goog-api-key", TEST_API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Structured artifact reply.
pub async fn mount_artifact_response(server: &MockServer, name: &str, code: &str, tags: &[&str]) {
    let draft = serde_json::json!({ "name": name, "codeShard": code, "tags": tags });
    Mock::given(method("POST"))
        .and(path(ARTIFACT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_candidate(&draft.to_string())))
        .mount(server)
        .await;
}

/// Artifact reply held back for `delay` before it is sent.
pub async fn mount_slow_artifact(server: &MockServer, delay: Duration) {
    let draft = serde_json::json!({ "name": "Late", "codeShard": "late()", "tags": [] });
    Mock::given(method("POST"))
        .and(path(ARTIFACT_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(text_candidate(&draft.to_string()))
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

/// Artifact reply whose text is not the expected JSON object.
pub async fn mount_malformed_artifact(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(ARTIFACT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_candidate("not json")))
        .mount(server)
        .await;
}

/// `RESOURCE_EXHAUSTED` on `endpoint`, optionally only for the first `times` calls.
pub async fn mount_quota_exhausted(server: &MockServer, endpoint: &str, times: Option<u64>) {
    let body = serde_json::json!({
        "error": {
            "code": 429,
            "message": "Resource has been exhausted (e.g. check quota).",
            "status": "RESOURCE_EXHAUSTED"
        }
    });
    let mock = Mock::given(method("POST"))
        .and(path(endpoint))
        .respond_with(ResponseTemplate::new(429).set_body_json(body));
    let mock = match times {
        Some(n) => mock.up_to_n_times(n).with_priority(1),
        None => mock,
    };
    mock.mount(server).await;
}

pub async fn mount_server_error(server: &MockServer, endpoint: &str) {
    Mock::given(method("POST"))
        .and(path(endpoint))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
        .mount(server)
        .await;
}

pub async fn mount_image_response(server: &MockServer, data: &str) {
    Mock::given(method("POST"))
        .and(path(IMAGE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(inline_candidate("image/png", data)))
        .mount(server)
        .await;
}

pub async fn mount_speech_response(server: &MockServer, base64_pcm: &str) {
    Mock::given(method("POST"))
        .and(path(SPEECH_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(inline_candidate("audio/L16;rate=24000", base64_pcm)),
        )
        .mount(server)
        .await;
}

/// Requests received on `endpoint`, parsed as JSON.
pub async fn received_bodies(server: &MockServer, endpoint: &str) -> Vec<serde_json::Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|request| request.url.path() == endpoint)
        .filter_map(|request| serde_json::from_slice(&request.body).ok())
        .collect()
}
