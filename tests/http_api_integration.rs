//! HTTP API Integration Tests
//!
//! Full request flows through the REST router: health and bootstrap
//! endpoints, one-shot chat in offline mode, and live-endpoint mode
//! against mocked upstream services.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use tower::util::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use visage_gateway::protocol::MAX_INPUT_TEXT_SIZE;
use visage_gateway::{AppState, Config, routes};

fn test_app(config: Config) -> Router {
    let state = Arc::new(AppState::new(config).expect("Should build state"));
    routes::create_api_router().with_state(state)
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

// =============================================================================
// Health and Bootstrap
// =============================================================================

#[tokio::test]
async fn test_health_reports_offline_modes() {
    let app = test_app(Config::default());
    let (status, json) = get_json(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["healthy"], true);
    assert_eq!(json["service"], "visage-gateway");
    assert_eq!(json["active_sessions"], 0);
    assert_eq!(json["services"]["chat"], "canned");
    assert_eq!(json["services"]["speech"], "silent");
    assert_eq!(json["services"]["emotion"], "lexicon");
    assert_eq!(json["services"]["viseme"], "phoneme");
    assert_eq!(json["cache"]["entries"], 0);
}

#[tokio::test]
async fn test_health_omits_cache_counters_when_disabled() {
    let mut config = Config::default();
    config.cache.enabled = false;

    let app = test_app(config);
    let (status, json) = get_json(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert!(json.get("cache").is_none());
}

#[tokio::test]
async fn test_client_config_reports_connection_details() {
    let app = test_app(Config::default());
    let (status, json) = get_json(app, "/api/config").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["websocket_path"], "/ws/avatar");
    assert_eq!(json["voice"], "alloy");
    assert_eq!(json["features"]["cache_enabled"], true);
    assert_eq!(json["features"]["live_chat"], false);
    assert_eq!(json["features"]["live_speech"], false);
}

// =============================================================================
// One-Shot Chat (Offline Mode)
// =============================================================================

#[tokio::test]
async fn test_chat_answers_and_caches_repeat_queries() {
    let app = test_app(Config::default());

    let (status, json) = post_json(
        app.clone(),
        "/api/chat",
        json!({"text": "What is Delta Lake?"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["response"].as_str().unwrap().contains("ACID"));
    assert_eq!(json["emotion"], "neutral");
    assert_eq!(json["cached"], false);
    assert!(json.get("audio").is_none(), "audio is opt-in");

    // same question, different case: served from the cache
    let (status, json) = post_json(
        app,
        "/api/chat",
        json!({"text": "what is delta lake?"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["cached"], true);
}

#[tokio::test]
async fn test_chat_returns_audio_and_visemes_on_request() {
    let app = test_app(Config::default());

    let (status, json) = post_json(
        app,
        "/api/chat",
        json!({"text": "Hello there", "include_audio": true}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(!json["audio"].as_str().unwrap().is_empty());
    assert_eq!(json["audio_format"], "wav");
    let visemes = json["visemes"].as_array().unwrap();
    assert!(!visemes.is_empty());
    assert!(visemes[0]["startMs"].is_u64());
    assert!(visemes[0]["visemeId"].is_string());
    assert!(json["duration_ms"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn test_chat_rejects_blank_text() {
    let app = test_app(Config::default());
    let (status, json) = post_json(app, "/api/chat", json!({"text": "   "})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["stage"], "input");
    assert!(json["error"].as_str().unwrap().contains("empty"));
}

#[tokio::test]
async fn test_chat_rejects_oversized_text() {
    let app = test_app(Config::default());
    let text = "a".repeat(MAX_INPUT_TEXT_SIZE + 1);
    let (status, json) = post_json(app, "/api/chat", json!({"text": text})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["stage"], "input");
    assert!(json["error"].as_str().unwrap().contains("too large"));
}

// =============================================================================
// Live Endpoints (Mocked Upstreams)
// =============================================================================

#[tokio::test]
async fn test_chat_invokes_live_serving_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(
            "/serving-endpoints/databricks-meta-llama-3-1-8b-instruct/invocations",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "Mocked serving reply."}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = Config::default();
    config.chat.base_url = server.uri();
    config.chat.api_token = "test-token".to_string();

    let app = test_app(config);
    let (status, json) = post_json(app, "/api/chat", json!({"text": "hi there"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["response"], "Mocked serving reply.");
    assert_eq!(json["cached"], false);
}

#[tokio::test]
async fn test_chat_surfaces_serving_endpoint_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(
            "/serving-endpoints/databricks-meta-llama-3-1-8b-instruct/invocations",
        ))
        .respond_with(ResponseTemplate::new(500).set_body_string("model crashed"))
        .mount(&server)
        .await;

    let mut config = Config::default();
    config.chat.base_url = server.uri();
    config.chat.api_token = "test-token".to_string();

    let app = test_app(config);
    let (status, json) = post_json(app, "/api/chat", json!({"text": "hi there"})).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["stage"], "generation");
    assert!(json["error"].as_str().unwrap().contains("500"));
}

#[tokio::test]
async fn test_chat_streams_audio_from_live_speech_endpoint() {
    let server = MockServer::start().await;
    let audio_bytes: &[u8] = b"mock-audio-payload";
    Mock::given(method("POST"))
        .and(path("/v1/audio/speech"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(audio_bytes))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = Config::default();
    config.speech.endpoint = format!("{}/v1/audio/speech", server.uri());
    config.speech.api_key = "test-key".to_string();

    let app = test_app(config);
    let (status, json) = post_json(
        app,
        "/api/chat",
        json!({"text": "hi there", "include_audio": true}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    use base64::Engine;
    let expected = base64::engine::general_purpose::STANDARD.encode(audio_bytes);
    assert_eq!(json["audio"], expected.as_str());
    // non-WAV payloads still get a timeline from the fixed-step fallback
    assert!(!json["visemes"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_chat_surfaces_speech_endpoint_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/audio/speech"))
        .respond_with(ResponseTemplate::new(503).set_body_string("voice backend down"))
        .mount(&server)
        .await;

    let mut config = Config::default();
    config.speech.endpoint = format!("{}/v1/audio/speech", server.uri());
    config.speech.api_key = "test-key".to_string();

    let app = test_app(config);
    let (status, json) = post_json(app, "/api/chat", json!({"text": "hi there"})).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["stage"], "synthesis");
}
