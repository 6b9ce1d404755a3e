//! REST handlers: health, client bootstrap, one-shot chat.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::cache::CacheStats;
use crate::core::emotion::Emotion;
use crate::core::pipeline::Request;
use crate::core::speech::AudioEncoding;
use crate::core::viseme::VisemeFrame;
use crate::errors::{AppError, AppResult};
use crate::protocol::{MAX_INPUT_TEXT_SIZE, ServiceModes};
use crate::state::AppState;

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub service: &'static str,
    pub version: &'static str,
    /// Open WebSocket sessions
    pub active_sessions: usize,
    /// Cache counters; absent when the cache is disabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheStats>,
    /// Which implementation serves each capability
    pub services: ServiceModes,
}

/// Liveness plus a small operational snapshot.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        healthy: true,
        service: "visage-gateway",
        version: env!("CARGO_PKG_VERSION"),
        active_sessions: state.sessions.len(),
        cache: state.cache.as_ref().map(|cache| cache.stats()),
        services: state.service_modes(),
    })
}

/// Body of `GET /api/config`.
#[derive(Debug, Serialize)]
pub struct ClientConfigResponse {
    /// Path the client should open the avatar WebSocket against
    pub websocket_path: &'static str,
    /// Configured synthesis voice
    pub voice: String,
    pub features: FeatureFlags,
}

#[derive(Debug, Serialize)]
pub struct FeatureFlags {
    pub cache_enabled: bool,
    /// Replies come from a live serving endpoint rather than stock text
    pub live_chat: bool,
    /// Audio comes from a live synthesis endpoint rather than silence
    pub live_speech: bool,
}

/// Client bootstrap: where to connect and which capabilities are live.
pub async fn client_config(State(state): State<Arc<AppState>>) -> Json<ClientConfigResponse> {
    Json(ClientConfigResponse {
        websocket_path: "/ws/avatar",
        voice: state.config.speech.voice.clone(),
        features: FeatureFlags {
            cache_enabled: state.config.cache.enabled,
            live_chat: state.live_chat(),
            live_speech: state.live_speech(),
        },
    })
}

/// Body of `POST /api/chat`.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub text: String,
    /// Also return the synthesized audio and viseme timeline
    #[serde(default)]
    pub include_audio: bool,
}

/// Reply to `POST /api/chat`.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub emotion: Emotion,
    pub cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_format: Option<AudioEncoding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visemes: Option<Vec<VisemeFrame>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

/// One-shot text query through the same pipeline, for clients without a
/// socket. No conversation state is attached or recorded.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChatRequest>,
) -> AppResult<Json<ChatResponse>> {
    if body.text.len() > MAX_INPUT_TEXT_SIZE {
        return Err(AppError::InvalidInput(format!(
            "input text too large: {} bytes (max: {} bytes)",
            body.text.len(),
            MAX_INPUT_TEXT_SIZE
        )));
    }

    let request = Request::new(&body.text, "http")?;
    debug!(request = %request.id, chars = request.text.len(), "one-shot chat query");

    let reply = state.orchestrator.respond(&request, &[]).await?;

    let audio = body
        .include_audio
        .then(|| base64::engine::general_purpose::STANDARD.encode(&reply.bundle.audio));
    Ok(Json(ChatResponse {
        response: reply.bundle.text.clone(),
        emotion: reply.classification.emotion,
        cached: reply.cached,
        audio,
        audio_format: body.include_audio.then_some(reply.bundle.encoding),
        visemes: body.include_audio.then(|| reply.bundle.visemes.clone()),
        duration_ms: body.include_audio.then_some(reply.bundle.duration_ms),
    }))
}
