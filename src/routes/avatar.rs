//! Avatar WebSocket route configuration
//!
//! This module configures the WebSocket endpoint for the conversational
//! avatar: streaming reply events and session control over one socket.

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::avatar::avatar_websocket;
use crate::state::AppState;
use std::sync::Arc;

/// Create the avatar WebSocket router
///
/// # Endpoint
///
/// `GET /ws/avatar` - WebSocket upgrade for the avatar session
///
/// # Protocol
///
/// After the upgrade the server sends a `greeting`. Clients then send:
/// - `text_input` / `transcription` messages carrying user text
/// - `control` messages (`ping`, `capture_start`, `stop_speaking`,
///   `get_status`)
///
/// For each input the server streams, in order: `emotion_detected`,
/// `response_text`, `lip_sync_data`, `audio_data`, `response_complete`.
/// An `error` message replaces the remainder of that sequence. A new
/// input supersedes the active reply; its remaining events are dropped.
///
/// # Example
///
/// ```json
/// // Client sends input
/// {"type": "text_input", "text": "What is Delta Lake?"}
///
/// // Server streams the reply
/// {"type": "emotion_detected", "emotion": "neutral", "confidence": 0.6}
/// {"type": "response_text", "text": "Delta Lake is...", "cached": false}
/// {"type": "lip_sync_data", "visemes": [...], "duration_ms": 2400}
/// {"type": "audio_data", "audio": "<base64>", "format": "wav"}
/// {"type": "response_complete"}
/// ```
pub fn create_avatar_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ws/avatar", get(avatar_websocket))
        .layer(TraceLayer::new_for_http())
}
