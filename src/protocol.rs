//! Wire protocol for the avatar WebSocket.
//!
//! Both directions of the protocol are tagged unions discriminated by a
//! `type` field, so the codec and its tests stay exhaustive over message
//! kinds. The same [`ServerMessage`] values flow from the pipeline through
//! the session writer onto the socket; nothing is re-encoded along the way.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::emotion::Emotion;
use crate::core::speech::AudioEncoding;
use crate::core::viseme::VisemeFrame;

/// Maximum allowed size for a single user input (16 KB)
pub const MAX_INPUT_TEXT_SIZE: usize = 16 * 1024;

// =============================================================================
// Incoming Messages (Client -> Server)
// =============================================================================

/// Incoming WebSocket messages from the client
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Direct typed input
    #[serde(rename = "text_input")]
    TextInput {
        /// Text content
        text: String,
    },

    /// Voice-derived input, already transcribed client-side
    #[serde(rename = "transcription")]
    Transcription {
        /// Transcribed text
        text: String,
    },

    /// Session control command
    #[serde(rename = "control")]
    Control {
        /// Command to execute
        command: ControlCommand,
    },
}

/// Control commands accepted over the socket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlCommand {
    /// Client begins capturing voice input
    CaptureStart,
    /// Cancel the active reply and return the avatar to idle
    StopSpeaking,
    /// Liveness check
    Ping,
    /// Request a session status snapshot
    GetStatus,
}

impl ControlCommand {
    /// Wire name of the command, echoed in `control_response`
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlCommand::CaptureStart => "capture_start",
            ControlCommand::StopSpeaking => "stop_speaking",
            ControlCommand::Ping => "ping",
            ControlCommand::GetStatus => "get_status",
        }
    }
}

// =============================================================================
// Outgoing Messages (Server -> Client)
// =============================================================================

/// Outgoing WebSocket messages to the client.
///
/// For one request the server emits, in order: `emotion_detected`,
/// `response_text`, `lip_sync_data`, `audio_data`, `response_complete`.
/// An `error` replaces the remainder of that sequence. `greeting`,
/// `control_response` and `status` sit outside the per-request stream.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Sent once when the connection is established
    #[serde(rename = "greeting")]
    Greeting {
        /// Configured greeting text
        message: String,
        /// Server-assigned connection id
        connection_id: String,
    },

    /// Per-request classifier output, independent of cache state
    #[serde(rename = "emotion_detected")]
    EmotionDetected {
        /// Detected emotion label
        emotion: Emotion,
        /// Classifier confidence in [0, 1]
        confidence: f32,
    },

    /// Reply text for the current request
    #[serde(rename = "response_text")]
    ResponseText {
        /// Generated or cached reply
        text: String,
        /// Whether the reply was served from the result cache
        cached: bool,
    },

    /// Mouth-shape timeline driving lip animation
    #[serde(rename = "lip_sync_data")]
    LipSyncData {
        /// Ordered viseme frames
        visemes: Vec<VisemeFrame>,
        /// Total timeline duration in milliseconds
        duration_ms: u64,
    },

    /// Synthesized speech audio
    #[serde(rename = "audio_data")]
    AudioData {
        /// Base64-encoded audio payload
        audio: String,
        /// Encoding of the payload
        format: AudioEncoding,
    },

    /// Marks the end of a successful request sequence
    #[serde(rename = "response_complete")]
    ResponseComplete,

    /// Replaces the remainder of the request sequence on failure
    #[serde(rename = "error")]
    Error {
        /// Human-readable description
        message: String,
        /// Pipeline stage that failed
        stage: String,
    },

    /// Reply to a control command
    #[serde(rename = "control_response")]
    ControlResponse {
        /// Echoed command name
        command: String,
        /// Outcome of the command
        status: String,
    },

    /// Session status snapshot
    #[serde(rename = "status")]
    Status {
        /// Connection id assigned at establishment
        connection_id: String,
        /// Current avatar phase
        avatar: String,
        /// Completed turns retained in the conversation log
        history_turns: usize,
        /// Which adapter mode each capability runs in
        services: ServiceModes,
    },
}

/// Adapter modes reported in `status` and `/health`
#[derive(Debug, Clone, Serialize)]
pub struct ServiceModes {
    /// Reply generator implementation name ("serving-endpoint" or "canned")
    pub chat: String,
    /// Synthesizer implementation name ("http" or "silent")
    pub speech: String,
    /// Classifier implementation name
    pub emotion: String,
    /// Viseme extractor implementation name
    pub viseme: String,
}

impl ServerMessage {
    /// Build an `audio_data` message from raw audio bytes
    pub fn audio_data(audio: &[u8], format: AudioEncoding) -> Self {
        use base64::Engine;
        ServerMessage::AudioData {
            audio: base64::engine::general_purpose::STANDARD.encode(audio),
            format,
        }
    }

    /// Wire name of the message kind, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::Greeting { .. } => "greeting",
            ServerMessage::EmotionDetected { .. } => "emotion_detected",
            ServerMessage::ResponseText { .. } => "response_text",
            ServerMessage::LipSyncData { .. } => "lip_sync_data",
            ServerMessage::AudioData { .. } => "audio_data",
            ServerMessage::ResponseComplete => "response_complete",
            ServerMessage::Error { .. } => "error",
            ServerMessage::ControlResponse { .. } => "control_response",
            ServerMessage::Status { .. } => "status",
        }
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Error type for message validation failures
#[derive(Debug, Clone, Error)]
pub enum ProtocolError {
    /// Input text exceeds the maximum allowed size
    #[error("input text too large: {size} bytes (max: {max} bytes)")]
    TextTooLarge { size: usize, max: usize },
}

impl ClientMessage {
    /// Validates user-provided field sizes to bound per-message memory.
    pub fn validate_size(&self) -> Result<(), ProtocolError> {
        match self {
            ClientMessage::TextInput { text } | ClientMessage::Transcription { text } => {
                let size = text.len();
                if size > MAX_INPUT_TEXT_SIZE {
                    return Err(ProtocolError::TextTooLarge {
                        size,
                        max: MAX_INPUT_TEXT_SIZE,
                    });
                }
                Ok(())
            }
            ClientMessage::Control { .. } => Ok(()),
        }
    }
}
