//! Synthesizer adapter trait, configuration, and error type.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use zeroize::ZeroizeOnDrop;

use super::types::{AudioEncoding, Synthesis};

/// Errors surfaced by synthesizer adapters
#[derive(Debug, Clone, Error)]
pub enum SynthesisError {
    /// Constructor-time configuration problem
    #[error("invalid synthesizer configuration: {0}")]
    InvalidConfiguration(String),

    /// The request never produced an HTTP response
    #[error("speech request failed: {0}")]
    Request(String),

    /// The endpoint answered with a non-success status
    #[error("speech endpoint returned {status}: {detail}")]
    Endpoint { status: u16, detail: String },

    /// Local audio encoding failed
    #[error("audio encoding failed: {0}")]
    Encoding(String),
}

/// Result type for synthesizer operations
pub type SynthesisResult<T> = Result<T, SynthesisError>;

/// Voice configuration handed to synthesizer constructors.
///
/// An empty `endpoint` selects the offline fallback in the factory. The API
/// key is wiped from memory when the config is dropped.
#[derive(Debug, Clone, ZeroizeOnDrop)]
pub struct SynthesizerConfig {
    /// Full URL of the synthesis endpoint (empty = offline fallback)
    #[zeroize(skip)]
    pub endpoint: String,
    /// Bearer token for the endpoint
    pub api_key: String,
    /// Model name sent in the request body
    #[zeroize(skip)]
    pub model: String,
    /// Voice name sent in the request body
    #[zeroize(skip)]
    pub voice: String,
    /// Requested audio encoding
    #[zeroize(skip)]
    pub encoding: AudioEncoding,
    /// Speaking speed multiplier
    #[zeroize(skip)]
    pub speed: f32,
}

impl Default for SynthesizerConfig {
    fn default() -> Self {
        SynthesizerConfig {
            endpoint: String::new(),
            api_key: String::new(),
            model: "tts-1".to_string(),
            voice: "alloy".to_string(),
            encoding: AudioEncoding::Wav,
            speed: 1.0,
        }
    }
}

/// Adapter interface for speech synthesis.
///
/// Voice parameters are constructor state; one call synthesizes one reply.
/// Timeout policy lives in the pipeline, not here.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize the reply text into audio.
    async fn synthesize(&self, text: &str) -> SynthesisResult<Synthesis>;

    /// Implementation name, reported in `/health` and `status`.
    fn name(&self) -> &'static str;
}

/// Shared synthesizer handle used across sessions
pub type SharedSynthesizer = Arc<dyn SpeechSynthesizer>;
