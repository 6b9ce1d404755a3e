//! Speech synthesis adapter.
//!
//! The pipeline turns reply text into audio through the
//! [`SpeechSynthesizer`] trait. [`create_synthesizer`] selects the HTTP
//! implementation when an endpoint is configured and the silent offline
//! fallback otherwise, so the server always runs end to end.

mod base;
mod http;
mod offline;
mod types;

pub use base::{
    SharedSynthesizer, SpeechSynthesizer, SynthesisError, SynthesisResult, SynthesizerConfig,
};
pub use http::HttpSynthesizer;
pub use offline::{OfflineSynthesizer, estimate_duration_ms};
pub use types::{AudioEncoding, Synthesis};

use std::sync::Arc;
use tracing::warn;

/// Builds the synthesizer the configuration calls for.
///
/// A configured endpoint selects [`HttpSynthesizer`]; an empty endpoint
/// falls back to [`OfflineSynthesizer`] with a startup warning.
pub fn create_synthesizer(config: SynthesizerConfig) -> SynthesisResult<SharedSynthesizer> {
    if config.endpoint.is_empty() {
        warn!("no speech endpoint configured, using silent offline synthesizer");
        return Ok(Arc::new(OfflineSynthesizer::new()));
    }
    Ok(Arc::new(HttpSynthesizer::new(config)?))
}
