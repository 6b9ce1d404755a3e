//! Request and reply types flowing through the pipeline.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::time::Instant;
use uuid::Uuid;

use super::error::PipelineError;
use crate::core::emotion::{Classification, Emotion};
use crate::core::speech::AudioEncoding;
use crate::core::viseme::VisemeFrame;

/// Per-stage time budgets. A stage that exceeds its budget fails the
/// request exactly like an adapter error from that stage.
#[derive(Debug, Clone, Copy)]
pub struct StageTimeouts {
    pub classification: Duration,
    pub generation: Duration,
    pub synthesis: Duration,
    pub extraction: Duration,
}

impl Default for StageTimeouts {
    fn default() -> Self {
        StageTimeouts {
            classification: Duration::from_secs(2),
            generation: Duration::from_secs(8),
            synthesis: Duration::from_secs(8),
            extraction: Duration::from_secs(4),
        }
    }
}

/// One user input, validated and normalized.
#[derive(Debug, Clone)]
pub struct Request {
    /// Unique request id
    pub id: String,
    /// Trimmed input as typed; what the adapters see
    pub text: String,
    /// Trimmed, case-folded input; the cache key
    pub normalized: String,
    /// Arrival time, for latency logs
    pub received_at: Instant,
    /// Originating session id, or `"http"` for one-shot queries
    pub session_id: String,
}

impl Request {
    /// Validates and normalizes one input.
    ///
    /// Empty and whitespace-only input is rejected here, before any run
    /// state exists for it.
    pub fn new(input: &str, session_id: &str) -> Result<Request, PipelineError> {
        let text = input.trim();
        if text.is_empty() {
            return Err(PipelineError::InputRejected(
                "input text is empty".to_string(),
            ));
        }
        Ok(Request {
            id: Uuid::new_v4().to_string(),
            text: text.to_string(),
            normalized: text.to_lowercase(),
            received_at: Instant::now(),
            session_id: session_id.to_string(),
        })
    }
}

/// A completed reply with all of its artifacts; the cache entry value.
///
/// Bundles are immutable once built. Cache hits and joiners replay from
/// the same shared allocation.
#[derive(Debug, Clone)]
pub struct ReplyBundle {
    /// Generated reply text
    pub text: String,
    /// Emotion detected on the input that produced the bundle
    pub emotion: Emotion,
    /// Synthesized speech audio
    pub audio: Bytes,
    /// Encoding of `audio`
    pub encoding: AudioEncoding,
    /// Mouth-shape timeline tracking `audio`
    pub visemes: Vec<VisemeFrame>,
    /// Total timeline duration in milliseconds
    pub duration_ms: u64,
}

/// Outcome of a one-shot query.
#[derive(Debug, Clone)]
pub struct QueryReply {
    /// The reply bundle, possibly shared with the cache
    pub bundle: Arc<ReplyBundle>,
    /// Fresh classifier reading for this query
    pub classification: Classification,
    /// Whether the bundle predates this query
    pub cached: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_trims_and_folds_case() {
        let request = Request::new("  What is Delta Lake?  ", "s1").expect("Should accept input");
        assert_eq!(request.text, "What is Delta Lake?");
        assert_eq!(request.normalized, "what is delta lake?");
        assert_eq!(request.session_id, "s1");
    }

    #[test]
    fn test_request_rejects_empty_input() {
        assert!(matches!(
            Request::new("", "s1"),
            Err(PipelineError::InputRejected(_))
        ));
        assert!(matches!(
            Request::new("   \n\t ", "s1"),
            Err(PipelineError::InputRejected(_))
        ));
    }

    #[test]
    fn test_request_ids_are_unique() {
        let a = Request::new("hello", "s1").expect("Should accept input");
        let b = Request::new("hello", "s1").expect("Should accept input");
        assert_ne!(a.id, b.id);
        assert_eq!(a.normalized, b.normalized, "same input must share a cache key");
    }

    #[test]
    fn test_default_stage_budgets() {
        let timeouts = StageTimeouts::default();
        assert_eq!(timeouts.classification, Duration::from_secs(2));
        assert_eq!(timeouts.generation, Duration::from_secs(8));
        assert_eq!(timeouts.synthesis, Duration::from_secs(8));
        assert_eq!(timeouts.extraction, Duration::from_secs(4));
    }
}
