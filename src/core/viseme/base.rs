//! Viseme extractor trait and error type.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use super::types::VisemeFrame;

/// Errors surfaced by viseme extraction adapters
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    /// The extractor backend failed to produce a timeline
    #[error("viseme extraction failed: {0}")]
    Failed(String),
}

/// Result type for extractor operations
pub type ExtractResult<T> = Result<T, ExtractError>;

/// Adapter interface for lip-sync timing extraction.
///
/// Produces an ordered, non-overlapping frame timeline for one reply.
/// `audio` is the synthesized speech the timeline must track; extractors
/// that cannot read timing out of the bytes fall back to estimates.
#[async_trait]
pub trait VisemeExtractor: Send + Sync {
    /// Extract a mouth-shape timeline for the reply.
    async fn extract(&self, text: &str, audio: &[u8]) -> ExtractResult<Vec<VisemeFrame>>;

    /// Implementation name, reported in `/health` and `status`.
    fn name(&self) -> &'static str;
}

/// Shared extractor handle used across sessions
pub type SharedExtractor = Arc<dyn VisemeExtractor>;
