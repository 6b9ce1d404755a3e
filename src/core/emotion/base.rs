//! Classifier adapter trait and error type.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use super::types::Classification;

/// Errors surfaced by classifier adapters.
///
/// These never abort a request: the pipeline substitutes
/// [`Classification::neutral_fallback`] and continues.
#[derive(Debug, Clone, Error)]
pub enum ClassifyError {
    /// The classifier backend could not produce a reading
    #[error("emotion classifier unavailable: {0}")]
    Unavailable(String),
}

/// Result type for classifier operations
pub type ClassifyResult<T> = Result<T, ClassifyError>;

/// Adapter interface for emotion classification.
///
/// One reading per user input. Timeout policy lives in the pipeline, not
/// here; implementations just do the work and report faults.
#[async_trait]
pub trait EmotionClassifier: Send + Sync {
    /// Classify the dominant emotion of one user input.
    async fn classify(&self, text: &str) -> ClassifyResult<Classification>;

    /// Implementation name, reported in `/health` and `status`.
    fn name(&self) -> &'static str;
}

/// Shared classifier handle used across sessions
pub type SharedClassifier = Arc<dyn EmotionClassifier>;
