//! Pipeline stages and the request-scoped error type.

use std::time::Duration;
use thiserror::Error;

use crate::core::cache::CacheError;
use crate::core::chat::GenerateError;
use crate::core::speech::SynthesisError;
use crate::core::viseme::ExtractError;

/// Stages of one request's task graph, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Emotion classification (never fatal to the request)
    Classification,
    /// Reply text generation
    Generation,
    /// Speech synthesis
    Synthesis,
    /// Lip-sync timing extraction
    Extraction,
}

impl Stage {
    /// Stage name carried on `error` events and in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Classification => "classification",
            Stage::Generation => "generation",
            Stage::Synthesis => "synthesis",
            Stage::Extraction => "extraction",
        }
    }
}

/// Failure of one request's pipeline.
///
/// `Clone` because a failure inside a shared single-flight computation is
/// delivered to every waiter. Each variant knows which stage it names on
/// the wire.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    /// Input was empty or otherwise unusable; no request was started
    #[error("input rejected: {0}")]
    InputRejected(String),

    /// Reply generation failed
    #[error(transparent)]
    Generation(#[from] GenerateError),

    /// Speech synthesis failed
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    /// Lip-sync extraction failed
    #[error(transparent)]
    Extraction(#[from] ExtractError),

    /// A stage exceeded its configured time budget
    #[error("{} timed out after {timeout:?}", stage.as_str())]
    StageTimeout { stage: Stage, timeout: Duration },

    /// The single-flight computation died without reporting
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl PipelineError {
    /// Stage name for the `error` event's `stage` field.
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::InputRejected(_) => "input",
            PipelineError::Generation(_) => Stage::Generation.as_str(),
            PipelineError::Synthesis(_) => Stage::Synthesis.as_str(),
            PipelineError::Extraction(_) => Stage::Extraction.as_str(),
            PipelineError::StageTimeout { stage, .. } => stage.as_str(),
            PipelineError::Cache(_) => "cache",
        }
    }
}
