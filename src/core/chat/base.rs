//! Reply generator trait, configuration, and error type.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use zeroize::ZeroizeOnDrop;

use crate::core::emotion::Emotion;

/// Errors surfaced by reply generator adapters
#[derive(Debug, Clone, Error)]
pub enum GenerateError {
    /// Constructor-time configuration problem
    #[error("invalid generator configuration: {0}")]
    InvalidConfiguration(String),

    /// The request never produced an HTTP response
    #[error("generation request failed: {0}")]
    Request(String),

    /// The endpoint answered with a non-success status
    #[error("generation endpoint returned {status}: {detail}")]
    Endpoint { status: u16, detail: String },

    /// The endpoint answered 200 but the body had no usable reply
    #[error("malformed generation response: {0}")]
    Malformed(String),
}

/// Result type for generator operations
pub type GenerateResult<T> = Result<T, GenerateError>;

/// One completed exchange used to condition later prompts
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    /// What the user said
    pub user: String,
    /// What the assistant replied
    pub assistant: String,
}

/// Generator configuration handed to constructors.
///
/// Empty `base_url` or `api_token` selects the canned fallback in the
/// factory. The token is wiped from memory when the config is dropped.
#[derive(Debug, Clone, ZeroizeOnDrop)]
pub struct GeneratorConfig {
    /// Base URL of the model-serving workspace (empty = canned fallback)
    #[zeroize(skip)]
    pub base_url: String,
    /// Bearer token for the workspace
    pub api_token: String,
    /// Serving endpoint name, interpolated into the invocation path
    #[zeroize(skip)]
    pub endpoint_name: String,
    /// System prompt; `{emotion}` is replaced with the detected label
    #[zeroize(skip)]
    pub system_prompt: String,
    /// Token budget per reply
    #[zeroize(skip)]
    pub max_tokens: u32,
    /// Sampling temperature
    #[zeroize(skip)]
    pub temperature: f32,
    /// How many recent turns condition the prompt
    #[zeroize(skip)]
    pub history_depth: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            base_url: String::new(),
            api_token: String::new(),
            endpoint_name: "databricks-meta-llama-3-1-8b-instruct".to_string(),
            system_prompt: default_system_prompt(),
            max_tokens: 300,
            temperature: 0.7,
            history_depth: 3,
        }
    }
}

/// Stock system prompt for the assistant persona
pub fn default_system_prompt() -> String {
    "You are DataBot, a helpful and friendly AI assistant for Databricks.\n\
     You help users with questions about Databricks products, features, and best practices.\n\n\
     Key responsibilities:\n\
     - Answer questions about Databricks platform, tools, and services\n\
     - Provide code examples and best practices\n\
     - Explain technical concepts clearly\n\
     - Be empathetic and adjust your tone based on the user's emotional state\n\
     - Keep responses concise but thorough\n\n\
     Current user emotion: {emotion}\n\n\
     Be helpful, accurate, and friendly. Keep responses under 200 words for conversational flow."
        .to_string()
}

/// Adapter interface for reply generation.
///
/// `history` is the caller's recent-turns window, oldest first; the
/// detected emotion conditions the prompt framing. Timeout policy lives in
/// the pipeline, not here.
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    /// Generate one reply to the user input.
    async fn generate(
        &self,
        input: &str,
        emotion: Emotion,
        history: &[Turn],
    ) -> GenerateResult<String>;

    /// Implementation name, reported in `/health` and `status`.
    fn name(&self) -> &'static str;
}

/// Shared generator handle used across sessions
pub type SharedGenerator = Arc<dyn ReplyGenerator>;
