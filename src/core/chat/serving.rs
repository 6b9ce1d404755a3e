//! Reply generator over a model-serving endpoint.
//!
//! Speaks the serving-endpoint invocation shape:
//! `POST {base}/serving-endpoints/{name}/invocations` with a bearer token
//! and an OpenAI-style `messages` body; the reply is read from
//! `choices[0].message.content`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use super::base::{GenerateError, GenerateResult, GeneratorConfig, ReplyGenerator, Turn};
use crate::core::emotion::Emotion;

/// Longest error body echoed into a [`GenerateError::Endpoint`]
const MAX_ERROR_DETAIL: usize = 256;

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct InvocationRequest {
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct InvocationResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: String,
}

/// Generator invoking a configured model-serving endpoint
pub struct ServingEndpointChat {
    config: GeneratorConfig,
    url: String,
    client: Client,
}

impl ServingEndpointChat {
    /// Creates the generator, validating the workspace URL up front.
    pub fn new(config: GeneratorConfig) -> GenerateResult<Self> {
        Url::parse(&config.base_url).map_err(|e| {
            GenerateError::InvalidConfiguration(format!(
                "invalid serving base URL '{}': {}",
                config.base_url, e
            ))
        })?;
        if config.endpoint_name.is_empty() {
            return Err(GenerateError::InvalidConfiguration(
                "serving endpoint name is empty".to_string(),
            ));
        }

        let url = format!(
            "{}/serving-endpoints/{}/invocations",
            config.base_url.trim_end_matches('/'),
            config.endpoint_name
        );

        Ok(ServingEndpointChat {
            config,
            url,
            client: Client::new(),
        })
    }

    /// Assembles the prompt: system message, recent-turns window, current
    /// input.
    fn build_messages(&self, input: &str, emotion: Emotion, history: &[Turn]) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(2 + history.len() * 2);
        messages.push(ChatMessage {
            role: "system",
            content: self
                .config
                .system_prompt
                .replace("{emotion}", emotion.as_str()),
        });

        let window_start = history.len().saturating_sub(self.config.history_depth);
        for turn in &history[window_start..] {
            messages.push(ChatMessage {
                role: "user",
                content: turn.user.clone(),
            });
            messages.push(ChatMessage {
                role: "assistant",
                content: turn.assistant.clone(),
            });
        }

        messages.push(ChatMessage {
            role: "user",
            content: input.to_string(),
        });
        messages
    }
}

#[async_trait]
impl ReplyGenerator for ServingEndpointChat {
    async fn generate(
        &self,
        input: &str,
        emotion: Emotion,
        history: &[Turn],
    ) -> GenerateResult<String> {
        let body = InvocationRequest {
            messages: self.build_messages(input, emotion, history),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.config.api_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerateError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let mut detail = response.text().await.unwrap_or_default();
            detail.truncate(MAX_ERROR_DETAIL);
            return Err(GenerateError::Endpoint {
                status: status.as_u16(),
                detail,
            });
        }

        let parsed: InvocationResponse = response
            .json()
            .await
            .map_err(|e| GenerateError::Malformed(e.to_string()))?;

        let reply = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| GenerateError::Malformed("response had no choices".to_string()))?;

        debug!(chars = reply.len(), "generated reply");
        Ok(reply)
    }

    fn name(&self) -> &'static str {
        "serving-endpoint"
    }
}
