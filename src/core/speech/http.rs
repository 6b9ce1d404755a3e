//! HTTP synthesizer for OpenAI-style speech endpoints.
//!
//! One POST per reply: JSON request in, binary audio out. Compatible with
//! any endpoint speaking the `/v1/audio/speech` shape.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;
use url::Url;

use super::base::{SpeechSynthesizer, SynthesisError, SynthesisResult, SynthesizerConfig};
use super::types::Synthesis;

/// Longest error body echoed into a [`SynthesisError::Endpoint`]
const MAX_ERROR_DETAIL: usize = 256;

/// Request body for OpenAI-style synthesis endpoints
#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'a str,
    speed: f32,
}

/// Synthesizer over an OpenAI-style HTTP speech endpoint
pub struct HttpSynthesizer {
    config: SynthesizerConfig,
    client: Client,
}

impl HttpSynthesizer {
    /// Creates the synthesizer, validating the endpoint URL up front.
    pub fn new(config: SynthesizerConfig) -> SynthesisResult<Self> {
        Url::parse(&config.endpoint).map_err(|e| {
            SynthesisError::InvalidConfiguration(format!(
                "invalid speech endpoint '{}': {}",
                config.endpoint, e
            ))
        })?;

        Ok(HttpSynthesizer {
            config,
            client: Client::new(),
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpSynthesizer {
    async fn synthesize(&self, text: &str) -> SynthesisResult<Synthesis> {
        let body = SpeechRequest {
            model: &self.config.model,
            input: text,
            voice: &self.config.voice,
            response_format: self.config.encoding.as_str(),
            speed: self.config.speed,
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .header(reqwest::header::ACCEPT, self.config.encoding.content_type())
            .json(&body)
            .send()
            .await
            .map_err(|e| SynthesisError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let mut detail = response.text().await.unwrap_or_default();
            detail.truncate(MAX_ERROR_DETAIL);
            return Err(SynthesisError::Endpoint {
                status: status.as_u16(),
                detail,
            });
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| SynthesisError::Request(format!("reading audio body: {e}")))?;

        debug!(
            bytes = audio.len(),
            voice = %self.config.voice,
            format = %self.config.encoding,
            "synthesized speech"
        );
        Ok(Synthesis::new(audio, self.config.encoding))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::speech::AudioEncoding;

    fn config(endpoint: &str) -> SynthesizerConfig {
        let mut config = SynthesizerConfig::default();
        config.endpoint = endpoint.to_string();
        config.api_key = "test-key".to_string();
        config
    }

    #[test]
    fn test_new_rejects_invalid_endpoint() {
        let result = HttpSynthesizer::new(config("not a url"));
        assert!(matches!(
            result,
            Err(SynthesisError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_new_accepts_https_endpoint() {
        let result = HttpSynthesizer::new(config("https://api.example.com/v1/audio/speech"));
        assert!(result.is_ok());
    }

    #[test]
    fn test_request_body_shape() {
        let body = SpeechRequest {
            model: "tts-1",
            input: "hello",
            voice: "alloy",
            response_format: AudioEncoding::Wav.as_str(),
            speed: 1.0,
        };
        let json = serde_json::to_string(&body).expect("Should serialize");
        assert!(json.contains(r#""model":"tts-1""#));
        assert!(json.contains(r#""input":"hello""#));
        assert!(json.contains(r#""response_format":"wav""#));
        assert!(json.contains(r#""speed":1.0"#));
    }
}
