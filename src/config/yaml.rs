//! YAML configuration file support.
//!
//! Every field is optional so files can be partial; values that are
//! present override whatever the environment layer produced.
//!
//! # Example YAML structure
//! ```yaml
//! server:
//!   host: "0.0.0.0"
//!   port: 8000
//!   greeting: "Hello! I'm your Databricks assistant. How can I help you today?"
//!   cors_origins:
//!     - "http://localhost:3000"
//!     - "http://localhost:5173"
//!
//! cache:
//!   enabled: true
//!   ttl_secs: 3600
//!   capacity: 1000
//!   sweep_interval_secs: 60
//!
//! chat:
//!   base_url: "https://your-workspace.cloud.databricks.com"
//!   api_token: "dapi-your-token"
//!   endpoint_name: "databricks-meta-llama-3-1-8b-instruct"
//!   max_tokens: 300
//!   temperature: 0.7
//!   history_depth: 3
//!
//! speech:
//!   endpoint: "https://api.openai.com/v1/audio/speech"
//!   api_key: "sk-your-key"
//!   model: "tts-1"
//!   voice: "alloy"
//!   format: "wav"
//!   speed: 1.0
//!
//! timeouts:
//!   classification_secs: 2
//!   generation_secs: 8
//!   synthesis_secs: 8
//!   extraction_secs: 4
//! ```

use serde::Deserialize;

use super::{Config, ConfigError};
use crate::core::speech::AudioEncoding;

/// Root of a YAML configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub cache: Option<CacheYaml>,
    pub chat: Option<ChatYaml>,
    pub speech: Option<SpeechYaml>,
    pub timeouts: Option<TimeoutsYaml>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub cors_origins: Option<Vec<String>>,
    pub greeting: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CacheYaml {
    pub enabled: Option<bool>,
    pub ttl_secs: Option<u64>,
    pub capacity: Option<usize>,
    pub sweep_interval_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChatYaml {
    pub base_url: Option<String>,
    pub api_token: Option<String>,
    pub endpoint_name: Option<String>,
    pub system_prompt: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub history_depth: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SpeechYaml {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub voice: Option<String>,
    pub format: Option<String>,
    pub speed: Option<f32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TimeoutsYaml {
    pub classification_secs: Option<u64>,
    pub generation_secs: Option<u64>,
    pub synthesis_secs: Option<u64>,
    pub extraction_secs: Option<u64>,
}

impl YamlConfig {
    /// Applies every present value onto `config`.
    pub fn apply(self, config: &mut Config) -> Result<(), ConfigError> {
        if let Some(server) = self.server {
            if let Some(host) = server.host {
                config.server.host = host;
            }
            if let Some(port) = server.port {
                config.server.port = port;
            }
            if let Some(cors_origins) = server.cors_origins {
                config.server.cors_origins = cors_origins;
            }
            if let Some(greeting) = server.greeting {
                config.server.greeting = greeting;
            }
        }

        if let Some(cache) = self.cache {
            if let Some(enabled) = cache.enabled {
                config.cache.enabled = enabled;
            }
            if let Some(ttl_secs) = cache.ttl_secs {
                config.cache.ttl_secs = ttl_secs;
            }
            if let Some(capacity) = cache.capacity {
                config.cache.capacity = capacity;
            }
            if let Some(sweep_interval_secs) = cache.sweep_interval_secs {
                config.cache.sweep_interval_secs = sweep_interval_secs;
            }
        }

        if let Some(chat) = self.chat {
            if let Some(base_url) = chat.base_url {
                config.chat.base_url = base_url;
            }
            if let Some(api_token) = chat.api_token {
                config.chat.api_token = api_token;
            }
            if let Some(endpoint_name) = chat.endpoint_name {
                config.chat.endpoint_name = endpoint_name;
            }
            if let Some(system_prompt) = chat.system_prompt {
                config.chat.system_prompt = system_prompt;
            }
            if let Some(max_tokens) = chat.max_tokens {
                config.chat.max_tokens = max_tokens;
            }
            if let Some(temperature) = chat.temperature {
                config.chat.temperature = temperature;
            }
            if let Some(history_depth) = chat.history_depth {
                config.chat.history_depth = history_depth;
            }
        }

        if let Some(speech) = self.speech {
            if let Some(endpoint) = speech.endpoint {
                config.speech.endpoint = endpoint;
            }
            if let Some(api_key) = speech.api_key {
                config.speech.api_key = api_key;
            }
            if let Some(model) = speech.model {
                config.speech.model = model;
            }
            if let Some(voice) = speech.voice {
                config.speech.voice = voice;
            }
            if let Some(format) = speech.format {
                config.speech.encoding =
                    AudioEncoding::from_label(&format).ok_or_else(|| ConfigError::Invalid {
                        field: "speech.format".to_string(),
                        reason: format!("unknown audio format '{format}'"),
                    })?;
            }
            if let Some(speed) = speech.speed {
                config.speech.speed = speed;
            }
        }

        if let Some(timeouts) = self.timeouts {
            if let Some(classification_secs) = timeouts.classification_secs {
                config.timeouts.classification_secs = classification_secs;
            }
            if let Some(generation_secs) = timeouts.generation_secs {
                config.timeouts.generation_secs = generation_secs;
            }
            if let Some(synthesis_secs) = timeouts.synthesis_secs {
                config.timeouts.synthesis_secs = synthesis_secs;
            }
            if let Some(extraction_secs) = timeouts.extraction_secs {
                config.timeouts.extraction_secs = extraction_secs;
            }
        }

        Ok(())
    }
}
