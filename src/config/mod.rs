//! Layered gateway configuration.
//!
//! Values resolve in three layers: built-in defaults, then `VISAGE_*`
//! environment overrides, then an optional YAML file applied on top. The
//! file wins wherever it sets a value. [`Config::validate`] rejects
//! unusable combinations before the server starts.

use std::path::Path;

use http::HeaderValue;
use thiserror::Error;
use url::Url;

use crate::core::chat::GeneratorConfig;
use crate::core::pipeline::StageTimeouts;
use crate::core::speech::{AudioEncoding, SynthesizerConfig};

mod yaml;

pub use yaml::YamlConfig;

/// Configuration loading and validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: String, reason: String },

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// HTTP and WebSocket server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind host
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Allowed CORS origins; a literal `"*"` opens the server to any origin
    pub cors_origins: Vec<String>,
    /// Greeting sent when a WebSocket connection is established
    pub greeting: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(),
            ],
            greeting: "Hello! I'm your Databricks assistant. How can I help you today?"
                .to_string(),
        }
    }
}

/// Result cache settings.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Whether completed replies are cached at all
    pub enabled: bool,
    /// Seconds a stored reply stays servable
    pub ttl_secs: u64,
    /// Maximum stored replies before least-recently-used eviction
    pub capacity: usize,
    /// Seconds between background expiry sweeps
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            enabled: true,
            ttl_secs: 3600,
            capacity: 1000,
            sweep_interval_secs: 60,
        }
    }
}

/// Per-stage pipeline budgets, in seconds.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutsConfig {
    pub classification_secs: u64,
    pub generation_secs: u64,
    pub synthesis_secs: u64,
    pub extraction_secs: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        TimeoutsConfig {
            classification_secs: 2,
            generation_secs: 8,
            synthesis_secs: 8,
            extraction_secs: 4,
        }
    }
}

impl TimeoutsConfig {
    /// Budgets as durations for the orchestrator.
    pub fn stage_timeouts(&self) -> StageTimeouts {
        StageTimeouts {
            classification: std::time::Duration::from_secs(self.classification_secs),
            generation: std::time::Duration::from_secs(self.generation_secs),
            synthesis: std::time::Duration::from_secs(self.synthesis_secs),
            extraction: std::time::Duration::from_secs(self.extraction_secs),
        }
    }
}

/// Complete gateway configuration.
///
/// The chat and speech sections carry credentials and are zeroized when
/// the config drops.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub chat: GeneratorConfig,
    pub speech: SynthesizerConfig,
    pub timeouts: TimeoutsConfig,
}

impl Config {
    /// Builds the configuration from defaults plus `VISAGE_*` environment
    /// overrides.
    pub fn from_env() -> Result<Config, ConfigError> {
        let mut config = Config::default();

        if let Some(host) = read_env("VISAGE_HOST") {
            config.server.host = host;
        }
        config.server.port = parse_env("VISAGE_PORT", config.server.port)?;
        if let Some(greeting) = read_env("VISAGE_GREETING") {
            config.server.greeting = greeting;
        }
        if let Some(origins) = read_env("VISAGE_CORS_ORIGINS") {
            config.server.cors_origins = origins
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect();
        }

        config.cache.enabled = parse_env("VISAGE_CACHE_ENABLED", config.cache.enabled)?;
        config.cache.ttl_secs = parse_env("VISAGE_CACHE_TTL_SECS", config.cache.ttl_secs)?;
        config.cache.capacity = parse_env("VISAGE_CACHE_CAPACITY", config.cache.capacity)?;
        config.cache.sweep_interval_secs =
            parse_env("VISAGE_CACHE_SWEEP_SECS", config.cache.sweep_interval_secs)?;

        if let Some(base_url) = read_env("VISAGE_CHAT_BASE_URL") {
            config.chat.base_url = base_url;
        }
        if let Some(token) = read_env("VISAGE_CHAT_TOKEN") {
            config.chat.api_token = token;
        }
        if let Some(endpoint) = read_env("VISAGE_CHAT_ENDPOINT") {
            config.chat.endpoint_name = endpoint;
        }
        if let Some(prompt) = read_env("VISAGE_CHAT_SYSTEM_PROMPT") {
            config.chat.system_prompt = prompt;
        }
        config.chat.max_tokens = parse_env("VISAGE_CHAT_MAX_TOKENS", config.chat.max_tokens)?;
        config.chat.temperature = parse_env("VISAGE_CHAT_TEMPERATURE", config.chat.temperature)?;
        config.chat.history_depth =
            parse_env("VISAGE_CHAT_HISTORY_DEPTH", config.chat.history_depth)?;

        if let Some(endpoint) = read_env("VISAGE_SPEECH_ENDPOINT") {
            config.speech.endpoint = endpoint;
        }
        if let Some(api_key) = read_env("VISAGE_SPEECH_API_KEY") {
            config.speech.api_key = api_key;
        }
        if let Some(model) = read_env("VISAGE_SPEECH_MODEL") {
            config.speech.model = model;
        }
        if let Some(voice) = read_env("VISAGE_SPEECH_VOICE") {
            config.speech.voice = voice;
        }
        if let Some(format) = read_env("VISAGE_SPEECH_FORMAT") {
            config.speech.encoding =
                AudioEncoding::from_label(&format).ok_or_else(|| ConfigError::Invalid {
                    field: "VISAGE_SPEECH_FORMAT".to_string(),
                    reason: format!("unknown audio format '{format}'"),
                })?;
        }
        config.speech.speed = parse_env("VISAGE_SPEECH_SPEED", config.speech.speed)?;

        config.timeouts.classification_secs = parse_env(
            "VISAGE_TIMEOUT_CLASSIFICATION_SECS",
            config.timeouts.classification_secs,
        )?;
        config.timeouts.generation_secs = parse_env(
            "VISAGE_TIMEOUT_GENERATION_SECS",
            config.timeouts.generation_secs,
        )?;
        config.timeouts.synthesis_secs = parse_env(
            "VISAGE_TIMEOUT_SYNTHESIS_SECS",
            config.timeouts.synthesis_secs,
        )?;
        config.timeouts.extraction_secs = parse_env(
            "VISAGE_TIMEOUT_EXTRACTION_SECS",
            config.timeouts.extraction_secs,
        )?;

        Ok(config)
    }

    /// Applies YAML overrides from `path` on top of the current values.
    pub fn apply_yaml_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let overrides: YamlConfig =
            serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        overrides.apply(self)
    }

    /// Rejects unusable values before the server starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.chat.base_url.is_empty() {
            Url::parse(&self.chat.base_url).map_err(|error| ConfigError::Invalid {
                field: "chat.base_url".to_string(),
                reason: format!("'{}' is not a valid URL: {error}", self.chat.base_url),
            })?;
        }
        if self.chat.max_tokens == 0 {
            return Err(ConfigError::Invalid {
                field: "chat.max_tokens".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if !(0.0..=2.0).contains(&self.chat.temperature) {
            return Err(ConfigError::Invalid {
                field: "chat.temperature".to_string(),
                reason: format!("{} is outside 0.0..=2.0", self.chat.temperature),
            });
        }

        if !self.speech.endpoint.is_empty() {
            Url::parse(&self.speech.endpoint).map_err(|error| ConfigError::Invalid {
                field: "speech.endpoint".to_string(),
                reason: format!("'{}' is not a valid URL: {error}", self.speech.endpoint),
            })?;
        }
        if !(0.25..=4.0).contains(&self.speech.speed) {
            return Err(ConfigError::Invalid {
                field: "speech.speed".to_string(),
                reason: format!("{} is outside 0.25..=4.0", self.speech.speed),
            });
        }

        if self.cache.enabled {
            if self.cache.ttl_secs == 0 {
                return Err(ConfigError::Invalid {
                    field: "cache.ttl_secs".to_string(),
                    reason: "must be positive when the cache is enabled".to_string(),
                });
            }
            if self.cache.capacity == 0 {
                return Err(ConfigError::Invalid {
                    field: "cache.capacity".to_string(),
                    reason: "must be positive when the cache is enabled".to_string(),
                });
            }
            if self.cache.sweep_interval_secs == 0 {
                return Err(ConfigError::Invalid {
                    field: "cache.sweep_interval_secs".to_string(),
                    reason: "must be positive when the cache is enabled".to_string(),
                });
            }
        }

        for (field, secs) in [
            (
                "timeouts.classification_secs",
                self.timeouts.classification_secs,
            ),
            ("timeouts.generation_secs", self.timeouts.generation_secs),
            ("timeouts.synthesis_secs", self.timeouts.synthesis_secs),
            ("timeouts.extraction_secs", self.timeouts.extraction_secs),
        ] {
            if secs == 0 {
                return Err(ConfigError::Invalid {
                    field: field.to_string(),
                    reason: "must be positive".to_string(),
                });
            }
        }

        for origin in &self.server.cors_origins {
            if origin != "*" && origin.parse::<HeaderValue>().is_err() {
                return Err(ConfigError::Invalid {
                    field: "server.cors_origins".to_string(),
                    reason: format!("'{origin}' is not a valid origin"),
                });
            }
        }

        Ok(())
    }
}

/// Non-empty environment value, if set.
fn read_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

/// Parses an environment value, keeping `default` when the variable is
/// unset or empty.
fn parse_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match read_env(key) {
        Some(raw) => raw.parse().map_err(|error| ConfigError::Invalid {
            field: key.to_string(),
            reason: format!("cannot parse '{raw}': {error}"),
        }),
        None => Ok(default),
    }
}
