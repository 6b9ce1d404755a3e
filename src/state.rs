//! Shared application state assembled at startup.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::config::{Config, ConfigError};
use crate::core::chat::create_generator;
use crate::core::emotion::{LexiconClassifier, SharedClassifier};
use crate::core::pipeline::{Adapters, Orchestrator, ReplyCache};
use crate::core::speech::create_synthesizer;
use crate::core::viseme::{PhonemeExtractor, SharedExtractor};
use crate::protocol::ServiceModes;
use crate::session::SessionRegistry;

/// Process-wide state shared by every handler.
pub struct AppState {
    /// Validated configuration snapshot
    pub config: Config,
    /// Open WebSocket sessions
    pub sessions: SessionRegistry,
    /// The response pipeline
    pub orchestrator: Arc<Orchestrator>,
    /// Result cache handle; `None` when disabled by configuration
    pub cache: Option<ReplyCache>,
    adapters: Adapters,
}

impl AppState {
    /// Builds adapters, cache, and orchestrator from the configuration.
    ///
    /// Spawns the cache sweeper, so it must run inside the tokio runtime.
    pub fn new(config: Config) -> Result<AppState, ConfigError> {
        let classifier: SharedClassifier = Arc::new(LexiconClassifier::new());
        let generator =
            create_generator(config.chat.clone()).map_err(|error| ConfigError::Invalid {
                field: "chat".to_string(),
                reason: error.to_string(),
            })?;
        let synthesizer =
            create_synthesizer(config.speech.clone()).map_err(|error| ConfigError::Invalid {
                field: "speech".to_string(),
                reason: error.to_string(),
            })?;
        let extractor: SharedExtractor = Arc::new(PhonemeExtractor::new());

        let adapters = Adapters {
            classifier,
            generator,
            synthesizer,
            extractor,
        };
        info!(
            chat = adapters.generator.name(),
            speech = adapters.synthesizer.name(),
            emotion = adapters.classifier.name(),
            viseme = adapters.extractor.name(),
            "service adapters ready"
        );

        let cache = if config.cache.enabled {
            let cache = ReplyCache::new(config.cache.capacity);
            cache.start_sweeper(Duration::from_secs(config.cache.sweep_interval_secs));
            info!(
                capacity = config.cache.capacity,
                ttl_secs = config.cache.ttl_secs,
                "result cache enabled"
            );
            Some(cache)
        } else {
            info!("result cache disabled, every request runs the full pipeline");
            None
        };

        let orchestrator = Arc::new(Orchestrator::new(
            adapters.clone(),
            cache.clone(),
            Duration::from_secs(config.cache.ttl_secs),
            config.timeouts.stage_timeouts(),
        ));

        Ok(AppState {
            sessions: SessionRegistry::new(),
            orchestrator,
            cache,
            adapters,
            config,
        })
    }

    /// Which implementation serves each capability.
    pub fn service_modes(&self) -> ServiceModes {
        ServiceModes {
            chat: self.adapters.generator.name().to_string(),
            speech: self.adapters.synthesizer.name().to_string(),
            emotion: self.adapters.classifier.name().to_string(),
            viseme: self.adapters.extractor.name().to_string(),
        }
    }

    /// Whether a live serving endpoint generates replies.
    pub fn live_chat(&self) -> bool {
        !self.config.chat.base_url.is_empty() && !self.config.chat.api_token.is_empty()
    }

    /// Whether a live endpoint synthesizes speech.
    pub fn live_speech(&self) -> bool {
        !self.config.speech.endpoint.is_empty()
    }
}
