//! Reply generation adapter.
//!
//! The pipeline turns user input into reply text through the
//! [`ReplyGenerator`] trait. [`create_generator`] selects the
//! serving-endpoint client when credentials are configured and the canned
//! fallback otherwise.

mod base;
mod canned;
mod serving;

pub use base::{
    GenerateError, GenerateResult, GeneratorConfig, ReplyGenerator, SharedGenerator, Turn,
    default_system_prompt,
};
pub use canned::CannedChat;
pub use serving::ServingEndpointChat;

use std::sync::Arc;
use tracing::warn;

/// Builds the generator the configuration calls for.
///
/// A base URL plus token selects [`ServingEndpointChat`]; missing
/// credentials fall back to [`CannedChat`] with a startup warning.
pub fn create_generator(config: GeneratorConfig) -> GenerateResult<SharedGenerator> {
    if config.base_url.is_empty() || config.api_token.is_empty() {
        warn!("no serving endpoint credentials configured, using canned replies");
        return Ok(Arc::new(CannedChat::new()));
    }
    Ok(Arc::new(ServingEndpointChat::new(config)?))
}
