//! Router assembly
//!
//! - `api` - REST endpoints (health, client bootstrap, one-shot chat)
//! - `avatar` - the avatar WebSocket endpoint

pub mod api;
pub mod avatar;

pub use api::create_api_router;
pub use avatar::create_avatar_router;
