//! HTTP and WebSocket request handlers
//!
//! This module organizes all API handlers into logical groups:
//! - `api` - Health check, client bootstrap, and one-shot chat REST endpoints
//! - `avatar` - Avatar WebSocket: streaming reply events and session control
pub mod api;
pub mod avatar;

// Re-export commonly used handlers for convenient access
pub use avatar::avatar_websocket;
