pub mod config;
pub mod core;
pub mod errors;
pub mod handlers;
pub mod protocol;
pub mod routes;
pub mod session;
pub mod state;

// Re-export commonly used items for convenience
pub use config::Config;
pub use errors::{AppError, AppResult};
pub use protocol::{ClientMessage, ControlCommand, ServerMessage};
pub use session::{Session, SessionRegistry};
pub use state::AppState;
