//! Per-connection session state.
//!
//! A [`Session`] owns one client connection's run supersession rule, its
//! avatar phase, and its bounded conversation log. The [`SessionRegistry`]
//! tracks open sessions for the health endpoint and teardown.

mod avatar;
mod conversation;
mod registry;

pub use avatar::AvatarPhase;
pub use conversation::{CompletedTurn, ConversationLog, HISTORY_CAPACITY};
pub use registry::{RunTicket, Session, SessionRegistry};
