//! Response orchestration.
//!
//! [`Orchestrator`] executes one request's task graph: emotion
//! classification concurrent with cache resolution, then the sequential
//! generate → synthesize → extract chain on a miss, emitting the ordered
//! event stream through a [`PipelineRun`].

mod controller;
mod error;
mod run;
mod types;

pub use controller::{Adapters, Orchestrator, ReplyCache};
pub use error::{PipelineError, Stage};
pub use run::{Outbound, PipelineRun};
pub use types::{QueryReply, ReplyBundle, Request, StageTimeouts};
