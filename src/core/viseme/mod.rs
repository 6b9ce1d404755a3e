//! Lip-sync timing extraction.
//!
//! Turns a reply (text plus synthesized audio) into an ordered
//! [`VisemeFrame`] timeline through the [`VisemeExtractor`] trait. The
//! bundled implementation is the local phoneme approximator.

mod base;
mod phoneme;
mod types;

pub use base::{ExtractError, ExtractResult, SharedExtractor, VisemeExtractor};
pub use phoneme::PhonemeExtractor;
pub use types::{VisemeFrame, VisemeId, timeline_duration_ms};
