//! Emotion classification adapter.
//!
//! The pipeline reads one [`Classification`] per user input through the
//! [`EmotionClassifier`] trait. The bundled implementation is the keyword
//! lexicon; classifier faults are recovered locally with a neutral reading
//! and never abort a request.

mod base;
mod lexicon;
mod types;

pub use base::{ClassifyError, ClassifyResult, EmotionClassifier, SharedClassifier};
pub use lexicon::LexiconClassifier;
pub use types::{Classification, Emotion};
