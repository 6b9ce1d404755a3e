pub mod cache;
pub mod chat;
pub mod emotion;
pub mod pipeline;
pub mod speech;
pub mod viseme;

// Re-export commonly used types for convenience
pub use cache::{CacheOutcome, CacheStats, ResultCache};
pub use chat::{ReplyGenerator, SharedGenerator, Turn, create_generator};
pub use emotion::{Classification, Emotion, EmotionClassifier, SharedClassifier};
pub use pipeline::{Orchestrator, PipelineError, PipelineRun, ReplyBundle, Request};
pub use speech::{AudioEncoding, SharedSynthesizer, SpeechSynthesizer, create_synthesizer};
pub use viseme::{SharedExtractor, VisemeExtractor, VisemeFrame, VisemeId};
