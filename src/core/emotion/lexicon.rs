//! Keyword-lexicon emotion classifier.
//!
//! Scores a bounded prefix of the input against per-emotion cue phrases.
//! Local and effectively infallible; it exists behind the
//! [`EmotionClassifier`] trait so the pipeline treats it like any other
//! adapter.

use async_trait::async_trait;
use tracing::debug;

use super::base::{ClassifyResult, EmotionClassifier};
use super::types::{Classification, Emotion};

/// Longest input prefix (in chars) considered when scoring
const MAX_SCAN_CHARS: usize = 512;

/// Confidence reported when a cue phrase matches
const KEYWORD_CONFIDENCE: f32 = 0.7;

/// Confidence reported for the neutral default (no cue matched)
const NEUTRAL_CONFIDENCE: f32 = 0.6;

/// Cue phrases per emotion, checked in order; the first containing match
/// wins. Bare interrogatives ("what", "how", "why") are deliberately not
/// cues: a plain question is neutral, not confusion.
const EMOTION_CUES: &[(Emotion, &[&str])] = &[
    (
        Emotion::Joy,
        &[
            "happy",
            "great",
            "awesome",
            "love",
            "excited",
            "wonderful",
            "amazing",
            "thanks",
            "thank you",
        ],
    ),
    (
        Emotion::Anger,
        &[
            "angry",
            "frustrated",
            "annoying",
            "hate",
            "terrible",
            "worst",
            "stupid",
        ],
    ),
    (
        Emotion::Sadness,
        &[
            "sad",
            "disappointed",
            "sorry",
            "unfortunately",
            "failed",
            "problem",
        ],
    ),
    (
        Emotion::Fear,
        &["worried", "scared", "afraid", "nervous", "anxious", "concern"],
    ),
    (
        Emotion::Surprise,
        &[
            "wow",
            "incredible",
            "unexpected",
            "really",
            "seriously",
        ],
    ),
    (
        Emotion::Confusion,
        &["confused", "don't understand", "unclear"],
    ),
];

/// Lexicon-based classifier over a fixed cue-phrase table
#[derive(Debug, Default, Clone)]
pub struct LexiconClassifier;

impl LexiconClassifier {
    pub fn new() -> Self {
        LexiconClassifier
    }

    /// Scores lowercased text against the cue table.
    fn score(text: &str) -> Classification {
        let scan: String = text.chars().take(MAX_SCAN_CHARS).collect::<String>().to_lowercase();

        for (emotion, cues) in EMOTION_CUES {
            for cue in *cues {
                if scan.contains(cue) {
                    return Classification {
                        emotion: *emotion,
                        confidence: KEYWORD_CONFIDENCE,
                    };
                }
            }
        }

        Classification {
            emotion: Emotion::Neutral,
            confidence: NEUTRAL_CONFIDENCE,
        }
    }
}

#[async_trait]
impl EmotionClassifier for LexiconClassifier {
    async fn classify(&self, text: &str) -> ClassifyResult<Classification> {
        let reading = Self::score(text);
        debug!(
            emotion = reading.emotion.as_str(),
            confidence = reading.confidence,
            "classified input"
        );
        Ok(reading)
    }

    fn name(&self) -> &'static str {
        "lexicon"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn classify(text: &str) -> Classification {
        LexiconClassifier::new()
            .classify(text)
            .await
            .expect("lexicon classifier is infallible")
    }

    #[tokio::test]
    async fn test_joy_cue() {
        let reading = classify("Thanks, that was awesome!").await;
        assert_eq!(reading.emotion, Emotion::Joy);
        assert_eq!(reading.confidence, KEYWORD_CONFIDENCE);
    }

    #[tokio::test]
    async fn test_anger_cue() {
        let reading = classify("This is the worst cluster config ever").await;
        assert_eq!(reading.emotion, Emotion::Anger);
    }

    #[tokio::test]
    async fn test_fear_cue() {
        let reading = classify("I'm worried my job will fail tonight").await;
        assert_eq!(reading.emotion, Emotion::Fear);
    }

    #[tokio::test]
    async fn test_confusion_needs_explicit_cue() {
        let reading = classify("I'm confused by this error").await;
        assert_eq!(reading.emotion, Emotion::Confusion);
    }

    #[tokio::test]
    async fn test_plain_question_is_neutral() {
        // Interrogatives alone must not read as confusion.
        let reading = classify("What is Delta Lake?").await;
        assert_eq!(reading.emotion, Emotion::Neutral);
        assert_eq!(reading.confidence, NEUTRAL_CONFIDENCE);
    }

    #[tokio::test]
    async fn test_case_insensitive_matching() {
        let reading = classify("WONDERFUL news about the release").await;
        assert_eq!(reading.emotion, Emotion::Joy);
    }

    #[tokio::test]
    async fn test_first_listed_emotion_wins_on_ties() {
        // "love" (joy) appears before "hate" (anger) in the table order.
        let reading = classify("I love and hate this platform").await;
        assert_eq!(reading.emotion, Emotion::Joy);
    }

    #[tokio::test]
    async fn test_long_input_is_truncated_before_scoring() {
        let mut text = "x".repeat(MAX_SCAN_CHARS);
        text.push_str(" wonderful");
        let reading = classify(&text).await;
        assert_eq!(reading.emotion, Emotion::Neutral);
    }

    #[test]
    fn test_classifier_name() {
        assert_eq!(LexiconClassifier::new().name(), "lexicon");
    }
}
