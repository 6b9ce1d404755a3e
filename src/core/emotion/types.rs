//! Core emotion types shared by the classifier and the wire protocol.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Emotion Labels
// =============================================================================

/// Emotion labels the classifier can produce.
///
/// The set mirrors what the avatar renderer understands: six expressive
/// labels plus `neutral`. Labels serialize lowercase on the wire
/// (`emotion_detected.emotion`) and in prompt framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    /// Neutral, default emotional state
    #[default]
    Neutral,
    /// Happy, enthusiastic, grateful
    Joy,
    /// Angry, frustrated, annoyed
    Anger,
    /// Sad, disappointed, apologetic
    Sadness,
    /// Worried, scared, anxious
    Fear,
    /// Surprised, incredulous
    Surprise,
    /// Confused, lost, asking for clarification
    Confusion,
}

impl Emotion {
    /// Returns all labels as a slice.
    #[inline]
    pub const fn all() -> &'static [Emotion] {
        &[
            Emotion::Neutral,
            Emotion::Joy,
            Emotion::Anger,
            Emotion::Sadness,
            Emotion::Fear,
            Emotion::Surprise,
            Emotion::Confusion,
        ]
    }

    /// Lowercase wire name of the label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Neutral => "neutral",
            Emotion::Joy => "joy",
            Emotion::Anger => "anger",
            Emotion::Sadness => "sadness",
            Emotion::Fear => "fear",
            Emotion::Surprise => "surprise",
            Emotion::Confusion => "confusion",
        }
    }

    /// Parses a label, accepting common aliases ("happy", "angry", "sad", ...).
    pub fn from_label(label: &str) -> Option<Emotion> {
        match label.to_lowercase().as_str() {
            "neutral" | "calm" => Some(Emotion::Neutral),
            "joy" | "happy" | "happiness" => Some(Emotion::Joy),
            "anger" | "angry" => Some(Emotion::Anger),
            "sadness" | "sad" => Some(Emotion::Sadness),
            "fear" | "afraid" | "scared" => Some(Emotion::Fear),
            "surprise" | "surprised" => Some(Emotion::Surprise),
            "confusion" | "confused" => Some(Emotion::Confusion),
            _ => None,
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Classification Result
// =============================================================================

/// One classifier reading: a label plus the classifier's confidence in it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Detected emotion label
    pub emotion: Emotion,
    /// Confidence in [0, 1]
    pub confidence: f32,
}

impl Classification {
    /// Reading substituted when the classifier itself fails.
    ///
    /// Classification faults never abort a request; the pipeline continues
    /// with this low-confidence neutral reading instead.
    pub const fn neutral_fallback() -> Self {
        Classification {
            emotion: Emotion::Neutral,
            confidence: 0.5,
        }
    }
}

impl Default for Classification {
    fn default() -> Self {
        Classification {
            emotion: Emotion::Neutral,
            confidence: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emotion_wire_names_are_lowercase() {
        for emotion in Emotion::all() {
            let json = serde_json::to_string(emotion).expect("Should serialize");
            assert_eq!(json, format!("\"{}\"", emotion.as_str()));
            assert_eq!(emotion.as_str(), emotion.as_str().to_lowercase());
        }
    }

    #[test]
    fn test_emotion_round_trip() {
        for emotion in Emotion::all() {
            let parsed = Emotion::from_label(emotion.as_str());
            assert_eq!(parsed, Some(*emotion));
        }
    }

    #[test]
    fn test_emotion_aliases() {
        assert_eq!(Emotion::from_label("happy"), Some(Emotion::Joy));
        assert_eq!(Emotion::from_label("ANGRY"), Some(Emotion::Anger));
        assert_eq!(Emotion::from_label("scared"), Some(Emotion::Fear));
        assert_eq!(Emotion::from_label("delighted"), None);
    }

    #[test]
    fn test_default_is_neutral() {
        assert_eq!(Emotion::default(), Emotion::Neutral);
    }

    #[test]
    fn test_neutral_fallback_confidence() {
        let fallback = Classification::neutral_fallback();
        assert_eq!(fallback.emotion, Emotion::Neutral);
        assert_eq!(fallback.confidence, 0.5);
    }
}
