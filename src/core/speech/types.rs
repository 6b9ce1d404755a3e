//! Audio payload types shared by synthesizers, the cache, and the wire.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Encodings a synthesizer can produce.
///
/// Carried alongside every audio payload so replays (cache hits) can state
/// the format without re-inspecting bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AudioEncoding {
    /// RIFF WAV (PCM)
    #[default]
    Wav,
    /// MPEG audio layer 3
    Mp3,
}

impl AudioEncoding {
    /// Wire name, also the `response_format` value for OpenAI-style
    /// synthesis endpoints.
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioEncoding::Wav => "wav",
            AudioEncoding::Mp3 => "mp3",
        }
    }

    /// Parses a configuration value.
    pub fn from_label(label: &str) -> Option<AudioEncoding> {
        match label.to_lowercase().as_str() {
            "wav" | "wave" => Some(AudioEncoding::Wav),
            "mp3" | "mpeg" => Some(AudioEncoding::Mp3),
            _ => None,
        }
    }

    /// MIME type of the encoding
    pub fn content_type(&self) -> &'static str {
        match self {
            AudioEncoding::Wav => "audio/wav",
            AudioEncoding::Mp3 => "audio/mpeg",
        }
    }
}

impl fmt::Display for AudioEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One synthesized reply: the audio bytes and what they are encoded as.
#[derive(Debug, Clone, PartialEq)]
pub struct Synthesis {
    /// Encoded audio payload
    pub audio: Bytes,
    /// Encoding of `audio`
    pub encoding: AudioEncoding,
}

impl Synthesis {
    pub fn new(audio: impl Into<Bytes>, encoding: AudioEncoding) -> Self {
        Synthesis {
            audio: audio.into(),
            encoding,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_wire_names() {
        assert_eq!(
            serde_json::to_string(&AudioEncoding::Wav).expect("Should serialize"),
            r#""wav""#
        );
        assert_eq!(
            serde_json::to_string(&AudioEncoding::Mp3).expect("Should serialize"),
            r#""mp3""#
        );
    }

    #[test]
    fn test_encoding_from_label() {
        assert_eq!(AudioEncoding::from_label("WAV"), Some(AudioEncoding::Wav));
        assert_eq!(AudioEncoding::from_label("wave"), Some(AudioEncoding::Wav));
        assert_eq!(AudioEncoding::from_label("mp3"), Some(AudioEncoding::Mp3));
        assert_eq!(AudioEncoding::from_label("flac"), None);
    }

    #[test]
    fn test_content_types() {
        assert_eq!(AudioEncoding::Wav.content_type(), "audio/wav");
        assert_eq!(AudioEncoding::Mp3.content_type(), "audio/mpeg");
    }
}
