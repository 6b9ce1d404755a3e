//! Offline fallback synthesizer.
//!
//! Selected when no speech endpoint is configured. Emits a valid silent
//! WAV whose length matches a word-count duration estimate, so the rest of
//! the pipeline (viseme timing, audio delivery, caching) behaves exactly
//! as it would with a live endpoint.

use async_trait::async_trait;
use std::io::Cursor;
use tracing::debug;

use super::base::{SpeechSynthesizer, SynthesisError, SynthesisResult};
use super::types::{AudioEncoding, Synthesis};

/// Assumed speaking rate for the duration estimate
const WORDS_PER_MINUTE: u64 = 150;

/// Sample rate of generated audio
const SAMPLE_RATE: u32 = 16_000;

/// Estimated playback duration of `text` at the assumed speaking rate.
pub fn estimate_duration_ms(text: &str) -> u64 {
    let words = text.split_whitespace().count() as u64;
    words * 60_000 / WORDS_PER_MINUTE
}

/// Fallback synthesizer producing silence sized to the reply
#[derive(Debug, Default, Clone)]
pub struct OfflineSynthesizer;

impl OfflineSynthesizer {
    pub fn new() -> Self {
        OfflineSynthesizer
    }

    /// Writes a silent mono PCM WAV of the given duration.
    fn silent_wav(duration_ms: u64) -> SynthesisResult<Vec<u8>> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let samples = SAMPLE_RATE as u64 * duration_ms / 1000;
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut buffer, spec)
                .map_err(|e| SynthesisError::Encoding(e.to_string()))?;
            for _ in 0..samples {
                writer
                    .write_sample(0i16)
                    .map_err(|e| SynthesisError::Encoding(e.to_string()))?;
            }
            writer
                .finalize()
                .map_err(|e| SynthesisError::Encoding(e.to_string()))?;
        }

        Ok(buffer.into_inner())
    }
}

#[async_trait]
impl SpeechSynthesizer for OfflineSynthesizer {
    async fn synthesize(&self, text: &str) -> SynthesisResult<Synthesis> {
        let duration_ms = estimate_duration_ms(text);
        let audio = Self::silent_wav(duration_ms)?;

        debug!(
            bytes = audio.len(),
            duration_ms,
            "produced silent fallback audio"
        );
        Ok(Synthesis::new(audio, AudioEncoding::Wav))
    }

    fn name(&self) -> &'static str {
        "silent"
    }
}
