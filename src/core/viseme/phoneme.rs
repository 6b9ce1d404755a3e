//! Phoneme-approximation viseme extractor.
//!
//! Maps cleaned reply text to the viseme alphabet character by character
//! (digraphs first), then spreads the frames uniformly across the audio
//! duration. Duration is decoded from WAV headers when the payload is WAV;
//! otherwise a fixed per-phoneme estimate is used. Runs entirely local, no
//! model downloads.

use async_trait::async_trait;
use std::io::Cursor;
use tracing::debug;

use super::base::{ExtractResult, VisemeExtractor};
use super::types::{VisemeFrame, VisemeId};

/// Per-phoneme duration when the audio length is unknown (~12 phonemes/sec)
const FALLBACK_PHONEME_MS: f64 = 80.0;

/// Closing silence appended after the last spoken frame
const TRAILING_SILENCE_MS: u64 = 200;

/// Grapheme-approximation extractor over the fixed viseme alphabet
#[derive(Debug, Default, Clone)]
pub struct PhonemeExtractor;

impl PhonemeExtractor {
    pub fn new() -> Self {
        PhonemeExtractor
    }

    /// Strips everything but letters and spaces, lowercases, collapses runs
    /// of whitespace.
    fn clean_text(text: &str) -> String {
        let kept: String = text
            .to_lowercase()
            .chars()
            .map(|c| if c.is_ascii_alphabetic() { c } else { ' ' })
            .collect();
        kept.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Viseme for a single cleaned character. Letters without a mapping of
    /// their own approximate to the open vowel.
    fn viseme_for_char(c: char) -> VisemeId {
        match c {
            'a' => VisemeId::AA,
            'e' => VisemeId::E,
            'i' | 'y' => VisemeId::I,
            'o' | 'w' => VisemeId::O,
            'u' => VisemeId::U,
            'b' | 'p' | 'm' => VisemeId::PP,
            'f' | 'v' => VisemeId::FF,
            'd' | 't' | 'n' | 'l' => VisemeId::DD,
            'k' | 'g' => VisemeId::Kk,
            's' | 'z' => VisemeId::SS,
            'j' => VisemeId::CH,
            'r' => VisemeId::RR,
            'h' | ' ' => VisemeId::Sil,
            _ => VisemeId::AA,
        }
    }

    /// Scans cleaned text into a viseme sequence, digraphs before single
    /// characters.
    fn to_visemes(clean: &str) -> Vec<VisemeId> {
        let chars: Vec<char> = clean.chars().collect();
        let mut visemes = Vec::with_capacity(chars.len());
        let mut i = 0;

        while i < chars.len() {
            if i + 1 < chars.len() {
                match (chars[i], chars[i + 1]) {
                    ('t', 'h') => {
                        visemes.push(VisemeId::TH);
                        i += 2;
                        continue;
                    }
                    ('s', 'h') | ('c', 'h') => {
                        visemes.push(VisemeId::CH);
                        i += 2;
                        continue;
                    }
                    _ => {}
                }
            }
            visemes.push(Self::viseme_for_char(chars[i]));
            i += 1;
        }

        visemes
    }

    /// Reads the playback duration out of a WAV payload, if it is one.
    fn wav_duration_ms(audio: &[u8]) -> Option<u64> {
        let reader = hound::WavReader::new(Cursor::new(audio)).ok()?;
        let sample_rate = reader.spec().sample_rate;
        if sample_rate == 0 {
            return None;
        }
        Some(reader.duration() as u64 * 1000 / sample_rate as u64)
    }

    /// Spreads the viseme sequence uniformly across the timeline and closes
    /// it with a silence frame. Frame edges are rounded per frame so drift
    /// never accumulates.
    fn frames(visemes: &[VisemeId], total_ms: Option<u64>) -> Vec<VisemeFrame> {
        if visemes.is_empty() {
            return Vec::new();
        }

        let step_ms = match total_ms {
            Some(ms) if ms > 0 => ms as f64 / visemes.len() as f64,
            _ => FALLBACK_PHONEME_MS,
        };

        let mut frames = Vec::with_capacity(visemes.len() + 1);
        for (i, viseme) in visemes.iter().enumerate() {
            let start = (i as f64 * step_ms).round() as u64;
            let end = ((i + 1) as f64 * step_ms).round() as u64;
            frames.push(VisemeFrame::new(start, end, *viseme));
        }

        let tail_start = frames.last().map(|frame| frame.end_ms).unwrap_or(0);
        frames.push(VisemeFrame::new(
            tail_start,
            tail_start + TRAILING_SILENCE_MS,
            VisemeId::Sil,
        ));

        frames
    }
}

#[async_trait]
impl VisemeExtractor for PhonemeExtractor {
    async fn extract(&self, text: &str, audio: &[u8]) -> ExtractResult<Vec<VisemeFrame>> {
        let clean = Self::clean_text(text);
        let visemes = Self::to_visemes(&clean);
        let duration = Self::wav_duration_ms(audio);
        let frames = Self::frames(&visemes, duration);

        debug!(
            frames = frames.len(),
            chars = text.len(),
            wav_duration_ms = duration,
            "generated lip-sync timeline"
        );
        Ok(frames)
    }

    fn name(&self) -> &'static str {
        "phoneme"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::viseme::timeline_duration_ms;

    /// One-second silent mono WAV at 16 kHz.
    fn one_second_wav() -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer =
                hound::WavWriter::new(&mut buffer, spec).expect("Should create WAV writer");
            for _ in 0..16_000 {
                writer.write_sample(0i16).expect("Should write sample");
            }
            writer.finalize().expect("Should finalize WAV");
        }
        buffer.into_inner()
    }

    #[test]
    fn test_clean_text_strips_punctuation_and_digits() {
        assert_eq!(
            PhonemeExtractor::clean_text("Hello, World! 123"),
            "hello world"
        );
        assert_eq!(PhonemeExtractor::clean_text("  spaced   out  "), "spaced out");
        assert_eq!(PhonemeExtractor::clean_text("?!."), "");
    }

    #[test]
    fn test_digraphs_take_precedence() {
        assert_eq!(PhonemeExtractor::to_visemes("th"), vec![VisemeId::TH]);
        assert_eq!(PhonemeExtractor::to_visemes("sh"), vec![VisemeId::CH]);
        assert_eq!(PhonemeExtractor::to_visemes("ch"), vec![VisemeId::CH]);
        // 't' then 'h' separated by a space must not fuse.
        assert_eq!(
            PhonemeExtractor::to_visemes("t h"),
            vec![VisemeId::DD, VisemeId::Sil, VisemeId::Sil]
        );
    }

    #[test]
    fn test_unmapped_letters_approximate_to_open_vowel() {
        assert_eq!(PhonemeExtractor::to_visemes("c"), vec![VisemeId::AA]);
        assert_eq!(PhonemeExtractor::to_visemes("x"), vec![VisemeId::AA]);
        assert_eq!(PhonemeExtractor::to_visemes("q"), vec![VisemeId::AA]);
    }

    #[test]
    fn test_frames_spread_uniformly_over_known_duration() {
        let visemes = vec![VisemeId::PP, VisemeId::AA, VisemeId::DD, VisemeId::E];
        let frames = PhonemeExtractor::frames(&visemes, Some(1000));

        assert_eq!(frames.len(), 5); // 4 spoken + trailing silence
        assert_eq!(frames[0].start_ms, 0);
        assert_eq!(frames[0].end_ms, 250);
        assert_eq!(frames[3].end_ms, 1000);
        // Adjacent frames share edges.
        for pair in frames.windows(2) {
            assert_eq!(pair[0].end_ms, pair[1].start_ms);
        }
    }

    #[test]
    fn test_frames_fall_back_to_fixed_step_without_duration() {
        let visemes = vec![VisemeId::SS, VisemeId::I];
        let frames = PhonemeExtractor::frames(&visemes, None);
        assert_eq!(frames[0].end_ms, 80);
        assert_eq!(frames[1].end_ms, 160);
        assert_eq!(frames[2].viseme_id, VisemeId::Sil);
        assert_eq!(frames[2].end_ms, 160 + TRAILING_SILENCE_MS);
    }

    #[test]
    fn test_trailing_silence_closes_timeline() {
        let frames = PhonemeExtractor::frames(&[VisemeId::AA], Some(500));
        let tail = frames.last().expect("Should have frames");
        assert_eq!(tail.viseme_id, VisemeId::Sil);
        assert_eq!(tail.blend_shape, "viseme_sil");
        assert_eq!(tail.start_ms, 500);
        assert_eq!(tail.end_ms, 700);
    }

    #[test]
    fn test_wav_duration_decoding() {
        let wav = one_second_wav();
        assert_eq!(PhonemeExtractor::wav_duration_ms(&wav), Some(1000));
        assert_eq!(PhonemeExtractor::wav_duration_ms(b"not a wav"), None);
        assert_eq!(PhonemeExtractor::wav_duration_ms(&[]), None);
    }

    #[tokio::test]
    async fn test_extract_tracks_wav_duration() {
        let extractor = PhonemeExtractor::new();
        let frames = extractor
            .extract("hi", &one_second_wav())
            .await
            .expect("Should extract");

        // "hi" -> h, i -> two spoken frames over 1000ms, plus silence.
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[1].end_ms, 1000);
        assert_eq!(timeline_duration_ms(&frames), 1000 + TRAILING_SILENCE_MS);
    }

    #[tokio::test]
    async fn test_extract_empty_text_yields_empty_timeline() {
        let extractor = PhonemeExtractor::new();
        let frames = extractor
            .extract("...", &[])
            .await
            .expect("Should extract");
        assert!(frames.is_empty());
    }

    #[test]
    fn test_extractor_name() {
        assert_eq!(PhonemeExtractor::new().name(), "phoneme");
    }
}
