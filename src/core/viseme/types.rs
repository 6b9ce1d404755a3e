//! Viseme alphabet and timeline frame types.
//!
//! The alphabet is the standard 14-shape set used by blend-shape avatar
//! rigs. Wire casing is mixed by convention (`sil`, `PP`, `kk`, `AA`) and
//! every frame names its renderer blend shape (`viseme_*`) so the client
//! animates without a lookup table of its own.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Viseme Alphabet
// =============================================================================

/// Mouth shapes the extractor can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum VisemeId {
    /// Silence / neutral mouth
    #[default]
    #[serde(rename = "sil")]
    Sil,
    /// p, b, m
    #[serde(rename = "PP")]
    PP,
    /// f, v
    #[serde(rename = "FF")]
    FF,
    /// th
    #[serde(rename = "TH")]
    TH,
    /// t, d, n, l
    #[serde(rename = "DD")]
    DD,
    /// k, g
    #[serde(rename = "kk")]
    Kk,
    /// sh, ch, j
    #[serde(rename = "CH")]
    CH,
    /// s, z
    #[serde(rename = "SS")]
    SS,
    /// r
    #[serde(rename = "RR")]
    RR,
    /// a
    #[serde(rename = "AA")]
    AA,
    /// e
    #[serde(rename = "E")]
    E,
    /// i, y
    #[serde(rename = "I")]
    I,
    /// o, w
    #[serde(rename = "O")]
    O,
    /// u
    #[serde(rename = "U")]
    U,
}

impl VisemeId {
    /// Wire name of the shape.
    pub fn as_str(&self) -> &'static str {
        match self {
            VisemeId::Sil => "sil",
            VisemeId::PP => "PP",
            VisemeId::FF => "FF",
            VisemeId::TH => "TH",
            VisemeId::DD => "DD",
            VisemeId::Kk => "kk",
            VisemeId::CH => "CH",
            VisemeId::SS => "SS",
            VisemeId::RR => "RR",
            VisemeId::AA => "AA",
            VisemeId::E => "E",
            VisemeId::I => "I",
            VisemeId::O => "O",
            VisemeId::U => "U",
        }
    }

    /// Renderer blend shape driven by this viseme.
    pub fn blend_shape(&self) -> &'static str {
        match self {
            VisemeId::Sil => "viseme_sil",
            VisemeId::PP => "viseme_PP",
            VisemeId::FF => "viseme_FF",
            VisemeId::TH => "viseme_TH",
            VisemeId::DD => "viseme_DD",
            VisemeId::Kk => "viseme_kk",
            VisemeId::CH => "viseme_CH",
            VisemeId::SS => "viseme_SS",
            VisemeId::RR => "viseme_RR",
            VisemeId::AA => "viseme_aa",
            VisemeId::E => "viseme_E",
            VisemeId::I => "viseme_I",
            VisemeId::O => "viseme_O",
            VisemeId::U => "viseme_U",
        }
    }
}

impl fmt::Display for VisemeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Timeline Frames
// =============================================================================

/// One timed mouth shape in a lip-sync timeline.
///
/// Field names follow the renderer's camelCase convention on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisemeFrame {
    /// Frame start, milliseconds from timeline start
    pub start_ms: u64,
    /// Frame end, milliseconds from timeline start
    pub end_ms: u64,
    /// Mouth shape held for the frame
    pub viseme_id: VisemeId,
    /// Renderer blend shape name for the shape
    pub blend_shape: String,
}

impl VisemeFrame {
    /// Builds a frame, deriving the blend shape from the viseme.
    pub fn new(start_ms: u64, end_ms: u64, viseme_id: VisemeId) -> Self {
        VisemeFrame {
            start_ms,
            end_ms,
            viseme_id,
            blend_shape: viseme_id.blend_shape().to_string(),
        }
    }
}

/// Total duration of a timeline: the end of its last frame.
pub fn timeline_duration_ms(frames: &[VisemeFrame]) -> u64 {
    frames.last().map(|frame| frame.end_ms).unwrap_or(0)
}
