//! Avatar phase tracking.
//!
//! The phase mirrors what the client-side avatar should be doing and is
//! advanced by the same events the client receives, so the two views stay
//! aligned without extra synchronization traffic.

use crate::protocol::ServerMessage;

/// What the avatar is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AvatarPhase {
    /// Waiting for input
    #[default]
    Idle,
    /// Client is capturing voice input
    Listening,
    /// A reply is being prepared
    Thinking,
    /// Reply audio is playing
    Speaking,
}

impl AvatarPhase {
    /// Wire label for the phase.
    pub fn as_str(&self) -> &'static str {
        match self {
            AvatarPhase::Idle => "idle",
            AvatarPhase::Listening => "listening",
            AvatarPhase::Thinking => "thinking",
            AvatarPhase::Speaking => "speaking",
        }
    }

    /// Capture-start control: `Idle` and `Speaking` move to `Listening`,
    /// the other phases are left unchanged.
    pub fn on_capture_start(&mut self) {
        if matches!(self, AvatarPhase::Idle | AvatarPhase::Speaking) {
            *self = AvatarPhase::Listening;
        }
    }

    /// A submitted input always moves the avatar to `Thinking`.
    pub fn on_input(&mut self) {
        *self = AvatarPhase::Thinking;
    }

    /// Applies the transition a delivered server event implies.
    ///
    /// Reply text keeps the avatar thinking; the audio chunk starts it
    /// speaking; completion and errors return it to idle so the client can
    /// never be left stuck mid-reply.
    pub fn on_delivered(&mut self, message: &ServerMessage) {
        match message {
            ServerMessage::AudioData { .. } => {
                if *self == AvatarPhase::Thinking {
                    *self = AvatarPhase::Speaking;
                }
            }
            ServerMessage::ResponseComplete | ServerMessage::Error { .. } => {
                *self = AvatarPhase::Idle;
            }
            _ => {}
        }
    }
}
