//! Bounded per-session conversation log.
//!
//! Completed turns accumulate here so the reply generator can condition on
//! recent context. The log is capped; once full, the oldest turn is dropped
//! for each new one recorded.

use std::collections::VecDeque;
use std::time::SystemTime;

use crate::core::chat::Turn;
use crate::core::emotion::Emotion;

/// Turns retained per session before the oldest is dropped
pub const HISTORY_CAPACITY: usize = 10;

/// One completed exchange, as retained by a session.
#[derive(Debug, Clone)]
pub struct CompletedTurn {
    /// Input text as the user typed it (trimmed)
    pub user: String,
    /// Reply text delivered for it
    pub assistant: String,
    /// Emotion detected on the input
    pub emotion: Emotion,
    /// When the turn was recorded
    pub recorded_at: SystemTime,
}

/// Bounded log of a session's completed turns, oldest first.
///
/// Only runs that complete while still current append here; superseded and
/// failed runs leave no trace. The full retained window is handed to the
/// reply generator, which applies its own prompt depth on top.
#[derive(Debug)]
pub struct ConversationLog {
    turns: VecDeque<CompletedTurn>,
    capacity: usize,
}

impl ConversationLog {
    /// Creates an empty log retaining at most `capacity` turns.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        ConversationLog {
            turns: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a completed turn, dropping the oldest once at capacity.
    pub fn record(
        &mut self,
        user: impl Into<String>,
        assistant: impl Into<String>,
        emotion: Emotion,
    ) {
        if self.turns.len() == self.capacity {
            self.turns.pop_front();
        }
        self.turns.push_back(CompletedTurn {
            user: user.into(),
            assistant: assistant.into(),
            emotion,
            recorded_at: SystemTime::now(),
        });
    }

    /// Number of retained turns.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// The retained turns in prompt form, oldest first.
    pub fn prompt_turns(&self) -> Vec<Turn> {
        self.turns
            .iter()
            .map(|turn| Turn {
                user: turn.user.clone(),
                assistant: turn.assistant.clone(),
            })
            .collect()
    }
}

impl Default for ConversationLog {
    fn default() -> Self {
        ConversationLog::new(HISTORY_CAPACITY)
    }
}
