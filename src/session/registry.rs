//! Session lifecycle and the process-wide session registry.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use super::avatar::AvatarPhase;
use super::conversation::{ConversationLog, HISTORY_CAPACITY};
use crate::core::chat::Turn;
use crate::core::emotion::Emotion;
use crate::protocol::ServerMessage;

/// Grant for one pipeline run: its generation number and the token that
/// cancels it.
#[derive(Debug, Clone)]
pub struct RunTicket {
    pub generation: u64,
    pub token: CancellationToken,
}

#[derive(Debug)]
struct ActiveRun {
    generation: u64,
    token: CancellationToken,
}

/// State for one client connection.
///
/// At most one pipeline run is active per session. Starting a new run
/// cancels and detaches the previous one in the same critical section, so
/// a superseded run can never emit between its successor's events.
pub struct Session {
    id: String,
    /// Generation of the most recently started run; events carrying an
    /// older generation are dropped at delivery.
    generation: AtomicU64,
    active: Mutex<Option<ActiveRun>>,
    avatar: Mutex<AvatarPhase>,
    conversation: Mutex<ConversationLog>,
}

impl Session {
    fn new(id: String) -> Self {
        Session {
            id,
            generation: AtomicU64::new(0),
            active: Mutex::new(None),
            avatar: Mutex::new(AvatarPhase::Idle),
            conversation: Mutex::new(ConversationLog::new(HISTORY_CAPACITY)),
        }
    }

    /// Connection id this session was opened under.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether `generation` is still the session's current run.
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::Acquire) == generation
    }

    /// Current run generation.
    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Starts a new run, superseding any active one.
    ///
    /// The previous run's token is cancelled before the new generation
    /// becomes current, so its pending events are suppressed before the
    /// successor can queue any of its own.
    pub fn begin_run(&self) -> RunTicket {
        let mut active = self.active.lock();
        if let Some(previous) = active.take() {
            previous.token.cancel();
            debug!(
                session = %self.id,
                superseded = previous.generation,
                "superseding active run"
            );
        }
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let token = CancellationToken::new();
        *active = Some(ActiveRun {
            generation,
            token: token.clone(),
        });
        RunTicket { generation, token }
    }

    /// Cancels and detaches the active run without starting a successor
    /// (stop control, connection teardown). Returns whether a run was
    /// actually cancelled.
    pub fn cancel_active(&self) -> bool {
        let mut active = self.active.lock();
        match active.take() {
            Some(run) => {
                run.token.cancel();
                // advance the generation so events the cancelled run
                // already queued are dropped at delivery
                self.generation.fetch_add(1, Ordering::AcqRel);
                debug!(session = %self.id, cancelled = run.generation, "cancelled active run");
                true
            }
            None => false,
        }
    }

    /// Detaches a completed run. Returns `true` only when the run was
    /// still current, which is the condition for recording its turn.
    pub fn finish_run(&self, generation: u64) -> bool {
        let mut active = self.active.lock();
        match active.as_ref() {
            Some(run) if run.generation == generation => {
                *active = None;
                true
            }
            _ => false,
        }
    }

    /// Current avatar phase.
    pub fn avatar_phase(&self) -> AvatarPhase {
        *self.avatar.lock()
    }

    /// Applies the capture-start control to the avatar.
    pub fn capture_started(&self) {
        self.avatar.lock().on_capture_start();
    }

    /// Marks the avatar thinking after an input was accepted.
    pub fn input_submitted(&self) {
        self.avatar.lock().on_input();
    }

    /// Forces the avatar back to idle (stop control).
    pub fn force_idle(&self) {
        *self.avatar.lock() = AvatarPhase::Idle;
    }

    /// Applies the avatar transition for an event actually delivered to
    /// the client.
    pub fn event_delivered(&self, message: &ServerMessage) {
        self.avatar.lock().on_delivered(message);
    }

    /// Records a completed turn in the conversation log.
    pub fn record_turn(&self, user: &str, assistant: &str, emotion: Emotion) {
        self.conversation.lock().record(user, assistant, emotion);
    }

    /// Number of retained conversation turns.
    pub fn history_turns(&self) -> usize {
        self.conversation.lock().len()
    }

    /// Retained turns in prompt form, oldest first.
    pub fn prompt_turns(&self) -> Vec<Turn> {
        self.conversation.lock().prompt_turns()
    }
}

/// Process-wide map of open sessions, keyed by connection id.
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        SessionRegistry {
            sessions: DashMap::new(),
        }
    }

    /// Opens a session under a fresh connection id.
    pub fn open(&self) -> Arc<Session> {
        let session = Arc::new(Session::new(Uuid::new_v4().to_string()));
        self.sessions
            .insert(session.id().to_string(), Arc::clone(&session));
        debug!(session = %session.id(), open = self.sessions.len(), "session opened");
        session
    }

    /// Looks up an open session by connection id.
    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Removes a closed session from the registry.
    pub fn remove(&self, id: &str) {
        self.sessions.remove(id);
        debug!(session = %id, open = self.sessions.len(), "session removed");
    }

    /// Number of open sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        SessionRegistry::new()
    }
}
