//! Run-scoped event emission with cancellation gating.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::protocol::ServerMessage;
use crate::session::{RunTicket, Session};

/// Messages queued for one connection's writer task.
#[derive(Debug)]
pub enum Outbound {
    /// Session-scoped message, delivered unconditionally
    Direct(ServerMessage),
    /// Run-scoped event, delivered only while `generation` is still the
    /// session's current run
    Run {
        generation: u64,
        message: ServerMessage,
    },
}

/// One request's handle for emitting its event stream.
///
/// Emission is gated twice: [`PipelineRun::emit`] drops the event when the
/// run's token is cancelled or its generation superseded, and the
/// connection writer re-checks the generation at delivery time. A
/// cancelled run therefore emits nothing further even while its in-flight
/// adapter calls wind down.
#[derive(Clone)]
pub struct PipelineRun {
    session: Arc<Session>,
    outbound: mpsc::Sender<Outbound>,
    generation: u64,
    token: CancellationToken,
}

impl PipelineRun {
    pub fn new(
        session: Arc<Session>,
        outbound: mpsc::Sender<Outbound>,
        ticket: RunTicket,
    ) -> Self {
        PipelineRun {
            session,
            outbound,
            generation: ticket.generation,
            token: ticket.token,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Whether this run may still emit.
    pub fn is_live(&self) -> bool {
        !self.token.is_cancelled() && self.session.is_current(self.generation)
    }

    /// Queues one event for delivery unless the run was cancelled or
    /// superseded. A send failure means the connection is gone; the event
    /// is dropped either way.
    pub async fn emit(&self, message: ServerMessage) {
        if !self.is_live() {
            debug!(
                kind = message.kind(),
                generation = self.generation,
                "event suppressed, run no longer live"
            );
            return;
        }
        let outbound = Outbound::Run {
            generation: self.generation,
            message,
        };
        if self.outbound.send(outbound).await.is_err() {
            debug!(
                generation = self.generation,
                "connection writer gone, event dropped"
            );
        }
    }

    /// Detaches the run from its session after the final event. Returns
    /// `true` when the run was still current, in which case its turn may
    /// be recorded.
    pub fn retire(&self) -> bool {
        self.session.finish_run(self.generation)
    }
}
