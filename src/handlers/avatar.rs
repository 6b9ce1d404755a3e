//! Avatar WebSocket handler.
//!
//! One socket per session. The read loop parses client messages and hands
//! inputs to the orchestrator; a dedicated writer task serializes outgoing
//! messages, dropping run events whose generation has been superseded so a
//! cancelled reply can never interleave with its successor.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::core::pipeline::{Outbound, PipelineRun, Request};
use crate::protocol::{ClientMessage, ControlCommand, ServerMessage};
use crate::session::Session;
use crate::state::AppState;

/// Outbound channel depth per connection
const OUTBOUND_BUFFER_SIZE: usize = 1024;

/// Maximum accepted WebSocket frame size (64KB)
const MAX_WS_FRAME_SIZE: usize = 64 * 1024;

/// Maximum accepted WebSocket message size (64KB)
const MAX_WS_MESSAGE_SIZE: usize = 64 * 1024;

/// How often the read loop checks for idleness
const IDLE_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Idle time after which the connection is closed
const IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// `GET /ws/avatar` upgrade entry point.
pub async fn avatar_websocket(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_avatar_socket(socket, state))
}

/// Runs one avatar connection to completion.
async fn handle_avatar_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let session = state.sessions.open();
    info!(session = %session.id(), "avatar session opened");

    let (tx, mut rx) = mpsc::channel::<Outbound>(OUTBOUND_BUFFER_SIZE);

    // greeting goes out before any client message is processed
    let greeting = ServerMessage::Greeting {
        message: state.config.server.greeting.clone(),
        connection_id: session.id().to_string(),
    };
    send_direct(&tx, greeting).await;

    // Writer task: single owner of the sink. Run events are re-checked
    // against the session's current generation here, at delivery time.
    let writer_session = Arc::clone(&session);
    let sender_task = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            let message = match outbound {
                Outbound::Direct(message) => message,
                Outbound::Run {
                    generation,
                    message,
                } => {
                    if !writer_session.is_current(generation) {
                        debug!(
                            kind = message.kind(),
                            generation,
                            "dropping event from superseded run"
                        );
                        continue;
                    }
                    message
                }
            };
            writer_session.event_delivered(&message);
            match serde_json::to_string(&message) {
                Ok(json) => {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(err) => {
                    error!(kind = message.kind(), error = %err, "failed to serialize outgoing message");
                }
            }
        }
    });

    let mut last_activity = Instant::now();
    loop {
        tokio::select! {
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(message)) => {
                        last_activity = Instant::now();
                        if !process_message(message, &state, &session, &tx).await {
                            break;
                        }
                    }
                    Some(Err(err)) => {
                        warn!(session = %session.id(), error = %err, "websocket receive error");
                        break;
                    }
                    None => break,
                }
            }
            _ = tokio::time::sleep(IDLE_CHECK_INTERVAL) => {
                if last_activity.elapsed() > IDLE_TIMEOUT {
                    info!(session = %session.id(), "closing idle avatar connection");
                    break;
                }
            }
        }
    }

    // teardown: cancel any in-flight run before the session goes away
    session.cancel_active();
    sender_task.abort();
    state.sessions.remove(session.id());
    info!(session = %session.id(), "avatar session closed");
}

/// Handles one raw frame. Returns `false` when the connection should
/// close.
async fn process_message(
    message: Message,
    state: &Arc<AppState>,
    session: &Arc<Session>,
    tx: &mpsc::Sender<Outbound>,
) -> bool {
    match message {
        Message::Text(text) => {
            match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_message) => {
                    handle_client_message(client_message, state, session, tx).await;
                }
                Err(err) => {
                    warn!(session = %session.id(), error = %err, "unparseable client message");
                    send_direct(
                        tx,
                        ServerMessage::Error {
                            message: format!("invalid message: {err}"),
                            stage: "input".to_string(),
                        },
                    )
                    .await;
                }
            }
            true
        }
        Message::Close(_) => {
            debug!(session = %session.id(), "client closed the connection");
            false
        }
        // axum answers pings itself; other frame kinds carry nothing here
        _ => true,
    }
}

/// Dispatches one parsed client message.
async fn handle_client_message(
    message: ClientMessage,
    state: &Arc<AppState>,
    session: &Arc<Session>,
    tx: &mpsc::Sender<Outbound>,
) {
    if let Err(err) = message.validate_size() {
        warn!(session = %session.id(), error = %err, "rejecting oversized input");
        send_direct(
            tx,
            ServerMessage::Error {
                message: err.to_string(),
                stage: "input".to_string(),
            },
        )
        .await;
        return;
    }

    match message {
        ClientMessage::TextInput { text } => {
            submit_input(text, "text_input", state, session, tx).await;
        }
        ClientMessage::Transcription { text } => {
            submit_input(text, "transcription", state, session, tx).await;
        }
        ClientMessage::Control { command } => {
            handle_control(command, state, session, tx).await;
        }
    }
}

/// Validates an input and starts its pipeline run, superseding any active
/// one.
async fn submit_input(
    text: String,
    source: &'static str,
    state: &Arc<AppState>,
    session: &Arc<Session>,
    tx: &mpsc::Sender<Outbound>,
) {
    let request = match Request::new(&text, session.id()) {
        Ok(request) => request,
        Err(err) => {
            // rejected before any run state changes; the avatar stays put
            send_direct(
                tx,
                ServerMessage::Error {
                    message: err.to_string(),
                    stage: err.stage().to_string(),
                },
            )
            .await;
            return;
        }
    };
    debug!(
        session = %session.id(),
        request = %request.id,
        source,
        chars = request.text.len(),
        "input accepted"
    );

    let ticket = session.begin_run();
    session.input_submitted();
    let run = PipelineRun::new(Arc::clone(session), tx.clone(), ticket);
    let orchestrator = Arc::clone(&state.orchestrator);
    tokio::spawn(async move {
        orchestrator.stream(request, run).await;
    });
}

/// Executes a control command and queues its reply.
async fn handle_control(
    command: ControlCommand,
    state: &Arc<AppState>,
    session: &Arc<Session>,
    tx: &mpsc::Sender<Outbound>,
) {
    debug!(session = %session.id(), command = command.as_str(), "control command");
    let reply = match command {
        ControlCommand::Ping => ServerMessage::ControlResponse {
            command: command.as_str().to_string(),
            status: "ok".to_string(),
        },
        ControlCommand::CaptureStart => {
            session.capture_started();
            // echo the resulting phase so the client can confirm it
            ServerMessage::ControlResponse {
                command: command.as_str().to_string(),
                status: session.avatar_phase().as_str().to_string(),
            }
        }
        ControlCommand::StopSpeaking => {
            let cancelled = session.cancel_active();
            session.force_idle();
            ServerMessage::ControlResponse {
                command: command.as_str().to_string(),
                status: if cancelled { "stopped" } else { "idle" }.to_string(),
            }
        }
        ControlCommand::GetStatus => status_snapshot(state, session),
    };
    send_direct(tx, reply).await;
}

/// Current session status for `get_status`.
fn status_snapshot(state: &Arc<AppState>, session: &Arc<Session>) -> ServerMessage {
    ServerMessage::Status {
        connection_id: session.id().to_string(),
        avatar: session.avatar_phase().as_str().to_string(),
        history_turns: session.history_turns(),
        services: state.service_modes(),
    }
}

/// Queues a session-scoped message for the writer.
async fn send_direct(tx: &mpsc::Sender<Outbound>, message: ServerMessage) {
    if tx.send(Outbound::Direct(message)).await.is_err() {
        debug!("connection writer gone, message dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::session::AvatarPhase;
    use tokio::time::timeout;

    fn test_state() -> Arc<AppState> {
        Arc::new(AppState::new(Config::default()).expect("Should build state"))
    }

    fn open_session(state: &Arc<AppState>) -> (Arc<Session>, mpsc::Sender<Outbound>, mpsc::Receiver<Outbound>) {
        let session = state.sessions.open();
        let (tx, rx) = mpsc::channel(OUTBOUND_BUFFER_SIZE);
        (session, tx, rx)
    }

    /// Receives the next message the writer would deliver, applying the
    /// same generation gate.
    async fn next_delivered(
        session: &Arc<Session>,
        rx: &mut mpsc::Receiver<Outbound>,
    ) -> ServerMessage {
        loop {
            let outbound = timeout(Duration::from_secs(5), rx.recv())
                .await
                .expect("Should receive before the deadline")
                .expect("Channel should stay open");
            match outbound {
                Outbound::Direct(message) => return message,
                Outbound::Run {
                    generation,
                    message,
                } => {
                    if session.is_current(generation) {
                        return message;
                    }
                }
            }
        }
    }

    #[tokio::test]
    async fn test_ping_control() {
        let state = test_state();
        let (session, tx, mut rx) = open_session(&state);

        handle_control(ControlCommand::Ping, &state, &session, &tx).await;

        match next_delivered(&session, &mut rx).await {
            ServerMessage::ControlResponse { command, status } => {
                assert_eq!(command, "ping");
                assert_eq!(status, "ok");
            }
            other => panic!("expected control_response, got {}", other.kind()),
        }
    }

    #[tokio::test]
    async fn test_capture_start_moves_avatar_to_listening() {
        let state = test_state();
        let (session, tx, mut rx) = open_session(&state);

        handle_control(ControlCommand::CaptureStart, &state, &session, &tx).await;

        assert_eq!(session.avatar_phase(), AvatarPhase::Listening);
        match next_delivered(&session, &mut rx).await {
            ServerMessage::ControlResponse { command, status } => {
                assert_eq!(command, "capture_start");
                assert_eq!(status, "listening");
            }
            other => panic!("expected control_response, got {}", other.kind()),
        }
    }

    #[tokio::test]
    async fn test_stop_speaking_cancels_active_run() {
        let state = test_state();
        let (session, tx, mut rx) = open_session(&state);

        let ticket = session.begin_run();
        session.input_submitted();

        handle_control(ControlCommand::StopSpeaking, &state, &session, &tx).await;

        assert!(ticket.token.is_cancelled());
        assert_eq!(session.avatar_phase(), AvatarPhase::Idle);
        match next_delivered(&session, &mut rx).await {
            ServerMessage::ControlResponse { command, status } => {
                assert_eq!(command, "stop_speaking");
                assert_eq!(status, "stopped");
            }
            other => panic!("expected control_response, got {}", other.kind()),
        }
    }

    #[tokio::test]
    async fn test_stop_speaking_with_nothing_active() {
        let state = test_state();
        let (session, tx, mut rx) = open_session(&state);

        handle_control(ControlCommand::StopSpeaking, &state, &session, &tx).await;

        match next_delivered(&session, &mut rx).await {
            ServerMessage::ControlResponse { status, .. } => assert_eq!(status, "idle"),
            other => panic!("expected control_response, got {}", other.kind()),
        }
    }

    #[tokio::test]
    async fn test_get_status_snapshot() {
        let state = test_state();
        let (session, tx, mut rx) = open_session(&state);

        handle_control(ControlCommand::GetStatus, &state, &session, &tx).await;

        match next_delivered(&session, &mut rx).await {
            ServerMessage::Status {
                connection_id,
                avatar,
                history_turns,
                services,
            } => {
                assert_eq!(connection_id, session.id());
                assert_eq!(avatar, "idle");
                assert_eq!(history_turns, 0);
                assert_eq!(services.chat, "canned");
                assert_eq!(services.viseme, "phoneme");
            }
            other => panic!("expected status, got {}", other.kind()),
        }
    }

    #[tokio::test]
    async fn test_text_input_streams_ordered_events() {
        let state = test_state();
        let (session, tx, mut rx) = open_session(&state);

        let message = ClientMessage::TextInput {
            text: "What is Delta Lake?".to_string(),
        };
        handle_client_message(message, &state, &session, &tx).await;
        assert_eq!(session.avatar_phase(), AvatarPhase::Thinking);

        let first = next_delivered(&session, &mut rx).await;
        assert_eq!(first.kind(), "emotion_detected");

        match next_delivered(&session, &mut rx).await {
            ServerMessage::ResponseText { text, cached } => {
                assert!(text.contains("ACID"));
                assert!(!cached, "first reply must be computed");
            }
            other => panic!("expected response_text, got {}", other.kind()),
        }

        match next_delivered(&session, &mut rx).await {
            ServerMessage::LipSyncData {
                visemes,
                duration_ms,
            } => {
                assert!(!visemes.is_empty());
                assert!(duration_ms > 0);
            }
            other => panic!("expected lip_sync_data, got {}", other.kind()),
        }

        match next_delivered(&session, &mut rx).await {
            ServerMessage::AudioData { audio, .. } => assert!(!audio.is_empty()),
            other => panic!("expected audio_data, got {}", other.kind()),
        }

        assert_eq!(
            next_delivered(&session, &mut rx).await.kind(),
            "response_complete"
        );
        assert_eq!(session.history_turns(), 1);
    }

    #[tokio::test]
    async fn test_transcription_feeds_the_same_pipeline() {
        let state = test_state();
        let (session, tx, mut rx) = open_session(&state);

        let message = ClientMessage::Transcription {
            text: "What is Delta Lake?".to_string(),
        };
        handle_client_message(message, &state, &session, &tx).await;

        let mut kinds = Vec::new();
        for _ in 0..5 {
            kinds.push(next_delivered(&session, &mut rx).await.kind());
        }
        assert_eq!(
            kinds,
            vec![
                "emotion_detected",
                "response_text",
                "lip_sync_data",
                "audio_data",
                "response_complete"
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_input_is_rejected_without_a_run() {
        let state = test_state();
        let (session, tx, mut rx) = open_session(&state);

        let message = ClientMessage::TextInput {
            text: "   ".to_string(),
        };
        handle_client_message(message, &state, &session, &tx).await;

        match next_delivered(&session, &mut rx).await {
            ServerMessage::Error { stage, .. } => assert_eq!(stage, "input"),
            other => panic!("expected error, got {}", other.kind()),
        }
        assert_eq!(session.avatar_phase(), AvatarPhase::Idle, "avatar must stay put");
        assert_eq!(session.current_generation(), 0, "no run may be started");
    }

    #[tokio::test]
    async fn test_oversized_input_is_rejected() {
        let state = test_state();
        let (session, tx, mut rx) = open_session(&state);

        let message = ClientMessage::TextInput {
            text: "x".repeat(17 * 1024),
        };
        handle_client_message(message, &state, &session, &tx).await;

        match next_delivered(&session, &mut rx).await {
            ServerMessage::Error { stage, message } => {
                assert_eq!(stage, "input");
                assert!(message.contains("too large"));
            }
            other => panic!("expected error, got {}", other.kind()),
        }
    }

    #[tokio::test]
    async fn test_malformed_json_reports_input_error() {
        let state = test_state();
        let (session, tx, mut rx) = open_session(&state);

        let keep_open = process_message(
            Message::Text("this is not json".into()),
            &state,
            &session,
            &tx,
        )
        .await;
        assert!(keep_open, "a bad message must not close the connection");

        match next_delivered(&session, &mut rx).await {
            ServerMessage::Error { stage, .. } => assert_eq!(stage, "input"),
            other => panic!("expected error, got {}", other.kind()),
        }
    }

    #[tokio::test]
    async fn test_close_frame_ends_the_loop() {
        let state = test_state();
        let (session, tx, _rx) = open_session(&state);

        let keep_open = process_message(Message::Close(None), &state, &session, &tx).await;
        assert!(!keep_open);
    }
}
