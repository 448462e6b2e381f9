//! WebSocket server and connection handling.

use crate::protocol::{ClientMessage, ServerMessage};
use crate::session::{HostError, HostedSession};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use match3_core::{GameEvent, LevelConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// How often the level clock runs for each session
const CLOCK_TICK: Duration = Duration::from_millis(250);

/// Server state shared across all connections.
pub struct ServerState {
    /// Config every new session starts from
    pub config: LevelConfig,
    /// All active sessions
    pub sessions: DashMap<Uuid, HostedSession>,
    /// Mapping from session ID to its message sender
    pub senders: DashMap<Uuid, mpsc::UnboundedSender<ServerMessage>>,
}

impl ServerState {
    pub fn new(config: LevelConfig) -> Self {
        Self {
            config,
            sessions: DashMap::new(),
            senders: DashMap::new(),
        }
    }

    /// Send a message to a specific connection.
    pub fn send_to(&self, session_id: Uuid, msg: ServerMessage) {
        if let Some(sender) = self.senders.get(&session_id) {
            let _ = sender.send(msg);
        }
    }

    /// Add a connection's session and sender. Both are removed when the
    /// returned guard is dropped.
    fn register(
        self: &Arc<Self>,
        session: HostedSession,
        sender: mpsc::UnboundedSender<ServerMessage>,
    ) -> Registration {
        let session_id = session.id;
        self.sessions.insert(session_id, session);
        self.senders.insert(session_id, sender);
        Registration {
            state: Arc::clone(self),
            session_id,
        }
    }

    /// Run a closure against a session.
    fn with_session<T>(
        &self,
        session_id: Uuid,
        f: impl FnOnce(&mut HostedSession) -> T,
    ) -> Result<T, HostError> {
        let mut session = self
            .sessions
            .get_mut(&session_id)
            .ok_or(HostError::SessionNotFound)?;
        Ok(f(&mut *session))
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new(LevelConfig::default())
    }
}

/// Keeps a connection registered in [`ServerState`] while alive.
struct Registration {
    state: Arc<ServerState>,
    session_id: Uuid,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.state.sessions.remove(&self.session_id);
        self.state.senders.remove(&self.session_id);
    }
}

/// Run the WebSocket server.
pub async fn run_server(addr: SocketAddr, state: Arc<ServerState>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Match-3 server listening on {}", addr);

    while let Ok((stream, peer_addr)) = listener.accept().await {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, state).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }

    Ok(())
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: Arc<ServerState>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New WebSocket connection from {}", addr);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let session_id = Uuid::new_v4();
    let session = HostedSession::new(session_id, state.config.clone(), Instant::now())?;

    // Create channel for outgoing messages
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    // Unregisters on every return path, including a failed welcome
    let _registration = state.register(session, tx);

    let welcome = ServerMessage::Welcome { session_id };
    let msg_text = serde_json::to_string(&welcome)?;
    ws_sender.send(Message::Text(msg_text)).await?;

    // Spawn task to forward messages from channel to WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(text) = serde_json::to_string(&msg) {
                if ws_sender.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
        }
    });

    let clock_task = tokio::spawn(run_clock(session_id, Arc::clone(&state)));

    // Handle incoming messages
    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => handle_message(session_id, client_msg, &state),
                Err(e) => {
                    warn!("Invalid message from {}: {}", session_id, text);
                    state.send_to(
                        session_id,
                        ServerMessage::Error {
                            message: format!("Invalid message: {}", e),
                        },
                    );
                }
            },
            Ok(Message::Close(_)) => {
                info!("Client {} closing connection", session_id);
                break;
            }
            Ok(Message::Ping(_)) => {
                state.send_to(session_id, ServerMessage::Pong);
            }
            Err(e) => {
                error!("WebSocket error from {}: {}", session_id, e);
                break;
            }
            _ => {}
        }
    }

    // Clean up on disconnect
    clock_task.abort();
    send_task.abort();

    info!("Connection closed for {}", session_id);
    Ok(())
}

/// Drive the level timer and idle hints for one session.
async fn run_clock(session_id: Uuid, state: Arc<ServerState>) {
    let mut interval = tokio::time::interval(CLOCK_TICK);
    let mut last = Instant::now();

    loop {
        interval.tick().await;
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(last);
        last = now;

        let Ok((events, hint)) = state.with_session(session_id, |session| {
            (session.advance_clock(elapsed), session.idle_hint(now))
        }) else {
            break;
        };

        if !events.is_empty() {
            debug!(session = %session_id, count = events.len(), "clock events");
            if events.iter().any(GameEvent::is_terminal) {
                info!(session = %session_id, "level ran out of time");
            }
            state.send_to(session_id, ServerMessage::Events { events });
        }
        if let Some(cell) = hint {
            state.send_to(session_id, ServerMessage::Hint { cell: Some(cell) });
        }
    }
}

/// Handle a client message.
fn handle_message(session_id: Uuid, msg: ClientMessage, state: &ServerState) {
    let reply = match msg {
        ClientMessage::Action { action } => {
            let result = state
                .with_session(session_id, |session| {
                    session.apply_action(action, Instant::now())
                })
                .and_then(|r| r);
            match result {
                Ok(events) => {
                    if events.iter().any(GameEvent::is_terminal) {
                        info!(session = %session_id, "level finished");
                    }
                    ServerMessage::ActionResult {
                        success: true,
                        events,
                        error: None,
                    }
                }
                Err(e) => {
                    debug!(session = %session_id, "action rejected: {}", e);
                    ServerMessage::ActionResult {
                        success: false,
                        events: vec![],
                        error: Some(e.to_string()),
                    }
                }
            }
        }

        ClientMessage::Snapshot => match state.with_session(session_id, |s| s.snapshot()) {
            Ok(snapshot) => ServerMessage::Snapshot { snapshot },
            Err(e) => ServerMessage::Error {
                message: e.to_string(),
            },
        },

        ClientMessage::Hint { difficulty } => {
            match state.with_session(session_id, |s| s.hint(difficulty)) {
                Ok(cell) => ServerMessage::Hint { cell },
                Err(e) => ServerMessage::Error {
                    message: e.to_string(),
                },
            }
        }

        ClientMessage::Ping => ServerMessage::Pong,
    };

    state.send_to(session_id, reply);
}

#[cfg(test)]
mod tests {
    use super::*;
    use match3_core::{CellCoord, GameAction, GameState};

    fn connect(state: &ServerState) -> (Uuid, mpsc::UnboundedReceiver<ServerMessage>) {
        let id = Uuid::new_v4();
        let session = HostedSession::new(id, state.config.clone(), Instant::now()).unwrap();
        state.sessions.insert(id, session);
        let (tx, rx) = mpsc::unbounded_channel();
        state.senders.insert(id, tx);
        (id, rx)
    }

    #[test]
    fn test_registration_is_removed_on_drop() {
        let state = Arc::new(ServerState::default());
        let id = Uuid::new_v4();
        let session = HostedSession::new(id, state.config.clone(), Instant::now()).unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let registration = state.register(session, tx);
        assert!(state.sessions.contains_key(&id));
        assert!(state.senders.contains_key(&id));

        // Early return before the connection loop starts
        drop(registration);
        assert!(state.sessions.is_empty());
        assert!(state.senders.is_empty());
        // The send task sees the channel close
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_action_result_reports_events() {
        let state = ServerState::default();
        let (id, mut rx) = connect(&state);

        let action = GameAction::LoadLevel {
            width: Some(3),
            height: Some(3),
            item_types: vec!["a".into(), "b".into(), "c".into()],
        };
        handle_message(id, ClientMessage::Action { action }, &state);

        match rx.try_recv().unwrap() {
            ServerMessage::ActionResult {
                success, events, ..
            } => {
                assert!(success);
                assert!(!events.is_empty());
            }
            other => panic!("unexpected reply: {:?}", other),
        }
        assert_eq!(
            state.sessions.get(&id).unwrap().state(),
            GameState::Started
        );
    }

    #[test]
    fn test_rejected_action_reports_error() {
        let state = ServerState::default();
        let (id, mut rx) = connect(&state);

        let action = GameAction::RequestMove(CellCoord::new(0, 0));
        handle_message(id, ClientMessage::Action { action }, &state);

        match rx.try_recv().unwrap() {
            ServerMessage::ActionResult { success, error, .. } => {
                assert!(!success);
                assert!(error.is_some());
            }
            other => panic!("unexpected reply: {:?}", other),
        }
    }

    #[test]
    fn test_snapshot_and_ping() {
        let state = ServerState::default();
        let (id, mut rx) = connect(&state);

        handle_message(id, ClientMessage::Snapshot, &state);
        assert!(matches!(
            rx.try_recv().unwrap(),
            ServerMessage::Snapshot { snapshot } if snapshot.state == GameState::MainMenu
        ));

        handle_message(id, ClientMessage::Ping, &state);
        assert!(matches!(rx.try_recv().unwrap(), ServerMessage::Pong));
    }

    #[test]
    fn test_unknown_session_gets_error() {
        let state = ServerState::default();
        let (_, _rx) = connect(&state);
        let stranger = Uuid::new_v4();
        let (tx, mut rx) = mpsc::unbounded_channel();
        state.senders.insert(stranger, tx);

        handle_message(stranger, ClientMessage::Snapshot, &state);
        assert!(matches!(rx.try_recv().unwrap(), ServerMessage::Error { .. }));
    }
}
