use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::instrument;

use crate::{
    data::{ClientMessage, ServerMessage},
    error::AppError,
    game::{GameError, PlayerIdentity, SessionId},
    render,
    session::{
        bus::SubscriptionId,
        countdown::{wait_or_cancel, CancelSignal},
        ConnectionId, ConnectionSender, SessionEvent, Subscription,
    },
    state::SharedState,
};

// ==============================================================================
// === Websocket Handlers
// =============================================================================
#[derive(Deserialize, Debug)]
pub struct WebSocketParams {
    pub player: PlayerIdentity,
}

#[instrument(skip(ws, state))]
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Path(session_id): Path<SessionId>,
    Query(params): Query<WebSocketParams>,
    State(state): State<SharedState>,
) -> impl IntoResponse {
    tracing::info!(session_id = %session_id, player = %params.player, "WebSocket upgrade requested.");
    ws.on_upgrade(move |socket| handle_socket(socket, session_id, params.player, state))
}

/// A player connection that has joined its session.
pub struct PlayerConnection {
    pub id: ConnectionId,
    pub session_id: SessionId,
    pub player: PlayerIdentity,
    subscription_id: SubscriptionId,
    event_task: JoinHandle<()>,
}

/// Orchestrates the WebSocket lifecycle: Connect -> Join -> Loop -> Disconnect
async fn handle_socket(mut socket: WebSocket, session_id: SessionId, player: PlayerIdentity, state: SharedState) {
    tracing::info!(session_id = %session_id, player = %player, "WebSocket connected.");

    let (connection, mut outbound) = match connect_player(&state, session_id, player).await {
        Ok(joined) => joined,
        Err(e) => {
            tracing::warn!(session_id = %session_id, error = %e, "Connection rejected.");
            let reply = match e {
                AppError::SessionNotFound(_) => ServerMessage::Redirect { to: "/sessions".into() },
                other => ServerMessage::Error { message: other.to_string() },
            };
            if let Ok(json_str) = serde_json::to_string(&reply) {
                let _ = socket.send(Message::Text(json_str.into())).await;
            }
            let _ = socket.close().await;
            return;
        }
    };

    // Split Socket
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Spawn Write Task (Server -> Client)
    let send_task = tokio::spawn(async move {
        while let Some(msg) = outbound.recv().await {
            let json_str = match serde_json::to_string(&msg) {
                Ok(json_str) => json_str,
                Err(e) => {
                    tracing::error!("Failed to serialize outbound message: {}", e);
                    continue;
                }
            };
            if ws_sender.send(Message::Text(json_str.into())).await.is_err() {
                break;
            }
        }
    });

    // Read Loop (Client -> Server)
    while let Some(Ok(msg)) = ws_receiver.next().await {
        match msg {
            Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => process_client_message(&state, &connection, client_msg).await,
                Err(e) => {
                    tracing::debug!(connection = %connection.id, error = %e, "Unparseable client message");
                    send_error_to_player(&state, &connection, "Unrecognized command").await;
                }
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    // Cleanup on Disconnect
    handle_disconnect(&state, connection).await;
    send_task.abort();
}

/// Joins the session, registers the connection and subscribes it to the session's events.
/// The returned receiver yields everything that should be pushed to the client.
pub async fn connect_player(
    state: &SharedState,
    session_id: SessionId,
    player: PlayerIdentity,
) -> Result<(PlayerConnection, mpsc::UnboundedReceiver<ServerMessage>), AppError> {
    let mut session = state.sessions.lock(session_id).await;
    let snapshot = session.connect(&player).await?;

    let id = ConnectionId::new();
    let (sender_tx, sender_rx) = mpsc::unbounded_channel::<ServerMessage>();
    state.registry.register(session_id, id, player.clone(), sender_tx.clone()).await;
    let subscription = state.bus.subscribe(session_id).await;
    let subscription_id = subscription.id;

    // Send initial state
    let _ = sender_tx.send(ServerMessage::Render(render::question(&snapshot, &player)));
    let event_task = tokio::spawn(forward_events(subscription, player.clone(), sender_tx));

    if !snapshot.all_guessed() {
        state.countdowns.cancel(session_id).await;
    }
    state.bus.publish(SessionEvent::PlayerJoined(Arc::new(snapshot))).await;
    drop(session);

    tracing::info!(session_id = %session_id, player = %player, connection = %id, "Player joined.");
    Ok((
        PlayerConnection {
            id,
            session_id,
            player,
            subscription_id,
            event_task,
        },
        sender_rx,
    ))
}

/// Renders every bus event for this connection's player.
async fn forward_events(mut subscription: Subscription, player: PlayerIdentity, sender: ConnectionSender) {
    while let Some(event) = subscription.recv().await {
        for view in render::views_for_event(&event, &player) {
            if sender.send(ServerMessage::Render(view)).is_err() {
                return;
            }
        }
    }
}

/// Route incoming messages to logic
pub async fn process_client_message(state: &SharedState, connection: &PlayerConnection, msg: ClientMessage) {
    tracing::debug!(session_id = %connection.session_id, player = %connection.player, "Received message: {:?}", msg);
    let result = match msg {
        ClientMessage::SetGuess(value) => handle_set_guess(state, connection, &value).await,
        ClientMessage::UnsetGuess => handle_unset_guess(state, connection).await,
    };

    if let Err(e) = result {
        tracing::warn!(session_id = %connection.session_id, player = %connection.player, error = %e, "Command failed.");
        send_error_to_player(state, connection, &e.to_string()).await;
    }
}

async fn handle_set_guess(state: &SharedState, connection: &PlayerConnection, value: &str) -> Result<(), AppError> {
    let mut session = state.sessions.lock(connection.session_id).await;
    let snapshot = session.set_guess(&connection.player, value).await?;
    let all_guessed = snapshot.all_guessed();
    let question = snapshot.get_current_question().text.clone();

    state.bus.publish(SessionEvent::GuessSet(Arc::new(snapshot))).await;
    if all_guessed {
        start_countdown(state, connection.session_id, question).await;
    }
    Ok(())
}

async fn handle_unset_guess(state: &SharedState, connection: &PlayerConnection) -> Result<(), AppError> {
    let mut session = state.sessions.lock(connection.session_id).await;
    let snapshot = session.unset_guess(&connection.player).await?;

    state.countdowns.cancel(connection.session_id).await;
    state.bus.publish(SessionEvent::GuessUnset(Arc::new(snapshot))).await;
    Ok(())
}

/// Starts the reveal/advance countdown for the session, superseding any pending one.
async fn start_countdown(state: &SharedState, session_id: SessionId, question: String) {
    tracing::info!(session_id = %session_id, "Everyone guessed, starting countdown.");
    let chain_state = state.clone();
    state
        .countdowns
        .start(session_id, move |cancelled| {
            reveal_then_advance(chain_state, session_id, question, cancelled)
        })
        .await;
}

/// Waits, reveals the answers, waits again, then moves to the next question.
/// Stops quietly if cancelled during a wait or if the round changed meanwhile.
async fn reveal_then_advance(state: SharedState, session_id: SessionId, question: String, mut cancelled: CancelSignal) {
    let game = &state.config.game;
    if !wait_or_cancel(game.reveal_delay(), &mut cancelled).await {
        return;
    }

    {
        let session = state.sessions.lock(session_id).await;
        let snapshot = match session.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(session_id = %session_id, error = %e, "Countdown could not load session.");
                return;
            }
        };
        if snapshot.get_current_question().text != question || !snapshot.all_guessed() {
            tracing::debug!(session_id = %session_id, "Round changed before reveal.");
            return;
        }
        state.bus.publish(SessionEvent::AnswersRevealed(Arc::new(snapshot))).await;
    }

    if !wait_or_cancel(game.advance_delay(), &mut cancelled).await {
        return;
    }

    let mut session = state.sessions.lock(session_id).await;
    match session.advance_if_all_guessed(&question).await {
        Ok(Some(next)) => {
            tracing::info!(session_id = %session_id, remaining = next.get_question_pool().len(), "Advanced to next question.");
            state.bus.publish(SessionEvent::NextQuestion(Arc::new(next))).await;
        }
        Ok(None) => tracing::debug!(session_id = %session_id, "Round changed before advance."),
        Err(AppError::Game(GameError::NoMoreQuestions)) => {
            tracing::info!(session_id = %session_id, "Question pool exhausted.");
            if let Ok(last) = session.snapshot().await {
                state.bus.publish(SessionEvent::QuestionsExhausted(Arc::new(last))).await;
            }
        }
        Err(e) => tracing::warn!(session_id = %session_id, error = %e, "Countdown failed to advance."),
    }
}

/// Cleanup when socket closes
pub async fn handle_disconnect(state: &SharedState, connection: PlayerConnection) {
    let PlayerConnection {
        id,
        session_id,
        player,
        subscription_id,
        event_task,
    } = connection;
    tracing::info!(session_id = %session_id, player = %player, connection = %id, "WebSocket disconnected.");

    event_task.abort();
    state.bus.unsubscribe(session_id, subscription_id).await;
    state.registry.deregister(session_id, id).await;

    let mut session = state.sessions.lock(session_id).await;
    let snapshot = match session.disconnect(&player).await {
        Ok(Some(snapshot)) => snapshot,
        Ok(None) => {
            tracing::debug!(session_id = %session_id, player = %player, "Player still connected elsewhere.");
            return;
        }
        Err(e) => {
            tracing::warn!(session_id = %session_id, player = %player, error = %e, "Leave failed.");
            return;
        }
    };
    let empty = snapshot.get_players().is_empty();
    let all_guessed = snapshot.all_guessed();
    let question = snapshot.get_current_question().text.clone();

    state.bus.publish(SessionEvent::PlayerLeft(Arc::new(snapshot))).await;
    if empty {
        state.countdowns.cancel(session_id).await;
    } else if all_guessed {
        start_countdown(state, session_id, question).await;
    }
}

/// Send an error message to a specific connection
async fn send_error_to_player(state: &SharedState, connection: &PlayerConnection, msg: &str) {
    let delivered = state
        .registry
        .send_to(
            connection.session_id,
            connection.id,
            ServerMessage::Error { message: msg.into() },
        )
        .await;
    if !delivered {
        tracing::debug!(connection = %connection.id, "Error message not delivered.");
    }
}
