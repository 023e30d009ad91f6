use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::{
    sync::{broadcast, mpsc},
    task::JoinHandle,
};
use tracing::{info, warn};

use crate::{
    dto::ws::{AlertCode, PlayerInboundMessage, PlayerOutboundMessage},
    error::ServiceError,
    services::game_service::{self, JoinedGame},
    state::{SharedState, game::TransitionError},
};

/// The writer half of a connection is gone.
#[derive(Debug, Error)]
#[error("connection closed")]
pub struct ConnectionClosed;

/// Handle the full lifecycle of one player connection to a game.
pub async fn handle_socket(state: SharedState, game_id: String, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let join_timeout = state.config().join_timeout();
    let initial_message = match tokio::time::timeout(join_timeout, receiver.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => text,
        Ok(Some(Ok(Message::Close(_)))) => {
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Ok(_))) => {
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Err(err))) => {
            warn!(error = %err, "websocket receive error");
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(None) | Err(_) => {
            warn!(game_id = %game_id, "websocket join timed out");
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let returning = match PlayerInboundMessage::from_json_str(initial_message.as_str()) {
        Ok(PlayerInboundMessage::Join(payload)) => payload.player_id,
        Ok(_) => {
            warn!(game_id = %game_id, "first message was not join");
            close_with_alert(&outbound_tx, AlertCode::InvalidMessage, "Join the game first.");
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Err(err) => {
            warn!(game_id = %game_id, error = %err, "failed to parse or validate join message");
            close_with_alert(&outbound_tx, AlertCode::InvalidMessage, err.to_string());
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    // Subscribe before joining so the join broadcast reaches this connection too.
    let room = state.rooms().subscribe(&game_id);

    let JoinedGame { player_id, seat } =
        match game_service::join_game(&state, &game_id, returning).await {
            Ok(joined) => joined,
            Err(err) => {
                let (code, message) = alert_for(&err);
                close_with_alert(&outbound_tx, code, message);
                drop(room);
                state.rooms().release(&game_id);
                finalize(writer_task, outbound_tx).await;
                return;
            }
        };

    let _ = send_message_to_websocket(
        &outbound_tx,
        &PlayerOutboundMessage::Joined {
            game_id: game_id.clone(),
            player_id: player_id.clone(),
            seat: seat.number(),
        },
    );

    let forward_task = tokio::spawn(forward_room(room, outbound_tx.clone()));

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => match PlayerInboundMessage::from_json_str(text.as_str()) {
                Ok(PlayerInboundMessage::DropDisc(payload)) => {
                    let result = game_service::play_turn(
                        &state,
                        &game_id,
                        &player_id,
                        payload.column_index,
                    )
                    .await;
                    report(&outbound_tx, result);
                }
                Ok(PlayerInboundMessage::Restart) => {
                    report(&outbound_tx, game_service::restart_game(&state, &game_id).await);
                }
                Ok(PlayerInboundMessage::Join(_)) => {
                    warn!(game_id = %game_id, "ignoring duplicate join message");
                }
                Ok(PlayerInboundMessage::Unknown) => {
                    warn!(game_id = %game_id, payload = %text.as_str(), "ignoring unknown message");
                }
                Err(err) => {
                    warn!(game_id = %game_id, error = %err, "failed to parse or validate player message");
                    let _ = send_message_to_websocket(
                        &outbound_tx,
                        &PlayerOutboundMessage::alert(AlertCode::InvalidMessage, err.to_string()),
                    );
                }
            },
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) => {}
            Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(game_id = %game_id, error = %err, "websocket error");
                break;
            }
        }
    }

    if let Err(err) = game_service::leave_game(&state, &game_id, &player_id).await {
        warn!(game_id = %game_id, error = %err, "failed to record disconnect");
    }

    forward_task.abort();
    let _ = forward_task.await;
    state.rooms().release(&game_id);
    info!(game_id = %game_id, seat = seat.number(), "player connection closed");

    finalize(writer_task, outbound_tx).await;
}

/// Relay room broadcasts into this connection's writer until either side goes away.
async fn forward_room(
    mut room: broadcast::Receiver<PlayerOutboundMessage>,
    tx: mpsc::UnboundedSender<Message>,
) {
    loop {
        match room.recv().await {
            Ok(message) => {
                if send_message_to_websocket(&tx, &message).is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "connection lagging behind game updates");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Send an alert for a failed request to the requesting connection only.
fn report(tx: &mpsc::UnboundedSender<Message>, result: Result<(), ServiceError>) {
    if let Err(err) = result {
        let (code, message) = alert_for(&err);
        let _ = send_message_to_websocket(tx, &PlayerOutboundMessage::alert(code, message));
    }
}

fn close_with_alert(
    tx: &mpsc::UnboundedSender<Message>,
    code: AlertCode,
    message: impl Into<String>,
) {
    let _ = send_message_to_websocket(tx, &PlayerOutboundMessage::alert(code, message));
    let _ = tx.send(Message::Close(None));
}

/// Player-facing wording for a failed request.
pub fn alert_for(err: &ServiceError) -> (AlertCode, String) {
    match err {
        ServiceError::Rejected(inner) => match inner {
            TransitionError::GameFull => (AlertCode::GameFull, "This game is full.".into()),
            TransitionError::AlreadyJoined(_) => (
                AlertCode::AlreadyJoined,
                "You have already joined this game.".into(),
            ),
            TransitionError::OutOfTurn(_) => (AlertCode::OutOfTurn, "It's not your turn!".into()),
            TransitionError::GameOver => (AlertCode::GameOver, "The game is over!".into()),
            TransitionError::ColumnFull(_) => (
                AlertCode::ColumnFull,
                "This column is full. Please pick another column.".into(),
            ),
            other => (AlertCode::Internal, other.to_string()),
        },
        ServiceError::ContractViolation(TransitionError::NotFinished) => (
            AlertCode::NotFinished,
            "The game can only be restarted once it is over.".into(),
        ),
        ServiceError::NotFound(_) => (AlertCode::GameNotFound, "This game does not exist.".into()),
        ServiceError::Timeout => (
            AlertCode::Busy,
            "The game is busy. Please try again.".into(),
        ),
        ServiceError::Degraded | ServiceError::Unavailable(_) => (
            AlertCode::Unavailable,
            "The game is temporarily unavailable.".into(),
        ),
        ServiceError::InvalidInput(message) => (AlertCode::InvalidMessage, message.clone()),
        ServiceError::ContractViolation(_) | ServiceError::Internal(_) => {
            (AlertCode::Internal, "Something went wrong.".into())
        }
    }
}

/// Serialize a payload and push it onto the provided WebSocket sender.
///
/// Serialization failures are logged and swallowed; only a closed writer is reported.
pub fn send_message_to_websocket<T>(
    tx: &mpsc::UnboundedSender<Message>,
    value: &T,
) -> Result<(), ConnectionClosed>
where
    T: ?Sized + serde::Serialize + std::fmt::Debug,
{
    let payload = match serde_json::to_string(value) {
        Ok(p) => p,
        Err(err) => {
            warn!(error = %err, "failed to serialize message `{value:?}`");
            return Ok(());
        }
    };

    tx.send(Message::Text(payload.into()))
        .map_err(|_| ConnectionClosed)
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
