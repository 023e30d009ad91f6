use std::time::Duration;

use tracing::{error, info, warn};

use crate::{
    dto::{game::GameStateMessage, ws::PlayerOutboundMessage},
    error::ServiceError,
    state::{
        SharedState,
        game::{Departure, GameRecord, TransitionError},
        grid::Seat,
        session_store::SessionError,
    },
};

const LEAVE_ATTEMPTS: u32 = 5;
const LEAVE_INITIAL_BACKOFF: Duration = Duration::from_millis(200);
const LEAVE_MAX_BACKOFF: Duration = Duration::from_secs(2);

/// Player identity handed back to a connection after a successful join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedGame {
    /// Identifier to present when reconnecting.
    pub player_id: String,
    /// Seat held in the game.
    pub seat: Seat,
}

/// Allocate a new empty game.
pub async fn create_game(state: &SharedState) -> Result<String, ServiceError> {
    let game_id = state
        .sessions()
        .create()
        .await
        .map_err(ServiceError::from)
        .inspect_err(|err| log_failure("-", "create", err))?;

    info!(game_id = %game_id, "game created");
    Ok(game_id)
}

/// Current state of a game as sent to clients.
pub async fn game_snapshot(
    state: &SharedState,
    game_id: &str,
) -> Result<GameStateMessage, ServiceError> {
    let record = state
        .sessions()
        .get(game_id)
        .await
        .map_err(ServiceError::from)
        .inspect_err(|err| log_failure(game_id, "snapshot", err))?
        .ok_or_else(|| ServiceError::NotFound(format!("game `{game_id}` not found")))?;

    Ok(GameStateMessage::from(&record))
}

/// Seat a connection in a game.
///
/// A returning `player_id` that still holds its seat only opens one more connection.
/// One whose seat was released in the meantime is seated again under the same id.
pub async fn join_game(
    state: &SharedState,
    game_id: &str,
    returning: Option<String>,
) -> Result<JoinedGame, ServiceError> {
    let result = seat_connection(state, game_id, returning).await;
    let (joined, record) = result.inspect_err(|err| log_failure(game_id, "join", err))?;

    broadcast_state(state, &record);
    Ok(joined)
}

async fn seat_connection(
    state: &SharedState,
    game_id: &str,
    returning: Option<String>,
) -> Result<(JoinedGame, GameRecord), ServiceError> {
    let sessions = state.sessions();

    let player_id = match returning {
        Some(player_id) => match sessions.add_connection(game_id, &player_id).await {
            Ok((connections, record)) => {
                let seat = record.seat_of(&player_id).ok_or_else(|| {
                    ServiceError::ContractViolation(TransitionError::NotSeated(player_id.clone()))
                })?;
                info!(
                    game_id = %game_id,
                    seat = seat.number(),
                    connections,
                    "player opened another connection"
                );
                return Ok((JoinedGame { player_id, seat }, record));
            }
            Err(SessionError::Transition(TransitionError::NotSeated(_))) => player_id,
            Err(err) => return Err(err.into()),
        },
        None => sessions.new_player_id(),
    };

    let (seat, record) = sessions.add_player(game_id, &player_id).await?;
    info!(
        game_id = %game_id,
        seat = seat.number(),
        players = record.player_count(),
        "player joined"
    );
    Ok((JoinedGame { player_id, seat }, record))
}

/// Drop a disc for a seated player and broadcast the new state.
pub async fn play_turn(
    state: &SharedState,
    game_id: &str,
    player_id: &str,
    column: usize,
) -> Result<(), ServiceError> {
    let record = state
        .sessions()
        .play_turn(game_id, player_id, column)
        .await
        .map_err(ServiceError::from)
        .inspect_err(|err| log_failure(game_id, "drop_disc", err))?;

    info!(game_id = %game_id, column, outcome = ?record.outcome, "disc dropped");
    broadcast_state(state, &record);
    Ok(())
}

/// Start a new round of a finished game.
pub async fn restart_game(state: &SharedState, game_id: &str) -> Result<(), ServiceError> {
    let record = state
        .sessions()
        .restart(game_id)
        .await
        .map_err(ServiceError::from)
        .inspect_err(|err| log_failure(game_id, "restart", err))?;

    info!(game_id = %game_id, "game restarted");
    broadcast_state(state, &record);
    Ok(())
}

/// Account for a closed connection, releasing the seat with the last one.
///
/// Transient failures are retried with backoff.
pub async fn leave_game(
    state: &SharedState,
    game_id: &str,
    player_id: &str,
) -> Result<Departure, ServiceError> {
    let (departure, record) = disconnect_with_retry(state, game_id, player_id)
        .await
        .map_err(ServiceError::from)
        .inspect_err(|err| log_failure(game_id, "disconnect", err))?;

    match departure {
        Departure::ConnectionClosed { remaining } => {
            info!(game_id = %game_id, remaining, "player closed a connection");
        }
        Departure::PlayerLeft { seat } => {
            info!(game_id = %game_id, seat = seat.number(), "player left");
        }
    }

    broadcast_state(state, &record);
    Ok(departure)
}

async fn disconnect_with_retry(
    state: &SharedState,
    game_id: &str,
    player_id: &str,
) -> Result<(Departure, GameRecord), SessionError> {
    let mut backoff = LEAVE_INITIAL_BACKOFF;
    let mut attempt = 1;

    loop {
        match state.sessions().disconnect(game_id, player_id).await {
            Err(err) if err.is_transient() && attempt < LEAVE_ATTEMPTS => {
                warn!(
                    game_id = %game_id,
                    attempt,
                    error = %err,
                    "disconnect failed, retrying"
                );
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(LEAVE_MAX_BACKOFF);
                attempt += 1;
            }
            result => return result,
        }
    }
}

fn broadcast_state(state: &SharedState, record: &GameRecord) {
    state.rooms().broadcast(
        &record.game_id,
        PlayerOutboundMessage::GameState(GameStateMessage::from(record)),
    );
}

fn log_failure(game_id: &str, action: &'static str, err: &ServiceError) {
    match err {
        ServiceError::Rejected(_) | ServiceError::NotFound(_) | ServiceError::InvalidInput(_) => {
            info!(game_id = %game_id, action, error = %err, "request rejected");
        }
        ServiceError::ContractViolation(_) => {
            warn!(game_id = %game_id, action, error = %err, "request broke a precondition");
        }
        ServiceError::Degraded | ServiceError::Unavailable(_) | ServiceError::Timeout => {
            warn!(game_id = %game_id, action, error = %err, "request failed transiently");
        }
        ServiceError::Internal(source) => {
            error!(game_id = %game_id, action, error = ?source, "game record unusable");
        }
    }
}
