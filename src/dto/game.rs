use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{dao::models::GameRecordEntity, state::game::GameRecord};

/// Snapshot of a game pushed to every connection after each transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GameStateMessage {
    /// Board rows from the top, cells encoded as 0 (empty), 1 or 2.
    pub grid: Vec<Vec<u8>>,
    /// Seat expected to move next.
    pub position_with_turn: u8,
    /// Number of seated players.
    pub player_count: usize,
    /// `null` while in progress, `0` for a draw, otherwise the winning seat.
    pub winner: Option<u8>,
}

impl From<&GameRecord> for GameStateMessage {
    fn from(record: &GameRecord) -> Self {
        let entity = GameRecordEntity::from(record);
        Self {
            grid: entity.grid,
            position_with_turn: entity.position_with_turn,
            player_count: entity.player_positions.len(),
            winner: entity.winner,
        }
    }
}

/// Body returned when a game is created.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateGameResponse {
    /// Identifier to share with the second player.
    pub game_id: String,
}
