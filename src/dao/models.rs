use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Serialized form of a game record, stored as one value per game id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameRecordEntity {
    /// Primary key of the game.
    pub game_id: String,
    /// Board rows from the top, each cell encoded as 0 (empty), 1 or 2.
    pub grid: Vec<Vec<u8>>,
    /// Seat number (1 or 2) per player id.
    pub player_positions: IndexMap<String, u8>,
    /// Open connection count per player id.
    pub player_open_connections: IndexMap<String, u32>,
    /// Seat number expected to move next.
    pub position_with_turn: u8,
    /// `None` while in progress, `Some(0)` for a draw, otherwise the winning seat.
    pub winner: Option<u8>,
}

impl GameRecordEntity {
    /// Encode the entity into the bytes handed to the key-value store.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Decode bytes previously produced by [`GameRecordEntity::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
