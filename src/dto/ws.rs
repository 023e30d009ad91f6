use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use crate::dto::{game::GameStateMessage, validation::validate_player_id};

/// Messages accepted from player WebSocket clients.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(tag = "type")]
pub enum PlayerInboundMessage {
    /// First frame of every connection.
    #[serde(rename = "join")]
    Join(JoinPayload),
    /// Drop a disc in a column.
    #[serde(rename = "drop_disc")]
    DropDisc(DropDiscPayload),
    /// Start a new round once the current one has ended.
    #[serde(rename = "restart")]
    Restart,
    /// Anything else; ignored.
    #[serde(other)]
    Unknown,
}

/// Body of a `join` frame.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct JoinPayload {
    /// Identifier received from an earlier `joined` reply, when reconnecting.
    #[serde(default)]
    pub player_id: Option<String>,
}

impl Validate for JoinPayload {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(Err(err)) = self.player_id.as_deref().map(validate_player_id) {
            errors.add("player_id", err);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Body of a `drop_disc` frame.
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct DropDiscPayload {
    /// Zero-based column, left to right.
    #[validate(range(max = 6))]
    pub column_index: usize,
}

/// An inbound frame was rejected before reaching the game.
#[derive(Debug, Error)]
pub enum InboundMessageError {
    /// Not JSON, or not one of the known shapes.
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    /// Well-formed but carrying out-of-range values.
    #[error("invalid message: {0}")]
    Invalid(#[from] ValidationErrors),
}

impl PlayerInboundMessage {
    /// Parse and validate a text frame.
    pub fn from_json_str(text: &str) -> Result<Self, InboundMessageError> {
        let message: Self = serde_json::from_str(text)?;
        match &message {
            Self::Join(payload) => payload.validate()?,
            Self::DropDisc(payload) => payload.validate()?,
            Self::Restart | Self::Unknown => {}
        }
        Ok(message)
    }
}

/// Category attached to an `alert` so clients can react without parsing text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AlertCode {
    /// Both seats are taken.
    GameFull,
    /// The player already holds a seat.
    AlreadyJoined,
    /// The other seat has the turn.
    OutOfTurn,
    /// The game has a winner or ended in a draw.
    GameOver,
    /// The chosen column has no free cell.
    ColumnFull,
    /// No game exists under this id.
    GameNotFound,
    /// Restart was requested while the game is still running.
    NotFinished,
    /// The game is locked by another request; retry.
    Busy,
    /// Storage is down.
    Unavailable,
    /// The frame could not be parsed or validated.
    InvalidMessage,
    /// Unexpected server-side failure.
    Internal,
}

/// Messages pushed to player WebSocket clients.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlayerOutboundMessage {
    /// Sent once to the joining connection.
    Joined {
        /// Game the connection is bound to.
        game_id: String,
        /// Identifier to present when reconnecting.
        player_id: String,
        /// Seat held by the player.
        seat: u8,
    },
    /// Broadcast to every connection of the game after each change.
    GameState(GameStateMessage),
    /// Sent only to the connection whose request was rejected.
    Alert {
        /// Machine readable category.
        code: AlertCode,
        /// Text meant for the player.
        message: String,
    },
}

impl PlayerOutboundMessage {
    /// Convenience constructor for an alert.
    pub fn alert(code: AlertCode, message: impl Into<String>) -> Self {
        Self::Alert {
            code,
            message: message.into(),
        }
    }
}
