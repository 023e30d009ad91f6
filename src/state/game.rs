use indexmap::IndexMap;
use thiserror::Error;

use crate::{
    dao::models::GameRecordEntity,
    state::grid::{COLUMNS, Grid, GridColumnFullError, InvalidGridError, Seat},
};

/// Terminal classification of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Moves are still being accepted.
    InProgress,
    /// The board filled up without a winner.
    Draw,
    /// A seat completed four in a row.
    WonBySeat(Seat),
}

impl Outcome {
    /// Whether the game has ended.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Outcome::InProgress)
    }
}

/// Result of closing one connection of a player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Departure {
    /// The player still has other connections open.
    ConnectionClosed {
        /// Connections left after this one closed.
        remaining: u32,
    },
    /// The last connection closed and the seat was released.
    PlayerLeft {
        /// Seat that became free.
        seat: Seat,
    },
}

/// Rejections produced while applying a transition to a [`GameRecord`].
///
/// The record is left untouched whenever one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// Two distinct players already hold both seats.
    #[error("this game is full")]
    GameFull,
    /// The player already holds a seat in this game.
    #[error("player `{0}` has already joined the game")]
    AlreadyJoined(String),
    /// The player tried to move while it is the other seat's turn.
    #[error("it's not seat {0:?}'s turn")]
    OutOfTurn(Seat),
    /// The game has reached a terminal outcome.
    #[error("the game has ended")]
    GameOver,
    /// The chosen column has no room left.
    #[error(transparent)]
    ColumnFull(#[from] GridColumnFullError),
    /// The player holds no seat in this game.
    #[error("player `{0}` has no seat in this game")]
    NotSeated(String),
    /// The player has no open connection left to close.
    #[error("player `{0}` has no open connections")]
    NoOpenConnections(String),
    /// The player has no connection entry.
    #[error("player `{0}` has no connection entry")]
    MissingConnectionEntry(String),
    /// The column index lies outside the board.
    #[error("column index must be between 0 and {max}, got {0}", max = COLUMNS - 1)]
    ColumnOutOfRange(usize),
    /// A restart was requested while the game is still running.
    #[error("the game has not ended yet")]
    NotFinished,
}

impl TransitionError {
    /// True for caller/protocol bugs as opposed to expected game outcomes.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            TransitionError::NotSeated(_)
                | TransitionError::NoOpenConnections(_)
                | TransitionError::MissingConnectionEntry(_)
                | TransitionError::ColumnOutOfRange(_)
                | TransitionError::NotFinished
        )
    }
}

/// A stored record failed the structural checks run when it is loaded.
#[derive(Debug, Error)]
pub enum CorruptRecordError {
    /// The payload is not a serialized record.
    #[error("failed to decode game record")]
    Decode(#[source] serde_json::Error),
    /// The grid violates a board invariant.
    #[error(transparent)]
    InvalidGrid(#[from] InvalidGridError),
    /// A seat value other than 1 or 2.
    #[error("invalid seat {seat} for player `{player_id}`")]
    InvalidSeat {
        /// Player holding the bogus seat.
        player_id: String,
        /// Raw seat value.
        seat: u8,
    },
    /// Two players share a seat.
    #[error("seat {0} is held by more than one player")]
    DuplicateSeat(u8),
    /// The turn pointer is not a seat.
    #[error("invalid turn seat {0}")]
    InvalidTurn(u8),
    /// The winner value is neither draw nor a seat.
    #[error("invalid winner value {0}")]
    InvalidWinner(u8),
}

/// Authoritative state of one game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameRecord {
    /// Opaque identifier, never changes.
    pub game_id: String,
    /// Current board.
    pub grid: Grid,
    /// Seat held by each joined player, in join order.
    pub player_positions: IndexMap<String, Seat>,
    /// Open transport connections per player.
    pub player_open_connections: IndexMap<String, u32>,
    /// Seat expected to move next.
    pub turn_seat: Seat,
    /// Current classification of the game.
    pub outcome: Outcome,
}

impl GameRecord {
    /// Fresh record with an empty board and no players.
    pub fn new(game_id: impl Into<String>) -> Self {
        Self {
            game_id: game_id.into(),
            grid: Grid::new(),
            player_positions: IndexMap::new(),
            player_open_connections: IndexMap::new(),
            turn_seat: Seat::One,
            outcome: Outcome::InProgress,
        }
    }

    /// Number of players currently holding a seat.
    pub fn player_count(&self) -> usize {
        self.player_positions.len()
    }

    /// Seat held by `player_id`, if any.
    pub fn seat_of(&self, player_id: &str) -> Option<Seat> {
        self.player_positions.get(player_id).copied()
    }

    /// Seat a new player on the lowest free seat and count its first connection.
    pub fn add_player(&mut self, player_id: &str) -> Result<Seat, TransitionError> {
        if self.player_positions.len() >= 2 {
            return Err(TransitionError::GameFull);
        }
        if self.player_positions.contains_key(player_id) {
            return Err(TransitionError::AlreadyJoined(player_id.to_string()));
        }

        let seat = if self.player_positions.values().any(|&s| s == Seat::One) {
            Seat::Two
        } else {
            Seat::One
        };

        self.player_positions.insert(player_id.to_string(), seat);
        *self
            .player_open_connections
            .entry(player_id.to_string())
            .or_insert(0) += 1;

        Ok(seat)
    }

    /// Count one more open connection for an already seated player.
    pub fn add_connection(&mut self, player_id: &str) -> Result<u32, TransitionError> {
        if !self.player_positions.contains_key(player_id) {
            return Err(TransitionError::NotSeated(player_id.to_string()));
        }

        let count = self
            .player_open_connections
            .entry(player_id.to_string())
            .or_insert(0);
        *count += 1;
        Ok(*count)
    }

    /// Count one connection less. The seat is kept even when the count drops to zero.
    pub fn remove_connection(&mut self, player_id: &str) -> Result<u32, TransitionError> {
        match self.player_open_connections.get_mut(player_id) {
            Some(count) if *count > 0 => {
                *count -= 1;
                Ok(*count)
            }
            _ => Err(TransitionError::NoOpenConnections(player_id.to_string())),
        }
    }

    /// Release the player's seat and forget its connection entry.
    pub fn remove_player(&mut self, player_id: &str) -> Result<Seat, TransitionError> {
        let Some(&seat) = self.player_positions.get(player_id) else {
            return Err(TransitionError::NotSeated(player_id.to_string()));
        };
        if !self.player_open_connections.contains_key(player_id) {
            return Err(TransitionError::MissingConnectionEntry(player_id.to_string()));
        }

        self.player_open_connections.shift_remove(player_id);
        self.player_positions.shift_remove(player_id);
        Ok(seat)
    }

    /// Close one connection, releasing the seat when it was the last one.
    pub fn disconnect(&mut self, player_id: &str) -> Result<Departure, TransitionError> {
        match self.player_open_connections.get(player_id).copied() {
            Some(count) if count > 1 => {
                let remaining = self.remove_connection(player_id)?;
                Ok(Departure::ConnectionClosed { remaining })
            }
            Some(1) => {
                let seat = self.remove_player(player_id)?;
                Ok(Departure::PlayerLeft { seat })
            }
            _ => Err(TransitionError::NoOpenConnections(player_id.to_string())),
        }
    }

    /// Drop a disc for `player_id` and advance the game.
    pub fn play_turn(&mut self, player_id: &str, column: usize) -> Result<(), TransitionError> {
        if self.outcome.is_terminal() {
            return Err(TransitionError::GameOver);
        }

        let seat = self
            .seat_of(player_id)
            .ok_or_else(|| TransitionError::NotSeated(player_id.to_string()))?;

        if seat != self.turn_seat {
            return Err(TransitionError::OutOfTurn(seat));
        }
        if column >= COLUMNS {
            return Err(TransitionError::ColumnOutOfRange(column));
        }

        let (row, column) = self.grid.drop_disc(column, seat.disc())?;

        if let Some(winner) = self.grid.is_winning_disc(row, column) {
            self.outcome = Outcome::WonBySeat(winner);
        } else if self.grid.is_full() {
            self.outcome = Outcome::Draw;
        } else {
            self.turn_seat = seat.other();
        }

        Ok(())
    }

    /// Reset a finished game, keeping its players and their connections.
    pub fn restart(&mut self) -> Result<(), TransitionError> {
        if !self.outcome.is_terminal() {
            return Err(TransitionError::NotFinished);
        }

        self.grid = Grid::new();
        self.turn_seat = Seat::One;
        self.outcome = Outcome::InProgress;
        Ok(())
    }
}

impl From<&GameRecord> for GameRecordEntity {
    fn from(value: &GameRecord) -> Self {
        Self {
            game_id: value.game_id.clone(),
            grid: value.grid.to_rows(),
            player_positions: value
                .player_positions
                .iter()
                .map(|(player_id, seat)| (player_id.clone(), seat.number()))
                .collect(),
            player_open_connections: value.player_open_connections.clone(),
            position_with_turn: value.turn_seat.number(),
            winner: match value.outcome {
                Outcome::InProgress => None,
                Outcome::Draw => Some(0),
                Outcome::WonBySeat(seat) => Some(seat.number()),
            },
        }
    }
}

impl TryFrom<GameRecordEntity> for GameRecord {
    type Error = CorruptRecordError;

    fn try_from(value: GameRecordEntity) -> Result<Self, Self::Error> {
        let grid = Grid::from_rows(&value.grid)?;

        let mut player_positions = IndexMap::with_capacity(value.player_positions.len());
        for (player_id, raw) in value.player_positions {
            let seat = Seat::from_number(raw).ok_or_else(|| CorruptRecordError::InvalidSeat {
                player_id: player_id.clone(),
                seat: raw,
            })?;
            if player_positions.values().any(|&taken| taken == seat) {
                return Err(CorruptRecordError::DuplicateSeat(raw));
            }
            player_positions.insert(player_id, seat);
        }

        let turn_seat = Seat::from_number(value.position_with_turn)
            .ok_or(CorruptRecordError::InvalidTurn(value.position_with_turn))?;

        let outcome = match value.winner {
            None => Outcome::InProgress,
            Some(0) => Outcome::Draw,
            Some(raw) => Outcome::WonBySeat(
                Seat::from_number(raw).ok_or(CorruptRecordError::InvalidWinner(raw))?,
            ),
        };

        Ok(Self {
            game_id: value.game_id,
            grid,
            player_positions,
            player_open_connections: value.player_open_connections,
            turn_seat,
            outcome,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::grid::{DiscType, ROWS};

    fn two_player_game() -> GameRecord {
        let mut record = GameRecord::new("game");
        assert_eq!(record.add_player("alice"), Ok(Seat::One));
        assert_eq!(record.add_player("bob"), Ok(Seat::Two));
        record
    }

    #[test]
    fn new_record_is_empty_and_in_progress() {
        let record = GameRecord::new("abc");
        assert_eq!(record.game_id, "abc");
        assert_eq!(record.grid, Grid::new());
        assert_eq!(record.player_count(), 0);
        assert_eq!(record.turn_seat, Seat::One);
        assert_eq!(record.outcome, Outcome::InProgress);
    }

    #[test]
    fn third_player_is_rejected() {
        let mut record = two_player_game();
        let before = record.clone();
        assert_eq!(record.add_player("carol"), Err(TransitionError::GameFull));
        assert_eq!(record, before);
    }

    #[test]
    fn rejoining_player_is_rejected() {
        let mut record = GameRecord::new("game");
        record.add_player("alice").unwrap();
        assert_eq!(
            record.add_player("alice"),
            Err(TransitionError::AlreadyJoined("alice".into()))
        );
        assert_eq!(record.player_open_connections["alice"], 1);
    }

    #[test]
    fn freed_seat_is_reused() {
        let mut record = two_player_game();
        assert_eq!(record.remove_player("alice"), Ok(Seat::One));
        assert_eq!(record.add_player("carol"), Ok(Seat::One));

        let mut record = two_player_game();
        assert_eq!(record.remove_player("bob"), Ok(Seat::Two));
        assert_eq!(record.add_player("carol"), Ok(Seat::Two));
    }

    #[test]
    fn connection_counting() {
        let mut record = GameRecord::new("game");
        assert_eq!(
            record.add_connection("alice"),
            Err(TransitionError::NotSeated("alice".into()))
        );

        record.add_player("alice").unwrap();
        assert_eq!(record.add_connection("alice"), Ok(2));
        assert_eq!(record.remove_connection("alice"), Ok(1));
        assert_eq!(record.remove_connection("alice"), Ok(0));
        assert_eq!(record.seat_of("alice"), Some(Seat::One));

        let err = record.remove_connection("alice").unwrap_err();
        assert_eq!(err, TransitionError::NoOpenConnections("alice".into()));
        assert!(err.is_contract_violation());
    }

    #[test]
    fn remove_player_requires_seat_and_entry() {
        let mut record = GameRecord::new("game");
        assert_eq!(
            record.remove_player("ghost"),
            Err(TransitionError::NotSeated("ghost".into()))
        );

        record.add_player("alice").unwrap();
        record.player_open_connections.shift_remove("alice");
        assert_eq!(
            record.remove_player("alice"),
            Err(TransitionError::MissingConnectionEntry("alice".into()))
        );
    }

    #[test]
    fn disconnect_keeps_seat_until_last_connection() {
        let mut record = two_player_game();
        record.add_connection("alice").unwrap();

        assert_eq!(
            record.disconnect("alice"),
            Ok(Departure::ConnectionClosed { remaining: 1 })
        );
        assert_eq!(record.seat_of("alice"), Some(Seat::One));

        assert_eq!(
            record.disconnect("alice"),
            Ok(Departure::PlayerLeft { seat: Seat::One })
        );
        assert_eq!(record.seat_of("alice"), None);
        assert!(!record.player_open_connections.contains_key("alice"));
        assert_eq!(
            record.disconnect("alice"),
            Err(TransitionError::NoOpenConnections("alice".into()))
        );
    }

    #[test]
    fn turns_alternate_until_the_game_ends() {
        let mut record = two_player_game();
        let players = ["alice", "bob"];
        let mut expected = Seat::One;

        // Columns chosen so nobody lines up four before the sequence ends.
        for (i, column) in [0, 1, 2, 3, 4, 5, 6, 0, 1, 2].into_iter().enumerate() {
            assert_eq!(record.turn_seat, expected);
            record.play_turn(players[i % 2], column).unwrap();
            expected = expected.other();
        }
        assert_eq!(record.outcome, Outcome::InProgress);
    }

    #[test]
    fn out_of_turn_move_changes_nothing() {
        let mut record = two_player_game();
        let before = record.clone();
        assert_eq!(
            record.play_turn("bob", 3),
            Err(TransitionError::OutOfTurn(Seat::Two))
        );
        assert_eq!(record, before);
    }

    #[test]
    fn unseated_player_cannot_move() {
        let mut record = two_player_game();
        let err = record.play_turn("mallory", 0).unwrap_err();
        assert!(err.is_contract_violation());
    }

    #[test]
    fn out_of_range_column_is_a_contract_violation() {
        let mut record = two_player_game();
        let before = record.clone();
        let err = record.play_turn("alice", COLUMNS).unwrap_err();
        assert_eq!(err, TransitionError::ColumnOutOfRange(COLUMNS));
        assert!(err.is_contract_violation());
        assert_eq!(record, before);
    }

    #[test]
    fn full_column_keeps_turn() {
        let mut record = two_player_game();
        for i in 0..ROWS {
            let player = if i % 2 == 0 { "alice" } else { "bob" };
            record.play_turn(player, 0).unwrap();
        }

        let before = record.clone();
        assert_eq!(
            record.play_turn("alice", 0),
            Err(TransitionError::ColumnFull(GridColumnFullError { column: 0 }))
        );
        assert_eq!(record, before);
        assert_eq!(record.turn_seat, Seat::One);
    }

    #[test]
    fn vertical_four_wins_and_freezes_the_game() {
        let mut record = two_player_game();
        for _ in 0..3 {
            record.play_turn("alice", 0).unwrap();
            record.play_turn("bob", 1).unwrap();
        }
        record.play_turn("alice", 0).unwrap();

        assert_eq!(record.outcome, Outcome::WonBySeat(Seat::One));
        assert_eq!(record.turn_seat, Seat::One);

        let before = record.clone();
        assert_eq!(record.play_turn("bob", 1), Err(TransitionError::GameOver));
        assert_eq!(record.play_turn("alice", 2), Err(TransitionError::GameOver));
        assert_eq!(record, before);
    }

    #[test]
    fn filling_the_board_without_a_line_is_a_draw() {
        let mut record = two_player_game();
        let columns = [
            3, 4, 4, 6, 0, 3, 5, 2, 6, 5, 0, 6, 5, 0, 3, 6, 5, 6, 1, 3, 1, 3, 6, 5, 2, 0, 5, 3,
            4, 4, 0, 1, 1, 1, 0, 1, 4, 2, 4, 2, 2, 2,
        ];
        let players = ["alice", "bob"];

        for (turn, column) in columns.into_iter().enumerate() {
            assert_eq!(record.outcome, Outcome::InProgress);
            record.play_turn(players[turn % 2], column).unwrap();
        }

        assert!(record.grid.is_full());
        assert_eq!(record.outcome, Outcome::Draw);
    }

    #[test]
    fn restart_only_after_the_end() {
        let mut record = two_player_game();
        assert_eq!(record.restart(), Err(TransitionError::NotFinished));

        for _ in 0..3 {
            record.play_turn("alice", 3).unwrap();
            record.play_turn("bob", 4).unwrap();
        }
        record.play_turn("alice", 3).unwrap();
        assert!(record.outcome.is_terminal());

        record.restart().unwrap();
        assert_eq!(record.outcome, Outcome::InProgress);
        assert_eq!(record.turn_seat, Seat::One);
        assert_eq!(record.grid, Grid::new());
        assert_eq!(record.player_count(), 2);
        assert_eq!(record.player_open_connections["bob"], 1);
    }

    #[test]
    fn entity_conversion_keeps_every_field() {
        let mut record = two_player_game();
        record.add_connection("bob").unwrap();
        record.play_turn("alice", 3).unwrap();
        record.outcome = Outcome::WonBySeat(Seat::Two);

        let entity = GameRecordEntity::from(&record);
        assert_eq!(entity.grid[5][3], DiscType::PlayerOne.code());
        assert_eq!(entity.player_positions["bob"], 2);
        assert_eq!(entity.position_with_turn, 2);
        assert_eq!(entity.winner, Some(2));

        assert_eq!(GameRecord::try_from(entity).unwrap(), record);
    }

    #[test]
    fn corrupt_entities_are_rejected() {
        let base = GameRecordEntity::from(&two_player_game());

        let mut entity = base.clone();
        entity.player_positions.insert("bob".into(), 1);
        assert!(matches!(
            GameRecord::try_from(entity),
            Err(CorruptRecordError::DuplicateSeat(1))
        ));

        let mut entity = base.clone();
        entity.player_positions.insert("bob".into(), 3);
        assert!(matches!(
            GameRecord::try_from(entity),
            Err(CorruptRecordError::InvalidSeat { seat: 3, .. })
        ));

        let mut entity = base.clone();
        entity.position_with_turn = 0;
        assert!(matches!(
            GameRecord::try_from(entity),
            Err(CorruptRecordError::InvalidTurn(0))
        ));

        let mut entity = base.clone();
        entity.winner = Some(7);
        assert!(matches!(
            GameRecord::try_from(entity),
            Err(CorruptRecordError::InvalidWinner(7))
        ));

        let mut entity = base;
        entity.grid[0][0] = 1;
        assert!(matches!(
            GameRecord::try_from(entity),
            Err(CorruptRecordError::InvalidGrid(
                InvalidGridError::FloatingDisc { column: 0 }
            ))
        ));
    }
}
