//! Board model for a single Connect Four game.
//!
//! The grid is a plain value: every operation works on the cells it is handed
//! and nothing here remembers previous moves. Callers that need to know
//! whether a move won the game pass the coordinates returned by
//! [`Grid::drop_disc`] straight to [`Grid::is_winning_disc`].

use thiserror::Error;

/// Number of rows on the board. Row 0 is the top, row 5 the bottom.
pub const ROWS: usize = 6;
/// Number of columns on the board.
pub const COLUMNS: usize = 7;
/// Length of a winning line.
const RUN_LENGTH: usize = 4;

/// Horizontal, vertical, diagonal ↘ and diagonal ↗ as (row, column) steps.
const AXES: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (-1, 1)];

/// Fixed identity of a player inside one game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Seat {
    /// First seat; always moves first.
    One,
    /// Second seat.
    Two,
}

impl Seat {
    /// Numeric seat (`1` or `2`) as exposed to clients and storage.
    pub fn number(self) -> u8 {
        match self {
            Seat::One => 1,
            Seat::Two => 2,
        }
    }

    /// Parse a numeric seat, rejecting anything other than `1` or `2`.
    pub fn from_number(value: u8) -> Option<Self> {
        match value {
            1 => Some(Seat::One),
            2 => Some(Seat::Two),
            _ => None,
        }
    }

    /// The seat that moves after this one.
    pub fn other(self) -> Self {
        match self {
            Seat::One => Seat::Two,
            Seat::Two => Seat::One,
        }
    }

    /// Disc dropped by the player holding this seat.
    pub fn disc(self) -> DiscType {
        match self {
            Seat::One => DiscType::PlayerOne,
            Seat::Two => DiscType::PlayerTwo,
        }
    }
}

/// Content of a single board cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DiscType {
    /// No disc.
    #[default]
    Empty,
    /// Disc owned by seat 1.
    PlayerOne,
    /// Disc owned by seat 2.
    PlayerTwo,
}

impl DiscType {
    /// Whether this value can be dropped into a column.
    pub fn is_playable(self) -> bool {
        !matches!(self, DiscType::Empty)
    }

    /// Seat owning this disc, `None` for an empty cell.
    pub fn seat(self) -> Option<Seat> {
        match self {
            DiscType::Empty => None,
            DiscType::PlayerOne => Some(Seat::One),
            DiscType::PlayerTwo => Some(Seat::Two),
        }
    }

    /// Storage code for this value (`0`, `1` or `2`).
    pub fn code(self) -> u8 {
        match self {
            DiscType::Empty => 0,
            DiscType::PlayerOne => 1,
            DiscType::PlayerTwo => 2,
        }
    }

    /// Decode a storage code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(DiscType::Empty),
            1 => Some(DiscType::PlayerOne),
            2 => Some(DiscType::PlayerTwo),
            _ => None,
        }
    }
}

/// Reasons a grid coming from outside the engine is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidGridError {
    /// Wrong number of rows.
    #[error("grid height must be {expected} (got {0})", expected = ROWS)]
    WrongHeight(usize),
    /// A row with the wrong number of cells.
    #[error("grid row {row} must have width {expected} (got {width})", expected = COLUMNS)]
    WrongWidth {
        /// Offending row index.
        row: usize,
        /// Number of cells found in that row.
        width: usize,
    },
    /// A cell value outside of the disc encoding.
    #[error("disc value {value} in grid row {row} and column {column} isn't valid")]
    InvalidCell {
        /// Row index of the cell.
        row: usize,
        /// Column index of the cell.
        column: usize,
        /// Raw value found in storage.
        value: u8,
    },
    /// An empty cell sits below a disc.
    #[error("gap found in column {column}")]
    FloatingDisc {
        /// Column containing the gap.
        column: usize,
    },
    /// One player has more than one extra disc.
    #[error("player disc counts vary by more than 1 ({player_one} vs {player_two})")]
    Imbalance {
        /// Discs owned by seat 1.
        player_one: usize,
        /// Discs owned by seat 2.
        player_two: usize,
    },
}

/// The requested column has no empty cell left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("column {column} is full")]
pub struct GridColumnFullError {
    /// Column that was targeted.
    pub column: usize,
}

/// A 6 × 7 Connect Four board.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Grid {
    cells: [[DiscType; COLUMNS]; ROWS],
}

impl Grid {
    /// Empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a grid from untrusted storage codes, enforcing every board invariant.
    pub fn from_rows(rows: &[Vec<u8>]) -> Result<Self, InvalidGridError> {
        if rows.len() != ROWS {
            return Err(InvalidGridError::WrongHeight(rows.len()));
        }

        let mut cells = [[DiscType::Empty; COLUMNS]; ROWS];
        for (row, values) in rows.iter().enumerate() {
            if values.len() != COLUMNS {
                return Err(InvalidGridError::WrongWidth {
                    row,
                    width: values.len(),
                });
            }
            for (column, &value) in values.iter().enumerate() {
                cells[row][column] = DiscType::from_code(value).ok_or(
                    InvalidGridError::InvalidCell { row, column, value },
                )?;
            }
        }

        let grid = Self { cells };
        grid.validate()?;
        Ok(grid)
    }

    /// Storage codes, row by row from the top.
    pub fn to_rows(&self) -> Vec<Vec<u8>> {
        self.cells
            .iter()
            .map(|row| row.iter().map(|disc| disc.code()).collect())
            .collect()
    }

    /// Check the gravity and disc-balance invariants.
    pub fn validate(&self) -> Result<(), InvalidGridError> {
        let mut player_one = 0usize;
        let mut player_two = 0usize;

        for column in 0..COLUMNS {
            let mut seen_empty = false;
            // Walk upward from the bottom: once a cell is empty, everything above must be too.
            for row in (0..ROWS).rev() {
                match self.cells[row][column] {
                    DiscType::Empty => seen_empty = true,
                    _ if seen_empty => return Err(InvalidGridError::FloatingDisc { column }),
                    DiscType::PlayerOne => player_one += 1,
                    DiscType::PlayerTwo => player_two += 1,
                }
            }
        }

        if player_one.abs_diff(player_two) > 1 {
            return Err(InvalidGridError::Imbalance {
                player_one,
                player_two,
            });
        }

        Ok(())
    }

    /// Cell content at `(row, column)`.
    pub fn get(&self, row: usize, column: usize) -> DiscType {
        self.cells[row][column]
    }

    /// Drop `disc` into `column` and return where it landed.
    ///
    /// # Panics
    ///
    /// Panics when `column` is outside `0..COLUMNS` or `disc` is [`DiscType::Empty`];
    /// both are caller bugs rather than game outcomes.
    pub fn drop_disc(
        &mut self,
        column: usize,
        disc: DiscType,
    ) -> Result<(usize, usize), GridColumnFullError> {
        assert!(
            column < COLUMNS,
            "column index must be between 0 and {}, got {column}",
            COLUMNS - 1
        );
        assert!(disc.is_playable(), "only player discs can be dropped");

        for row in (0..ROWS).rev() {
            if self.cells[row][column] == DiscType::Empty {
                self.cells[row][column] = disc;
                return Ok((row, column));
            }
        }

        Err(GridColumnFullError { column })
    }

    /// Seat completing four in a row through the disc at `(row, column)`, if any.
    ///
    /// Only the windows of four cells that contain `(row, column)` are inspected, so
    /// the cost does not depend on how full the board is.
    pub fn is_winning_disc(&self, row: usize, column: usize) -> Option<Seat> {
        let target = self.cells[row][column];
        let seat = target.seat()?;
        let (row, column) = (row as isize, column as isize);

        for (d_row, d_column) in AXES {
            for offset in 0..RUN_LENGTH as isize {
                let start_row = row - offset * d_row;
                let start_column = column - offset * d_column;
                let complete = (0..RUN_LENGTH as isize).all(|step| {
                    self.disc_at(start_row + step * d_row, start_column + step * d_column)
                        == Some(target)
                });
                if complete {
                    return Some(seat);
                }
            }
        }

        None
    }

    /// True when no empty cell is left.
    pub fn is_full(&self) -> bool {
        self.cells
            .iter()
            .all(|row| row.iter().all(|disc| disc.is_playable()))
    }

    fn disc_at(&self, row: isize, column: isize) -> Option<DiscType> {
        let row = usize::try_from(row).ok()?;
        let column = usize::try_from(column).ok()?;
        self.cells.get(row)?.get(column).copied()
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use super::*;

    fn grid(rows: [[u8; COLUMNS]; ROWS]) -> Grid {
        let rows: Vec<Vec<u8>> = rows.iter().map(|row| row.to_vec()).collect();
        Grid::from_rows(&rows).unwrap()
    }

    #[test]
    fn new_grid_is_empty_and_valid() {
        let grid = Grid::new();
        assert!(grid.validate().is_ok());
        assert!(!grid.is_full());
        assert!(grid.to_rows().iter().flatten().all(|&code| code == 0));
    }

    #[test]
    fn drop_lands_on_lowest_empty_row() {
        let mut grid = Grid::new();
        assert_eq!(grid.drop_disc(3, DiscType::PlayerOne), Ok((5, 3)));
        assert_eq!(grid.drop_disc(3, DiscType::PlayerTwo), Ok((4, 3)));
        assert_eq!(grid.drop_disc(0, DiscType::PlayerOne), Ok((5, 0)));

        assert_eq!(grid.get(5, 3), DiscType::PlayerOne);
        assert_eq!(grid.get(4, 3), DiscType::PlayerTwo);
        assert_eq!(grid.get(3, 3), DiscType::Empty);
    }

    #[test]
    fn drop_only_touches_the_landing_cell() {
        let mut rng = rand::rng();
        let mut grid = Grid::new();
        let mut disc = DiscType::PlayerOne;

        for _ in 0..200 {
            let column = rng.random_range(0..COLUMNS);
            let before = grid.clone();
            match grid.drop_disc(column, disc) {
                Ok((row, col)) => {
                    assert_eq!(col, column);
                    for r in 0..ROWS {
                        for c in 0..COLUMNS {
                            if (r, c) == (row, col) {
                                assert_eq!(before.get(r, c), DiscType::Empty);
                                assert_eq!(grid.get(r, c), disc);
                            } else {
                                assert_eq!(before.get(r, c), grid.get(r, c));
                            }
                        }
                    }
                    if row + 1 < ROWS {
                        assert!(grid.get(row + 1, col).is_playable());
                    }
                    disc = if disc == DiscType::PlayerOne {
                        DiscType::PlayerTwo
                    } else {
                        DiscType::PlayerOne
                    };
                }
                Err(err) => {
                    assert_eq!(err.column, column);
                    assert_eq!(before, grid);
                }
            }
        }
    }

    #[test]
    fn full_column_is_rejected_without_mutation() {
        let mut grid = Grid::new();
        for i in 0..ROWS {
            let disc = if i % 2 == 0 {
                DiscType::PlayerOne
            } else {
                DiscType::PlayerTwo
            };
            grid.drop_disc(2, disc).unwrap();
        }

        let before = grid.clone();
        assert_eq!(
            grid.drop_disc(2, DiscType::PlayerOne),
            Err(GridColumnFullError { column: 2 })
        );
        assert_eq!(grid, before);
    }

    #[test]
    #[should_panic(expected = "column index")]
    fn drop_outside_board_panics() {
        let _ = Grid::new().drop_disc(COLUMNS, DiscType::PlayerOne);
    }

    #[test]
    #[should_panic(expected = "only player discs")]
    fn dropping_empty_panics() {
        let _ = Grid::new().drop_disc(0, DiscType::Empty);
    }

    #[test]
    fn grids_built_by_alternating_drops_validate() {
        let mut rng = rand::rng();
        for _ in 0..50 {
            let mut grid = Grid::new();
            let mut seat = Seat::One;
            for _ in 0..rng.random_range(0..=ROWS * COLUMNS) {
                let column = rng.random_range(0..COLUMNS);
                if grid.drop_disc(column, seat.disc()).is_ok() {
                    seat = seat.other();
                }
            }
            assert!(grid.validate().is_ok());
            assert_eq!(Grid::from_rows(&grid.to_rows()), Ok(grid));
        }
    }

    #[test]
    fn from_rows_rejects_wrong_dimensions() {
        let short = vec![vec![0; COLUMNS]; ROWS - 1];
        assert_eq!(
            Grid::from_rows(&short),
            Err(InvalidGridError::WrongHeight(ROWS - 1))
        );

        let mut narrow = vec![vec![0; COLUMNS]; ROWS];
        narrow[2] = vec![0; COLUMNS + 1];
        assert_eq!(
            Grid::from_rows(&narrow),
            Err(InvalidGridError::WrongWidth {
                row: 2,
                width: COLUMNS + 1
            })
        );
    }

    #[test]
    fn from_rows_rejects_unknown_disc_values() {
        let mut rows = vec![vec![0; COLUMNS]; ROWS];
        rows[5][4] = 3;
        assert_eq!(
            Grid::from_rows(&rows),
            Err(InvalidGridError::InvalidCell {
                row: 5,
                column: 4,
                value: 3
            })
        );
    }

    #[test]
    fn from_rows_rejects_floating_discs() {
        let mut rows = vec![vec![0; COLUMNS]; ROWS];
        rows[3][6] = 1;
        rows[5][6] = 2;
        assert_eq!(
            Grid::from_rows(&rows),
            Err(InvalidGridError::FloatingDisc { column: 6 })
        );
    }

    #[test]
    fn from_rows_rejects_disc_imbalance() {
        let mut rows = vec![vec![0; COLUMNS]; ROWS];
        rows[5][0] = 1;
        rows[5][1] = 1;
        assert_eq!(
            Grid::from_rows(&rows),
            Err(InvalidGridError::Imbalance {
                player_one: 2,
                player_two: 0
            })
        );
    }

    #[test]
    fn horizontal_win_through_last_disc() {
        let g = grid([
            [0, 0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0, 0],
            [1, 1, 1, 1, 2, 2, 2],
        ]);
        assert_eq!(g.is_winning_disc(5, 3), Some(Seat::One));
        assert_eq!(g.is_winning_disc(5, 0), Some(Seat::One));
        assert_eq!(g.is_winning_disc(5, 4), None);
    }

    #[test]
    fn three_in_a_row_is_not_a_win() {
        let g = grid([
            [0, 0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0, 0],
            [1, 1, 1, 0, 2, 2, 0],
        ]);
        assert_eq!(g.is_winning_disc(5, 0), None);
        assert_eq!(g.is_winning_disc(5, 2), None);
    }

    #[test]
    fn win_completed_in_the_middle_of_a_line() {
        // The new disc closes a gap; the winning window starts one column to its left.
        let mut g = grid([
            [0, 0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0, 0],
            [0, 2, 0, 2, 2, 0, 0],
            [1, 1, 2, 1, 1, 2, 1],
        ]);
        let (row, column) = g.drop_disc(2, DiscType::PlayerTwo).unwrap();
        assert_eq!((row, column), (4, 2));
        assert_eq!(g.is_winning_disc(row, column), Some(Seat::Two));
    }

    #[test]
    fn vertical_win() {
        let g = grid([
            [0, 0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0, 2],
            [0, 0, 0, 0, 0, 1, 2],
            [0, 0, 0, 0, 0, 1, 2],
            [0, 0, 0, 0, 0, 1, 2],
        ]);
        assert_eq!(g.is_winning_disc(2, 6), Some(Seat::Two));
        assert_eq!(g.is_winning_disc(3, 5), None);
    }

    #[test]
    fn descending_diagonal_win() {
        let g = grid([
            [0, 0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0, 0],
            [1, 0, 0, 0, 0, 0, 0],
            [2, 1, 0, 0, 0, 0, 0],
            [2, 2, 1, 0, 0, 0, 0],
            [1, 2, 2, 1, 0, 0, 0],
        ]);
        assert_eq!(g.is_winning_disc(2, 0), Some(Seat::One));
        assert_eq!(g.is_winning_disc(4, 2), Some(Seat::One));
        assert_eq!(g.is_winning_disc(5, 3), Some(Seat::One));
    }

    #[test]
    fn ascending_diagonal_win() {
        let g = grid([
            [0, 0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0, 2],
            [0, 0, 0, 0, 0, 2, 1],
            [0, 0, 0, 0, 2, 1, 1],
            [0, 0, 0, 2, 1, 1, 2],
        ]);
        assert_eq!(g.is_winning_disc(5, 3), Some(Seat::Two));
        assert_eq!(g.is_winning_disc(3, 5), Some(Seat::Two));
        assert_eq!(g.is_winning_disc(5, 4), None);
    }

    #[test]
    fn empty_cell_never_wins() {
        let g = grid([
            [0, 0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0, 0],
            [1, 1, 1, 1, 2, 2, 2],
        ]);
        assert_eq!(g.is_winning_disc(4, 1), None);
    }

    #[test]
    fn full_board_detection() {
        let mut g = Grid::new();
        let order = [0, 1, 2, 3, 4, 5, 6];
        let mut seat = Seat::One;
        for layer in 0..ROWS {
            for &column in &order {
                let column = if layer % 2 == 0 {
                    column
                } else {
                    COLUMNS - 1 - column
                };
                g.drop_disc(column, seat.disc()).unwrap();
                seat = seat.other();
            }
        }
        assert!(g.is_full());
        assert!(g.validate().is_ok());
    }
}
