//! Pure board evaluation: win detection and the draw predicate.
//!
//! Nothing in this module suspends, fails, or touches shared state; both
//! match controllers re-run [`evaluate`] after every accepted move.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of cells on the board.
pub const BOARD_CELLS: usize = 9;

/// One of the two player symbols occupying a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mark {
    /// The creator's mark; always moves first.
    X,
    /// The joiner's mark.
    O,
}

impl Mark {
    /// The mark that moves after this one.
    pub fn opponent(self) -> Self {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }
}

/// Fixed nine-cell board in row-major order.
///
/// `Copy` semantics make every derived board a fresh value; a board handed to
/// a concurrent reader is never mutated underneath it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board([Option<Mark>; BOARD_CELLS]);

impl Board {
    /// A board with every cell empty.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Value of the cell at `index` (row-major, `index < BOARD_CELLS`).
    pub fn cell(&self, index: usize) -> Option<Mark> {
        self.0[index]
    }

    /// A copy of this board with `mark` written at `index`.
    pub fn with_mark(self, index: usize, mark: Mark) -> Self {
        let mut cells = self.0;
        cells[index] = Some(mark);
        Self(cells)
    }

    /// True when every cell is occupied.
    pub fn is_full(&self) -> bool {
        self.0.iter().all(|cell| cell.is_some())
    }

    /// True when no cell is occupied.
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|cell| cell.is_none())
    }
}

/// Identifier of one of the eight three-in-a-row triples.
///
/// Wire form is the triple's position 0–7 in evaluation order: rows top to
/// bottom, columns left to right, then the two diagonals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum WinLine {
    /// Cells 0, 1, 2.
    TopRow,
    /// Cells 3, 4, 5.
    MiddleRow,
    /// Cells 6, 7, 8.
    BottomRow,
    /// Cells 0, 3, 6.
    LeftColumn,
    /// Cells 1, 4, 7.
    MiddleColumn,
    /// Cells 2, 5, 8.
    RightColumn,
    /// Cells 0, 4, 8.
    Diagonal,
    /// Cells 2, 4, 6.
    AntiDiagonal,
}

/// Error returned when a wire value does not name one of the eight triples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("winning line index out of range: {0}")]
pub struct LineOutOfRange(pub u8);

impl WinLine {
    /// All eight triples in evaluation order.
    pub const ALL: [WinLine; 8] = [
        WinLine::TopRow,
        WinLine::MiddleRow,
        WinLine::BottomRow,
        WinLine::LeftColumn,
        WinLine::MiddleColumn,
        WinLine::RightColumn,
        WinLine::Diagonal,
        WinLine::AntiDiagonal,
    ];

    /// The three cell indices covered by this line.
    pub fn cells(self) -> [usize; 3] {
        match self {
            WinLine::TopRow => [0, 1, 2],
            WinLine::MiddleRow => [3, 4, 5],
            WinLine::BottomRow => [6, 7, 8],
            WinLine::LeftColumn => [0, 3, 6],
            WinLine::MiddleColumn => [1, 4, 7],
            WinLine::RightColumn => [2, 5, 8],
            WinLine::Diagonal => [0, 4, 8],
            WinLine::AntiDiagonal => [2, 4, 6],
        }
    }

    /// Wire index of this line.
    pub fn index(self) -> u8 {
        self as u8
    }
}

impl From<WinLine> for u8 {
    fn from(line: WinLine) -> Self {
        line.index()
    }
}

impl TryFrom<u8> for WinLine {
    type Error = LineOutOfRange;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        WinLine::ALL
            .get(usize::from(value))
            .copied()
            .ok_or(LineOutOfRange(value))
    }
}

/// A completed triple: who won and along which line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Win {
    /// Mark holding all three cells.
    pub mark: Mark,
    /// The completed line.
    pub line: WinLine,
}

/// Scan the eight triples in evaluation order and return the first completed
/// one.
///
/// The order fixes which line is reported when several triples complete on
/// the same move, so line highlighting stays deterministic.
pub fn evaluate(board: &Board) -> Option<Win> {
    for line in WinLine::ALL {
        let [a, b, c] = line.cells();
        if let Some(mark) = board.cell(a) {
            if board.cell(b) == Some(mark) && board.cell(c) == Some(mark) {
                return Some(Win { mark, line });
            }
        }
    }
    None
}

/// True when every cell is occupied and no triple is complete.
pub fn is_draw(board: &Board) -> bool {
    board.is_full() && evaluate(board).is_none()
}
