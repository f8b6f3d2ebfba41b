//! Same-device match state machine.
//!
//! Owns board and turn order for local play; every mutation is synchronous
//! and never suspends. The draw auto-restart timer lives in the async
//! wrapper, not here.

use crate::rules::{self, BOARD_CELLS, Board, Mark, Win, WinLine};

/// Why a match ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// A triple was completed.
    Won(Win),
    /// Every cell is occupied with no triple complete.
    Drawn,
}

/// Lifecycle phase of a same-device match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    /// No match is running; the player is still choosing a mode.
    Idle,
    /// Moves are being accepted.
    InProgress,
    /// The match ended and ignores further moves until a reset.
    Over(MatchOutcome),
}

/// What happened to a requested move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// The mark was placed and play continues.
    Placed,
    /// The mark was placed and the match ended.
    Finished(MatchOutcome),
    /// The press was illegal (occupied cell, finished match, or no running
    /// match) and changed nothing.
    Ignored,
}

/// Same-device match: board, turn marker, and lifecycle phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalMatch {
    phase: MatchPhase,
    board: Board,
    turn: Mark,
}

impl Default for LocalMatch {
    fn default() -> Self {
        Self {
            phase: MatchPhase::Idle,
            board: Board::empty(),
            turn: Mark::X,
        }
    }
}

impl LocalMatch {
    /// Fresh machine in the mode-selection phase.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    /// Current board.
    pub fn board(&self) -> Board {
        self.board
    }

    /// Mark to move next.
    pub fn turn(&self) -> Mark {
        self.turn
    }

    /// Line that ended the match, when it ended with a winner.
    pub fn winning_line(&self) -> Option<WinLine> {
        match self.phase {
            MatchPhase::Over(MatchOutcome::Won(win)) => Some(win.line),
            _ => None,
        }
    }

    /// Begin a match from mode selection. No-op once a match exists.
    pub fn start(&mut self) {
        if self.phase == MatchPhase::Idle {
            self.begin();
        }
    }

    /// Manual reset: fresh board, X to move, from any phase.
    pub fn reset(&mut self) {
        self.begin();
    }

    /// Abandon the match and return to mode selection.
    pub fn leave(&mut self) {
        *self = Self::new();
    }

    /// Apply a press on `cell` for the mark whose turn it is.
    ///
    /// Writes the mark, re-evaluates the board, and flips the turn marker —
    /// exactly once per accepted move.
    pub fn play(&mut self, cell: usize) -> PlayOutcome {
        if self.phase != MatchPhase::InProgress
            || cell >= BOARD_CELLS
            || self.board.cell(cell).is_some()
        {
            return PlayOutcome::Ignored;
        }

        self.board = self.board.with_mark(cell, self.turn);
        self.turn = self.turn.opponent();

        if let Some(win) = rules::evaluate(&self.board) {
            self.phase = MatchPhase::Over(MatchOutcome::Won(win));
            return PlayOutcome::Finished(MatchOutcome::Won(win));
        }
        if self.board.is_full() {
            self.phase = MatchPhase::Over(MatchOutcome::Drawn);
            return PlayOutcome::Finished(MatchOutcome::Drawn);
        }
        PlayOutcome::Placed
    }

    fn begin(&mut self) {
        self.phase = MatchPhase::InProgress;
        self.board = Board::empty();
        self.turn = Mark::X;
    }
}
