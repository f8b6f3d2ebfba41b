//! Entities shared through the match state store.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rules::{Board, Mark, WinLine};

/// Opaque player identity supplied by the external auth collaborator.
///
/// Only consumed here; credential mechanics live entirely outside this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerIdentity {
    /// Stable opaque identifier.
    pub uid: String,
    /// Email associated with the account.
    pub email: String,
}

/// Normalized room identifier: trimmed, lowercased, never empty.
///
/// Two codes differing only in case or surrounding whitespace address the
/// same room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomKey(String);

/// Error returned when a raw room code normalizes to nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("room code must not be empty")]
pub struct EmptyRoomKey;

impl RoomKey {
    /// Normalize a raw room code into its canonical key form.
    pub fn parse(raw: &str) -> Result<Self, EmptyRoomKey> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(EmptyRoomKey);
        }
        Ok(Self(normalized))
    }

    /// Canonical string form of the key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical room document: the single source of truth for a networked match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomEntity {
    /// Canonical board.
    pub board: Board,
    /// Mark to move next.
    pub turn: Mark,
    /// Terminal line id, set once a triple is complete.
    pub winning_line: Option<WinLine>,
    /// Identity of the player that created the room.
    pub creator: PlayerIdentity,
}

impl RoomEntity {
    /// Document for a newly created room: empty board, X to move, no line.
    pub fn fresh(creator: PlayerIdentity) -> Self {
        Self {
            board: Board::empty(),
            turn: Mark::X,
            winning_line: None,
            creator,
        }
    }
}

/// The gameplay-writable fields of a room document.
///
/// The creator field is never part of a gameplay write; moves and resets
/// overwrite exactly this triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchFields {
    /// Board after the write.
    pub board: Board,
    /// Mark to move after the write.
    pub turn: Mark,
    /// Terminal line after the write, if any.
    pub winning_line: Option<WinLine>,
}

impl MatchFields {
    /// Field values of an in-place reset.
    pub fn fresh() -> Self {
        Self {
            board: Board::empty(),
            turn: Mark::X,
            winning_line: None,
        }
    }
}
