//! Abstraction over the shared match state store.

use std::error::Error;

use futures::future::BoxFuture;
use thiserror::Error;
use tokio::sync::watch;

use crate::dao::models::{MatchFields, RoomEntity, RoomKey};
use crate::rules::Mark;

/// Result alias for store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by store backends regardless of the underlying transport.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not be reached or refused the request.
    #[error("store unavailable: {message}")]
    Unavailable {
        /// What the backend was asked to do.
        message: String,
        /// Underlying backend failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(
        message: impl Into<String>,
        source: impl Error + Send + Sync + 'static,
    ) -> Self {
        StorageError::Unavailable {
            message: message.into(),
            source: Box::new(source),
        }
    }
}

/// Live subscription to one room.
///
/// Delivers whole-document snapshots; a slow subscriber may skip intermediate
/// states but always observes an internally consistent latest document.
pub type RoomWatch = watch::Receiver<RoomEntity>;

/// Result of attempting to create a room at a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// A fresh document was written; the caller is the creator.
    Created,
    /// The key already holds a match with moves on the board; nothing was
    /// written.
    Occupied,
}

/// Result of a turn-conditional move write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveWrite {
    /// The expected turn still held and the fields were written.
    Applied,
    /// Another write landed first; the document is unchanged.
    Superseded,
    /// No room exists at the key.
    RoomMissing,
}

/// Store seam for room documents.
///
/// Implementations must serialize writes per key and guarantee that every
/// subscription snapshot is a whole document, never a partial-field update.
pub trait RoomStore: Send + Sync {
    /// Write a fresh room at `key` unless a live match already occupies it.
    ///
    /// A key whose current board has no moves may be re-created in place; a
    /// key whose board has moves reports [`CreateOutcome::Occupied`].
    fn create_room(
        &self,
        key: RoomKey,
        room: RoomEntity,
    ) -> BoxFuture<'static, StorageResult<CreateOutcome>>;

    /// Point read of the current document at `key`.
    fn find_room(&self, key: RoomKey) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>>;

    /// Write the match fields at `key` only if `expected_turn` still holds
    /// and no winning line is set.
    ///
    /// The winning-line guard keeps a decided match decided: a client whose
    /// mirror has not yet seen the final snapshot cannot overwrite it, since
    /// the winning write hands the turn to exactly that client.
    fn apply_move(
        &self,
        key: RoomKey,
        expected_turn: Mark,
        fields: MatchFields,
    ) -> BoxFuture<'static, StorageResult<MoveWrite>>;

    /// Overwrite the match fields at `key` with a fresh board, keeping the
    /// key and creator. Returns false when no room exists there.
    fn reset_room(&self, key: RoomKey) -> BoxFuture<'static, StorageResult<bool>>;

    /// Subscribe to the room's snapshot feed, or `None` when the room does
    /// not exist.
    fn watch_room(&self, key: RoomKey) -> BoxFuture<'static, StorageResult<Option<RoomWatch>>>;
}
