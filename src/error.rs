//! Error taxonomy for room lifecycle and match operations.
//!
//! Illegal presses (occupied cell, out of turn) are not errors; they surface
//! as ignored outcomes from the controllers. Everything here is recoverable
//! by retrying the user action.

use thiserror::Error;

use crate::dao::room_store::StorageError;

/// Errors surfaced by service-layer and session operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The shared store could not serve the request.
    #[error("store unavailable")]
    Unavailable(#[source] StorageError),
    /// Invalid input provided by the player.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Operation cannot be performed against the current room state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Requested room was not found.
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}
