//! Room lifecycle operations.
//!
//! Both entry points normalize the raw room code, talk to the store, and
//! hand back a live [`RemoteSession`] bound to the room. The creator always
//! plays X; the joiner always plays O.

use std::sync::Arc;

use tracing::info;

use crate::dao::models::{PlayerIdentity, RoomEntity, RoomKey};
use crate::dao::room_store::{CreateOutcome, RoomStore};
use crate::error::ServiceError;
use crate::rules::Mark;
use crate::state::remote::{PlayerBinding, RemoteSession};

/// Create a room under a normalized key and enter it as mark X.
///
/// Creation over a key whose match already has moves on the board is
/// refused; re-creating a still-vacant room restarts it in place.
pub async fn create_room(
    store: Arc<dyn RoomStore>,
    raw_key: &str,
    identity: PlayerIdentity,
) -> Result<RemoteSession, ServiceError> {
    let key = parse_key(raw_key)?;

    let room = RoomEntity::fresh(identity.clone());
    match store.create_room(key.clone(), room).await? {
        CreateOutcome::Created => {}
        CreateOutcome::Occupied => {
            return Err(ServiceError::InvalidState(format!(
                "room `{key}` already has a match in progress"
            )));
        }
    }

    info!(room = %key, uid = %identity.uid, "room created");
    RemoteSession::attach(
        store,
        PlayerBinding {
            key,
            mark: Mark::X,
            identity,
        },
    )
    .await
}

/// Join an existing room under a normalized key as mark O.
///
/// The room must already exist; joining reads before attaching and never
/// mutates the board or turn marker.
pub async fn join_room(
    store: Arc<dyn RoomStore>,
    raw_key: &str,
    identity: PlayerIdentity,
) -> Result<RemoteSession, ServiceError> {
    let key = parse_key(raw_key)?;

    if store.find_room(key.clone()).await?.is_none() {
        return Err(ServiceError::NotFound(format!("room `{key}` not found")));
    }

    info!(room = %key, uid = %identity.uid, "room joined");
    RemoteSession::attach(
        store,
        PlayerBinding {
            key,
            mark: Mark::O,
            identity,
        },
    )
    .await
}

fn parse_key(raw: &str) -> Result<RoomKey, ServiceError> {
    RoomKey::parse(raw).map_err(|err| ServiceError::InvalidInput(err.to_string()))
}
