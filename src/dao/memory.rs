//! In-process store backend used by tests and same-process play.
//!
//! Each room lives inside a [`watch`] channel: the channel's current value is
//! the canonical document, and subscribing hands out the store's native
//! snapshot feed. Per-key write atomicity comes from the map's exclusive
//! entry guards.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::future::BoxFuture;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::dao::models::{MatchFields, RoomEntity, RoomKey};
use crate::dao::room_store::{CreateOutcome, MoveWrite, RoomStore, RoomWatch, StorageResult};
use crate::rules::Mark;

/// Reference [`RoomStore`] backend keeping every room in memory.
#[derive(Clone, Default)]
pub struct InMemoryRoomStore {
    rooms: Arc<DashMap<RoomKey, RoomSlot>>,
}

struct RoomSlot {
    tx: watch::Sender<RoomEntity>,
}

impl InMemoryRoomStore {
    /// Store with no rooms.
    pub fn new() -> Self {
        Self::default()
    }

    fn create_sync(&self, key: RoomKey, room: RoomEntity) -> CreateOutcome {
        let name = key.clone();
        match self.rooms.entry(key) {
            Entry::Occupied(entry) => {
                let slot = entry.get();
                if slot.tx.borrow().board.is_empty() {
                    slot.tx.send_replace(room);
                    info!(room = %name, "vacant room re-created");
                    CreateOutcome::Created
                } else {
                    debug!(room = %name, "create refused: match in progress");
                    CreateOutcome::Occupied
                }
            }
            Entry::Vacant(entry) => {
                let (tx, _rx) = watch::channel(room);
                entry.insert(RoomSlot { tx });
                info!(room = %name, "room created");
                CreateOutcome::Created
            }
        }
    }

    fn apply_move_sync(&self, key: &RoomKey, expected_turn: Mark, fields: MatchFields) -> MoveWrite {
        let Some(slot) = self.rooms.get_mut(key) else {
            return MoveWrite::RoomMissing;
        };
        let (current_turn, decided) = {
            let doc = slot.tx.borrow();
            (doc.turn, doc.winning_line.is_some())
        };
        if decided {
            debug!(room = %key, "move write refused: match already decided");
            return MoveWrite::Superseded;
        }
        if current_turn != expected_turn {
            debug!(room = %key, ?expected_turn, ?current_turn, "move write superseded");
            return MoveWrite::Superseded;
        }
        slot.tx.send_modify(|doc| {
            doc.board = fields.board;
            doc.turn = fields.turn;
            doc.winning_line = fields.winning_line;
        });
        MoveWrite::Applied
    }

    fn reset_sync(&self, key: &RoomKey) -> bool {
        let Some(slot) = self.rooms.get_mut(key) else {
            return false;
        };
        let fields = MatchFields::fresh();
        slot.tx.send_modify(|doc| {
            doc.board = fields.board;
            doc.turn = fields.turn;
            doc.winning_line = fields.winning_line;
        });
        info!(room = %key, "room reset in place");
        true
    }
}

impl RoomStore for InMemoryRoomStore {
    fn create_room(
        &self,
        key: RoomKey,
        room: RoomEntity,
    ) -> BoxFuture<'static, StorageResult<CreateOutcome>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.create_sync(key, room)) })
    }

    fn find_room(&self, key: RoomKey) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.rooms.get(&key).map(|slot| slot.tx.borrow().clone())) })
    }

    fn apply_move(
        &self,
        key: RoomKey,
        expected_turn: Mark,
        fields: MatchFields,
    ) -> BoxFuture<'static, StorageResult<MoveWrite>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.apply_move_sync(&key, expected_turn, fields)) })
    }

    fn reset_room(&self, key: RoomKey) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.reset_sync(&key)) })
    }

    fn watch_room(&self, key: RoomKey) -> BoxFuture<'static, StorageResult<Option<RoomWatch>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.rooms.get(&key).map(|slot| slot.tx.subscribe())) })
    }
}
