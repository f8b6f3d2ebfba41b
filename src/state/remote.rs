//! Client-side controller for one networked match.
//!
//! The session mirrors the room document through the store subscription and
//! turns cell presses into turn-conditional writes. The mirror is never
//! updated from a write's own completion; truth arrives only through the
//! subscription feed.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::dao::models::{MatchFields, PlayerIdentity, RoomEntity, RoomKey};
use crate::dao::room_store::{MoveWrite, RoomStore, RoomWatch};
use crate::error::ServiceError;
use crate::rules::{self, BOARD_CELLS, Board, Mark, WinLine};

/// Per-session assignment binding a player to a room.
///
/// Lives only in this session's memory; never persisted.
#[derive(Debug, Clone)]
pub struct PlayerBinding {
    /// Normalized key of the room.
    pub key: RoomKey,
    /// Mark this client plays.
    pub mark: Mark,
    /// Local identity of the player.
    pub identity: PlayerIdentity,
}

/// Read-only mirror of a room's match fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchView {
    /// Mirrored board.
    pub board: Board,
    /// Mirrored turn marker.
    pub turn: Mark,
    /// Mirrored terminal line, if any.
    pub winning_line: Option<WinLine>,
}

impl MatchView {
    /// Mark that completed the winning line, if the match is over.
    pub fn winner(&self) -> Option<Mark> {
        self.winning_line
            .and_then(|line| self.board.cell(line.cells()[0]))
    }

    /// Board full with no winner.
    pub fn is_draw(&self) -> bool {
        self.winning_line.is_none() && self.board.is_full()
    }
}

impl From<RoomEntity> for MatchView {
    fn from(room: RoomEntity) -> Self {
        Self {
            board: room.board,
            turn: room.turn,
            winning_line: room.winning_line,
        }
    }
}

/// What happened to a requested remote move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The conditional write was accepted by the store.
    Submitted,
    /// The press was illegal against the current mirror; no write was issued.
    Ignored,
    /// The store rejected the write because another move landed first.
    Superseded,
}

/// One client's live attachment to a room.
///
/// Dropping the session (or calling [`detach`](Self::detach)) aborts the
/// subscription forwarder; no snapshot is ever delivered for a room the
/// player has left.
pub struct RemoteSession {
    id: Uuid,
    store: Arc<dyn RoomStore>,
    binding: PlayerBinding,
    view_rx: watch::Receiver<MatchView>,
    forwarder: JoinHandle<()>,
}

impl std::fmt::Debug for RemoteSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteSession")
            .field("id", &self.id)
            .field("binding", &self.binding)
            .finish_non_exhaustive()
    }
}

impl RemoteSession {
    /// Attach to an existing room document and start mirroring it.
    pub(crate) async fn attach(
        store: Arc<dyn RoomStore>,
        binding: PlayerBinding,
    ) -> Result<Self, ServiceError> {
        let Some(mut room_rx) = store.watch_room(binding.key.clone()).await? else {
            return Err(ServiceError::NotFound(format!(
                "room `{}` not found",
                binding.key
            )));
        };

        let id = Uuid::new_v4();
        let initial = MatchView::from(room_rx.borrow_and_update().clone());
        let (view_tx, view_rx) = watch::channel(initial);
        let forwarder = tokio::spawn(forward_snapshots(id, room_rx, view_tx));

        info!(session = %id, room = %binding.key, mark = ?binding.mark, "attached to room");
        Ok(Self {
            id,
            store,
            binding,
            view_rx,
            forwarder,
        })
    }

    /// Session correlation id used in traces.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// This client's room assignment.
    pub fn binding(&self) -> &PlayerBinding {
        &self.binding
    }

    /// Current mirrored view.
    pub fn view(&self) -> MatchView {
        self.view_rx.borrow().clone()
    }

    /// Subscribe to mirror updates.
    pub fn subscribe(&self) -> watch::Receiver<MatchView> {
        self.view_rx.clone()
    }

    /// Mirror updates as a stream; yields the current view first.
    pub fn view_stream(&self) -> WatchStream<MatchView> {
        WatchStream::new(self.view_rx.clone())
    }

    /// Translate a cell press into a turn-conditional write.
    ///
    /// Legality is checked against the mirror: an occupied cell, a finished
    /// match, or a turn held by the opponent all ignore the press without
    /// touching the store. The mirror itself is left alone either way; an
    /// accepted move comes back through the subscription.
    pub async fn submit_move(&self, cell: usize) -> Result<SubmitOutcome, ServiceError> {
        let view = self.view();
        if cell >= BOARD_CELLS || view.board.cell(cell).is_some() || view.winning_line.is_some() {
            return Ok(SubmitOutcome::Ignored);
        }
        if view.turn != self.binding.mark {
            debug!(session = %self.id, cell, "press out of turn; ignored");
            return Ok(SubmitOutcome::Ignored);
        }

        let board = view.board.with_mark(cell, self.binding.mark);
        let fields = MatchFields {
            board,
            turn: self.binding.mark.opponent(),
            winning_line: rules::evaluate(&board).map(|win| win.line),
        };

        match self
            .store
            .apply_move(self.binding.key.clone(), self.binding.mark, fields)
            .await?
        {
            MoveWrite::Applied => Ok(SubmitOutcome::Submitted),
            MoveWrite::Superseded => {
                warn!(session = %self.id, room = %self.binding.key, "move superseded by a concurrent write");
                Ok(SubmitOutcome::Superseded)
            }
            MoveWrite::RoomMissing => Err(ServiceError::NotFound(format!(
                "room `{}` no longer exists",
                self.binding.key
            ))),
        }
    }

    /// Restore the room to a fresh board in place; key and creator are kept.
    pub async fn reset_match(&self) -> Result<(), ServiceError> {
        if self.store.reset_room(self.binding.key.clone()).await? {
            Ok(())
        } else {
            Err(ServiceError::NotFound(format!(
                "room `{}` no longer exists",
                self.binding.key
            )))
        }
    }

    /// Tear down the subscription and release the session.
    pub fn detach(self) {}
}

impl Drop for RemoteSession {
    fn drop(&mut self) {
        self.forwarder.abort();
        debug!(session = %self.id, room = %self.binding.key, "detached from room");
    }
}

/// Single-consumer loop applying last-write-wins snapshots to the mirror.
async fn forward_snapshots(
    session: Uuid,
    mut room_rx: RoomWatch,
    view_tx: watch::Sender<MatchView>,
) {
    while room_rx.changed().await.is_ok() {
        let view = MatchView::from(room_rx.borrow_and_update().clone());
        debug!(session = %session, "room snapshot applied");
        view_tx.send_replace(view);
    }
    debug!(session = %session, "room snapshot feed closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::memory::InMemoryRoomStore;
    use crate::dao::room_store::{CreateOutcome, StorageError, StorageResult};
    use futures::future::BoxFuture;
    use std::io;
    use std::time::Duration;

    fn identity(uid: &str) -> PlayerIdentity {
        PlayerIdentity {
            uid: uid.into(),
            email: format!("{uid}@example.com"),
        }
    }

    fn binding(key: &str, mark: Mark, uid: &str) -> PlayerBinding {
        PlayerBinding {
            key: RoomKey::parse(key).unwrap(),
            mark,
            identity: identity(uid),
        }
    }

    async fn seeded_store(key: &str) -> Arc<InMemoryRoomStore> {
        let store = Arc::new(InMemoryRoomStore::new());
        store
            .create_room(
                RoomKey::parse(key).unwrap(),
                RoomEntity::fresh(identity("creator")),
            )
            .await
            .unwrap();
        store
    }

    async fn wait_for_cell(
        session: &RemoteSession,
        cell: usize,
        mark: Mark,
    ) -> watch::Receiver<MatchView> {
        let mut rx = session.subscribe();
        tokio::time::timeout(
            Duration::from_secs(1),
            rx.wait_for(|view| view.board.cell(cell) == Some(mark)),
        )
        .await
        .expect("mirror did not converge")
        .unwrap();
        rx
    }

    #[tokio::test]
    async fn attaching_to_a_missing_room_fails() {
        let store = Arc::new(InMemoryRoomStore::new());
        let result = RemoteSession::attach(store, binding("ghost", Mark::O, "p2")).await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn out_of_turn_presses_issue_no_write() {
        let store = seeded_store("arena").await;
        let joiner = RemoteSession::attach(store.clone(), binding("arena", Mark::O, "p2"))
            .await
            .unwrap();

        assert_eq!(joiner.submit_move(0).await.unwrap(), SubmitOutcome::Ignored);

        let doc = store
            .find_room(RoomKey::parse("arena").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert!(doc.board.is_empty());
        assert_eq!(doc.turn, Mark::X);
    }

    #[tokio::test]
    async fn accepted_moves_converge_on_both_mirrors() {
        let store = seeded_store("arena").await;
        let creator = RemoteSession::attach(store.clone(), binding("arena", Mark::X, "p1"))
            .await
            .unwrap();
        let joiner = RemoteSession::attach(store, binding("arena", Mark::O, "p2"))
            .await
            .unwrap();

        assert_eq!(
            creator.submit_move(4).await.unwrap(),
            SubmitOutcome::Submitted
        );
        // The submitter's own mirror stays stale until the subscription
        // fires; both sides converge through the feed.
        wait_for_cell(&creator, 4, Mark::X).await;
        wait_for_cell(&joiner, 4, Mark::X).await;
        assert_eq!(creator.view().turn, Mark::O);
        assert_eq!(joiner.view().turn, Mark::O);
    }

    #[tokio::test]
    async fn the_slower_of_two_racing_writes_is_superseded() {
        let store = seeded_store("arena").await;
        // Two clients that both believe it is X's turn: the second session's
        // mirror has not yet seen the first session's accepted move.
        let fast = RemoteSession::attach(store.clone(), binding("arena", Mark::X, "p1"))
            .await
            .unwrap();
        let slow = RemoteSession::attach(store.clone(), binding("arena", Mark::X, "p1"))
            .await
            .unwrap();

        assert_eq!(fast.submit_move(0).await.unwrap(), SubmitOutcome::Submitted);
        assert_eq!(
            slow.submit_move(4).await.unwrap(),
            SubmitOutcome::Superseded
        );

        let doc = store
            .find_room(RoomKey::parse("arena").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc.board.cell(0), Some(Mark::X));
        assert_eq!(doc.board.cell(4), None);
    }

    #[tokio::test]
    async fn presses_after_a_winning_line_are_ignored() {
        let store = seeded_store("arena").await;
        let creator = RemoteSession::attach(store.clone(), binding("arena", Mark::X, "p1"))
            .await
            .unwrap();
        let joiner = RemoteSession::attach(store, binding("arena", Mark::O, "p2"))
            .await
            .unwrap();

        for (session, cell) in [
            (&creator, 0usize),
            (&joiner, 1),
            (&creator, 3),
            (&joiner, 4),
            (&creator, 6),
        ] {
            let mark = session.binding().mark;
            assert_eq!(
                session.submit_move(cell).await.unwrap(),
                SubmitOutcome::Submitted
            );
            wait_for_cell(&creator, cell, mark).await;
            wait_for_cell(&joiner, cell, mark).await;
        }

        assert_eq!(creator.view().winning_line, Some(WinLine::LeftColumn));
        assert_eq!(joiner.view().winner(), Some(Mark::X));
        assert_eq!(joiner.submit_move(8).await.unwrap(), SubmitOutcome::Ignored);
    }

    #[tokio::test]
    async fn detaching_stops_snapshot_delivery() {
        let store = seeded_store("arena").await;
        let creator = RemoteSession::attach(store.clone(), binding("arena", Mark::X, "p1"))
            .await
            .unwrap();
        let joiner = RemoteSession::attach(store, binding("arena", Mark::O, "p2"))
            .await
            .unwrap();

        let rx = joiner.subscribe();
        joiner.detach();
        tokio::task::yield_now().await;

        creator.submit_move(0).await.unwrap();
        tokio::task::yield_now().await;

        // The detached session's feed is closed rather than carrying updates
        // for a room the player has left.
        assert!(rx.has_changed().is_err());
    }

    /// Store double whose writes always fail, for the sync-failure taxonomy.
    struct FailingStore {
        inner: InMemoryRoomStore,
    }

    impl RoomStore for FailingStore {
        fn create_room(
            &self,
            key: RoomKey,
            room: RoomEntity,
        ) -> BoxFuture<'static, StorageResult<CreateOutcome>> {
            self.inner.create_room(key, room)
        }

        fn find_room(
            &self,
            key: RoomKey,
        ) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>> {
            self.inner.find_room(key)
        }

        fn apply_move(
            &self,
            _key: RoomKey,
            _expected_turn: Mark,
            _fields: MatchFields,
        ) -> BoxFuture<'static, StorageResult<MoveWrite>> {
            Box::pin(async {
                Err(StorageError::unavailable(
                    "apply move",
                    io::Error::other("connection refused"),
                ))
            })
        }

        fn reset_room(&self, _key: RoomKey) -> BoxFuture<'static, StorageResult<bool>> {
            Box::pin(async {
                Err(StorageError::unavailable(
                    "reset room",
                    io::Error::other("connection refused"),
                ))
            })
        }

        fn watch_room(
            &self,
            key: RoomKey,
        ) -> BoxFuture<'static, StorageResult<Option<RoomWatch>>> {
            self.inner.watch_room(key)
        }
    }

    #[tokio::test]
    async fn a_failed_write_surfaces_and_leaves_the_mirror_alone() {
        let inner = InMemoryRoomStore::new();
        inner
            .create_room(
                RoomKey::parse("arena").unwrap(),
                RoomEntity::fresh(identity("creator")),
            )
            .await
            .unwrap();
        let store = Arc::new(FailingStore { inner });

        let session = RemoteSession::attach(store, binding("arena", Mark::X, "p1"))
            .await
            .unwrap();
        let before = session.view();

        let err = session.submit_move(0).await.unwrap_err();
        assert!(matches!(err, ServiceError::Unavailable(_)));
        // Nothing was optimistically applied, so nothing needs rolling back.
        assert_eq!(session.view(), before);

        assert!(matches!(
            session.reset_match().await,
            Err(ServiceError::Unavailable(_))
        ));
    }
}
