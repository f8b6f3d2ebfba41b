//! Async wrapper around the same-device match.
//!
//! Adds the two concerns the pure machine deliberately lacks: the draw
//! auto-restart timer and a change feed for the view layer. The timer is a
//! one-shot task tied to the session; a manual reset or a mode exit cancels
//! it before it fires.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::debug;

use crate::state::local::{LocalMatch, MatchOutcome, MatchPhase, PlayOutcome};

/// Delay before a drawn board restarts on its own.
pub const DRAW_RESTART_DELAY: Duration = Duration::from_secs(2);

/// Same-device play session: the match machine plus its restart timer.
///
/// Cloning is cheap; clones share the same match.
#[derive(Clone)]
pub struct LocalSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    match_state: Mutex<LocalMatch>,
    changes: watch::Sender<LocalMatch>,
    restart_timer: Mutex<Option<JoinHandle<()>>>,
    restart_delay: Duration,
}

impl Default for LocalSession {
    fn default() -> Self {
        Self::with_restart_delay(DRAW_RESTART_DELAY)
    }
}

impl LocalSession {
    /// Session with the stock draw restart delay.
    pub fn new() -> Self {
        Self::default()
    }

    /// Session with a custom draw restart delay.
    pub fn with_restart_delay(delay: Duration) -> Self {
        let initial = LocalMatch::new();
        let (changes, _rx) = watch::channel(initial.clone());
        Self {
            inner: Arc::new(SessionInner {
                match_state: Mutex::new(initial),
                changes,
                restart_timer: Mutex::new(None),
                restart_delay: delay,
            }),
        }
    }

    /// Begin a match.
    pub async fn start(&self) {
        let mut m = self.inner.match_state.lock().await;
        m.start();
        self.inner.publish(&m);
    }

    /// Apply a press; a press that draws the match schedules the restart.
    pub async fn play(&self, cell: usize) -> PlayOutcome {
        let outcome = {
            let mut m = self.inner.match_state.lock().await;
            let outcome = m.play(cell);
            self.inner.publish(&m);
            outcome
        };

        if outcome == PlayOutcome::Finished(MatchOutcome::Drawn) {
            self.schedule_restart().await;
        }
        outcome
    }

    /// Manual reset from any phase; cancels a pending auto-restart.
    pub async fn reset(&self) {
        self.cancel_restart().await;
        let mut m = self.inner.match_state.lock().await;
        m.reset();
        self.inner.publish(&m);
    }

    /// Leave the mode entirely; cancels a pending auto-restart.
    pub async fn leave(&self) {
        self.cancel_restart().await;
        let mut m = self.inner.match_state.lock().await;
        m.leave();
        self.inner.publish(&m);
    }

    /// Snapshot of the current match.
    pub async fn snapshot(&self) -> LocalMatch {
        self.inner.match_state.lock().await.clone()
    }

    /// Subscribe to match state changes.
    pub fn subscribe(&self) -> watch::Receiver<LocalMatch> {
        self.inner.changes.subscribe()
    }

    async fn schedule_restart(&self) {
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            sleep(inner.restart_delay).await;
            let mut m = inner.match_state.lock().await;
            // A manual reset can race the timer; only a still-drawn board
            // restarts.
            if m.phase() == MatchPhase::Over(MatchOutcome::Drawn) {
                debug!("drawn board auto-restarting");
                m.reset();
                inner.publish(&m);
            }
        });

        let mut slot = self.inner.restart_timer.lock().await;
        if let Some(previous) = slot.replace(handle) {
            previous.abort();
        }
    }

    async fn cancel_restart(&self) {
        let mut slot = self.inner.restart_timer.lock().await;
        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }
}

impl SessionInner {
    fn publish(&self, m: &LocalMatch) {
        self.changes.send_replace(m.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Mark;

    /// Reachable draw: X takes 0,2,5,6,7 and O takes 1,3,4,8 with no triple.
    const DRAW_SEQUENCE: [usize; 9] = [0, 1, 2, 3, 5, 4, 6, 8, 7];

    async fn drawn_session(delay: Duration) -> LocalSession {
        let session = LocalSession::with_restart_delay(delay);
        session.start().await;
        for cell in DRAW_SEQUENCE {
            session.play(cell).await;
        }
        assert_eq!(
            session.snapshot().await.phase(),
            MatchPhase::Over(MatchOutcome::Drawn)
        );
        session
    }

    #[tokio::test(start_paused = true)]
    async fn a_drawn_board_restarts_after_the_delay() {
        let session = drawn_session(DRAW_RESTART_DELAY).await;

        let mut rx = session.subscribe();
        rx.wait_for(|m| m.phase() == MatchPhase::InProgress)
            .await
            .unwrap();

        let m = session.snapshot().await;
        assert!(m.board().is_empty());
        assert_eq!(m.turn(), Mark::X);
    }

    #[tokio::test(start_paused = true)]
    async fn the_restart_waits_the_full_delay() {
        let session = drawn_session(DRAW_RESTART_DELAY).await;

        sleep(DRAW_RESTART_DELAY - Duration::from_millis(10)).await;
        assert_eq!(
            session.snapshot().await.phase(),
            MatchPhase::Over(MatchOutcome::Drawn)
        );

        sleep(Duration::from_millis(20)).await;
        assert_eq!(session.snapshot().await.phase(), MatchPhase::InProgress);
    }

    #[tokio::test(start_paused = true)]
    async fn a_manual_reset_cancels_the_pending_restart() {
        let session = drawn_session(DRAW_RESTART_DELAY).await;

        session.reset().await;
        session.play(4).await;

        // Had the timer survived the manual reset it would clobber this
        // in-progress board once the delay elapses.
        sleep(DRAW_RESTART_DELAY + Duration::from_millis(50)).await;
        let m = session.snapshot().await;
        assert_eq!(m.phase(), MatchPhase::InProgress);
        assert_eq!(m.board().cell(4), Some(Mark::X));
        assert_eq!(m.turn(), Mark::O);
    }

    #[tokio::test(start_paused = true)]
    async fn leaving_the_mode_cancels_the_pending_restart() {
        let session = drawn_session(DRAW_RESTART_DELAY).await;

        session.leave().await;
        sleep(DRAW_RESTART_DELAY + Duration::from_millis(50)).await;
        assert_eq!(session.snapshot().await.phase(), MatchPhase::Idle);
    }

    #[tokio::test]
    async fn changes_are_published_to_subscribers() {
        let session = LocalSession::new();
        let mut rx = session.subscribe();

        session.start().await;
        session.play(0).await;

        rx.wait_for(|m| m.board().cell(0) == Some(Mark::X))
            .await
            .unwrap();
    }
}
