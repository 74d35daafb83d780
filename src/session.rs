//! Background work attached to an open board.
//!
//! Reminder polling, the focus-timer tick and delayed archiving each run as a
//! task that locks the board for the whole of its step. The lock is fair, so
//! ticks and user actions are applied one at a time in arrival order.
//! Dropping or shutting down the session cancels the periodic tasks.

use crate::board::{Board, ARCHIVE_DELAY};
use crate::model::NoteId;
use crate::reminder::REMINDER_POLL_INTERVAL;
use crate::timer::TICK;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub type SharedBoard = Arc<Mutex<Board>>;

pub struct BoardSession {
    board: SharedBoard,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl BoardSession {
    /// Start the background tasks. Reminders are checked right away and then
    /// every [`REMINDER_POLL_INTERVAL`].
    pub fn spawn(mut board: Board) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        board.attach_archiver(tx);
        let board = Arc::new(Mutex::new(board));
        let cancel = CancellationToken::new();
        let tasks = vec![
            tokio::spawn(run_reminders(board.clone(), cancel.clone())),
            tokio::spawn(run_timer(board.clone(), cancel.clone())),
            tokio::spawn(run_archiver(board.clone(), rx, cancel.clone())),
        ];
        tracing::info!("board session started");
        BoardSession {
            board,
            cancel,
            tasks,
        }
    }

    pub fn board(&self) -> SharedBoard {
        self.board.clone()
    }

    pub async fn lock(&self) -> MutexGuard<'_, Board> {
        self.board.lock().await
    }

    /// Stop the periodic tasks and wait for them to finish their current
    /// step. Archives already waiting out their delay still complete.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            if let Err(err) = task.await {
                tracing::warn!(error = %err, "board session task failed");
            }
        }
        tracing::info!("board session stopped");
    }
}

impl Drop for BoardSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_reminders(board: SharedBoard, cancel: CancellationToken) {
    let mut interval = time::interval(REMINDER_POLL_INTERVAL);
    // A late poll must not fire a burst; reminders it missed are dropped.
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                let fired = board.lock().await.poll_reminders();
                if !fired.is_empty() {
                    tracing::debug!(count = fired.len(), "reminders fired");
                }
            }
        }
    }
    tracing::debug!("reminder poll stopped");
}

async fn run_timer(board: SharedBoard, cancel: CancellationToken) {
    let mut interval = time::interval_at(Instant::now() + TICK, TICK);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                board.lock().await.timer_tick();
            }
        }
    }
    tracing::debug!("timer tick stopped");
}

async fn run_archiver(
    board: SharedBoard,
    mut requests: mpsc::UnboundedReceiver<NoteId>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            request = requests.recv() => {
                let Some(id) = request else { break };
                let board = board.clone();
                tokio::spawn(async move {
                    time::sleep(ARCHIVE_DELAY).await;
                    if let Err(err) = board.lock().await.archive_due(id).await {
                        tracing::warn!(note_id = id, error = %err, "archive failed");
                    }
                });
            }
        }
    }
    tracing::debug!("archiver stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::tests::{start, Fixture};
    use crate::completion::ToggleOutcome;
    use crate::model::NoteDraft;
    use crate::timer::TimerState;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn reminders_are_checked_on_start_and_not_repeated() {
        let fx = Fixture::new();
        let mut board = fx.board();
        board
            .create_note(NoteDraft::new("Standup").with_reminder(start()))
            .await
            .unwrap();
        let session = BoardSession::spawn(board);

        time::sleep(Duration::from_millis(10)).await;
        assert_eq!(fx.notifier.sent().len(), 1);

        fx.clock.advance(chrono::Duration::seconds(60));
        time::sleep(REMINDER_POLL_INTERVAL).await;
        assert_eq!(fx.notifier.sent().len(), 1);
        session.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn running_timer_counts_each_second() {
        let fx = Fixture::new();
        let session = BoardSession::spawn(fx.board());
        session.lock().await.start_timer().unwrap();

        time::sleep(Duration::from_millis(3_500)).await;
        {
            let mut board = session.lock().await;
            board.pause_timer().unwrap();
            assert_eq!(board.timer().elapsed_seconds(), 3);
            let stats = board.stats();
            assert_eq!((stats.total_focus_seconds, stats.lap_count), (3, 1));
        }

        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(session.lock().await.timer().elapsed_seconds(), 3);
        session.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn completed_note_is_archived_after_the_delay() {
        let fx = Fixture::new();
        let mut board = fx.board();
        let id = board
            .create_note(NoteDraft::new("Errands").with_lines(["post office"]))
            .await
            .unwrap();
        let session = BoardSession::spawn(board);

        let outcome = session.lock().await.toggle_point(id, 0).await.unwrap();
        assert_eq!(outcome, ToggleOutcome::Completed);

        time::sleep(ARCHIVE_DELAY / 2).await;
        assert!(session.lock().await.note(id).is_some());

        time::sleep(ARCHIVE_DELAY).await;
        assert!(session.lock().await.note(id).is_none());
        assert!(fx.store.snapshot().is_empty());
        session.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn archive_in_flight_completes_after_shutdown() {
        let fx = Fixture::new();
        let mut board = fx.board();
        let id = board
            .create_note(NoteDraft::new("Errands").with_lines(["post office"]))
            .await
            .unwrap();
        let session = BoardSession::spawn(board);
        let shared = session.board();

        let outcome = session.lock().await.toggle_point(id, 0).await.unwrap();
        assert_eq!(outcome, ToggleOutcome::Completed);
        time::sleep(ARCHIVE_DELAY / 5).await;
        session.shutdown().await;

        time::sleep(ARCHIVE_DELAY).await;
        assert!(shared.lock().await.note(id).is_none());
        assert!(fx.store.snapshot().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_the_ticks() {
        let fx = Fixture::new();
        let session = BoardSession::spawn(fx.board());
        let board = session.board();
        session.shutdown().await;

        board.lock().await.start_timer().unwrap();
        time::sleep(Duration::from_secs(5)).await;
        let board = board.lock().await;
        assert_eq!(board.timer().state(), TimerState::Running);
        assert_eq!(board.timer().elapsed_seconds(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_session_cancels_it() {
        let fx = Fixture::new();
        let session = BoardSession::spawn(fx.board());
        let board = session.board();
        drop(session);

        board.lock().await.start_timer().unwrap();
        time::sleep(Duration::from_secs(3)).await;
        assert_eq!(board.lock().await.timer().elapsed_seconds(), 0);
    }
}
