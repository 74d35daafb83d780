//! Board controller.
//!
//! Owns the in-memory note list and mirrors every mutation to the store with
//! the same three steps: apply locally, send to the store, and on failure
//! replace the local list with a fresh fetch. Nothing is merged field by
//! field.

use crate::clock::Clock;
use crate::completion::{self, CompletionStatus, PointError, ToggleOutcome};
use crate::drag::DragSession;
use crate::model::{Note, NoteDraft, NoteId, NotePatch, Owner, PinState, ValidationError};
use crate::notify::{Notice, NoticeKind, Notifier};
use crate::pin;
use crate::point::Point;
use crate::records::RecordStore;
use crate::reminder::{Reminder, ReminderScheduler};
use crate::stats::{DailyStats, StatsAggregator};
use crate::store::{NoteStore, StoreError};
use crate::timer::{FocusTimer, TimerError};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Time a completed note stays on the board before it is archived.
pub const ARCHIVE_DELAY: Duration = Duration::from_millis(500);
pub const NOTES_PER_PAGE: usize = 6;

#[derive(thiserror::Error, Debug)]
pub enum BoardError {
    #[error("sign in to access notes")]
    Unauthenticated,
    #[error("note not found: {0}")]
    NoteNotFound(NoteId),
    #[error("note {0} is being edited")]
    Editing(NoteId),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Point(#[from] PointError),
    #[error("{0}")]
    PinLimitExceeded(String),
    #[error(transparent)]
    Timer(#[from] TimerError),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for BoardError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unauthenticated => BoardError::Unauthenticated,
            StoreError::PinLimitExceeded(detail) => BoardError::PinLimitExceeded(detail),
            other => BoardError::Store(other),
        }
    }
}

/// Process-wide collaborators handed to the board at start.
#[derive(Clone)]
pub struct BoardContext {
    pub store: Arc<dyn NoteStore>,
    pub records: Arc<dyn RecordStore>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
}

pub struct Board {
    store: Arc<dyn NoteStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    owner: Option<Owner>,
    notes: Vec<Note>,
    editing: HashSet<NoteId>,
    drag: DragSession,
    timer: FocusTimer,
    stats: StatsAggregator,
    reminders: ReminderScheduler,
    notices: Vec<Notice>,
    pending_archives: HashSet<NoteId>,
    archiver: Option<mpsc::UnboundedSender<NoteId>>,
}

impl Board {
    /// Builds an empty board; the persisted reminder log and today's stats
    /// are loaded (or initialized) here.
    pub fn new(ctx: BoardContext, owner: Option<Owner>) -> Self {
        let today = ctx.clock.today();
        Board {
            stats: StatsAggregator::load(ctx.records.clone(), today),
            reminders: ReminderScheduler::load(ctx.records),
            store: ctx.store,
            notifier: ctx.notifier,
            clock: ctx.clock,
            owner,
            notes: Vec::new(),
            editing: HashSet::new(),
            drag: DragSession::default(),
            timer: FocusTimer::default(),
            notices: Vec::new(),
            pending_archives: HashSet::new(),
            archiver: None,
        }
    }

    /// Route scheduled archives to a background task instead of leaving
    /// them for the caller to collect.
    pub fn attach_archiver(&mut self, tx: mpsc::UnboundedSender<NoteId>) {
        self.archiver = Some(tx);
    }

    pub fn owner(&self) -> Option<&Owner> {
        self.owner.as_ref()
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn note(&self, id: NoteId) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == id)
    }

    pub fn page_count(&self) -> usize {
        self.notes.len().div_ceil(NOTES_PER_PAGE)
    }

    /// 1-based page of the board in its current order. Out of range pages
    /// are empty.
    pub fn page(&self, page: usize) -> &[Note] {
        let start = page.saturating_sub(1) * NOTES_PER_PAGE;
        if page == 0 || start >= self.notes.len() {
            return &[];
        }
        let end = (start + NOTES_PER_PAGE).min(self.notes.len());
        &self.notes[start..end]
    }

    fn require_owner(&self) -> Result<Owner, BoardError> {
        self.owner.clone().ok_or(BoardError::Unauthenticated)
    }

    fn require_note(&self, id: NoteId) -> Result<usize, BoardError> {
        self.notes
            .iter()
            .position(|n| n.id == id)
            .ok_or(BoardError::NoteNotFound(id))
    }

    // ── sync ──────────────────────────────────────────

    /// Replace the local list with the store's.
    pub async fn load(&mut self) -> Result<(), BoardError> {
        let owner = self.require_owner()?;
        let notes = self.store.list(&owner).await?;
        tracing::debug!(count = notes.len(), "notes loaded");
        self.notes = notes;
        let present: HashSet<NoteId> = self.notes.iter().map(|n| n.id).collect();
        self.editing.retain(|id| present.contains(id));
        Ok(())
    }

    async fn reconcile(&mut self) {
        match self.load().await {
            Ok(()) => tracing::info!("local notes reconciled with store"),
            Err(err) => tracing::warn!(error = %err, "reconcile failed, keeping local notes"),
        }
    }

    async fn fail(&mut self, message: &str, err: StoreError) -> BoardError {
        tracing::warn!(error = %err, "{message}");
        self.push_notice(NoticeKind::Error, message);
        if err.needs_reconcile() {
            self.reconcile().await;
        }
        err.into()
    }

    // ── note crud ─────────────────────────────────────

    pub async fn create_note(&mut self, draft: NoteDraft) -> Result<NoteId, BoardError> {
        let owner = self.require_owner()?;
        let draft = draft.validated()?;
        let now = self.clock.now();
        match self.store.create(&owner, &draft, now).await {
            Ok(note) => {
                let id = note.id;
                tracing::info!(note_id = id, "note created");
                // Newest unpinned note goes right after the pinned block.
                let at = pin::pinned_count(&self.notes);
                self.notes.insert(at, note);
                self.push_notice(NoticeKind::Success, "Note created successfully!");
                Ok(id)
            }
            Err(err) => Err(self.fail("Failed to create note.", err).await),
        }
    }

    pub async fn update_note(&mut self, id: NoteId, patch: NotePatch) -> Result<(), BoardError> {
        let owner = self.require_owner()?;
        let patch = patch.validated()?;
        let idx = self.require_note(id)?;
        let now = self.clock.now();
        patch.apply(&mut self.notes[idx], now);
        match self.store.update(id, &owner, &patch, now).await {
            Ok(()) => {
                self.push_notice(NoticeKind::Success, "Note updated");
                Ok(())
            }
            Err(err) => Err(self.fail("Failed to update note", err).await),
        }
    }

    /// Append one content line (task, `H:` heading or image data URI).
    pub async fn add_point(&mut self, id: NoteId, line: &str) -> Result<(), BoardError> {
        let point = Point::parse(line);
        if point.text().trim().is_empty() {
            return Err(ValidationError::EmptyPoint.into());
        }
        let idx = self.require_note(id)?;
        let mut points = self.notes[idx].points.clone();
        points.push(point);
        self.update_note(id, NotePatch::points(points)).await
    }

    pub async fn delete_note(&mut self, id: NoteId) -> Result<(), BoardError> {
        let owner = self.require_owner()?;
        let idx = self.require_note(id)?;
        self.notes.remove(idx);
        self.editing.remove(&id);
        self.pending_archives.remove(&id);
        match self.store.delete(id, &owner).await {
            Ok(()) => {
                tracing::info!(note_id = id, "note deleted");
                // The log keeps the id until the store confirms the delete.
                self.reminders.forget(id);
                self.push_notice(NoticeKind::Info, "Note deleted.");
                Ok(())
            }
            Err(err) => Err(self.fail("Failed to delete note.", err).await),
        }
    }

    // ── pins ──────────────────────────────────────────

    /// The store decides the slot; the board re-fetches afterwards so the
    /// list is back in board order.
    pub async fn toggle_pin(&mut self, id: NoteId) -> Result<PinState, BoardError> {
        let owner = self.require_owner()?;
        self.require_note(id)?;
        match self.store.toggle_pin(id, &owner, self.clock.now()).await {
            Ok(state) => {
                tracing::info!(note_id = id, pinned = state.pinned(), "pin toggled");
                self.reconcile().await;
                Ok(state)
            }
            Err(StoreError::PinLimitExceeded(detail)) => {
                self.push_notice(NoticeKind::Error, detail.clone());
                Err(BoardError::PinLimitExceeded(detail))
            }
            Err(err) => Err(self.fail("Failed to pin note", err).await),
        }
    }

    // ── edit mode and completion ──────────────────────

    pub fn begin_edit(&mut self, id: NoteId) -> Result<(), BoardError> {
        self.require_note(id)?;
        self.editing.insert(id);
        Ok(())
    }

    pub fn cancel_edit(&mut self, id: NoteId) {
        self.editing.remove(&id);
    }

    pub fn is_editing(&self, id: NoteId) -> bool {
        self.editing.contains(&id)
    }

    pub async fn save_edit(&mut self, id: NoteId, patch: NotePatch) -> Result<(), BoardError> {
        self.update_note(id, patch).await?;
        self.editing.remove(&id);
        Ok(())
    }

    /// Toggle one task. When this toggle completes the note, the completion
    /// is counted once and the note is scheduled for archiving after
    /// [`ARCHIVE_DELAY`].
    pub async fn toggle_point(
        &mut self,
        id: NoteId,
        index: usize,
    ) -> Result<ToggleOutcome, BoardError> {
        let owner = self.require_owner()?;
        let idx = self.require_note(id)?;
        if self.editing.contains(&id) {
            return Err(BoardError::Editing(id));
        }
        let mut points = self.notes[idx].points.clone();
        let outcome = completion::toggle_point(&mut points, index)?;
        if outcome == ToggleOutcome::Inert {
            return Ok(outcome);
        }

        let now = self.clock.now();
        let patch = NotePatch::points(points);
        patch.apply(&mut self.notes[idx], now);
        if outcome == ToggleOutcome::Completed {
            tracing::info!(note_id = id, "note completed");
            self.stats.record_completed_note(self.clock.today());
            self.schedule_archive(id);
        }
        match self.store.update(id, &owner, &patch, now).await {
            Ok(()) => Ok(outcome),
            Err(err) => Err(self.fail("Failed to update note", err).await),
        }
    }

    fn schedule_archive(&mut self, id: NoteId) {
        self.pending_archives.insert(id);
        if let Some(tx) = &self.archiver {
            if tx.send(id).is_err() {
                tracing::debug!(note_id = id, "archiver gone, archive left pending");
            }
        }
    }

    pub fn pending_archives(&self) -> Vec<NoteId> {
        let mut ids: Vec<NoteId> = self.pending_archives.iter().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Called once the archive delay has elapsed. The note is deleted only
    /// if it is still on the board and still complete. Returns whether it
    /// was deleted.
    pub async fn archive_due(&mut self, id: NoteId) -> Result<bool, BoardError> {
        if !self.pending_archives.remove(&id) {
            return Ok(false);
        }
        let still_done = self
            .note(id)
            .map(|n| CompletionStatus::of(&n.points).all_done())
            .unwrap_or(false);
        if !still_done {
            tracing::info!(note_id = id, "archive cancelled, note changed during the delay");
            return Ok(false);
        }
        self.delete_note(id).await?;
        Ok(true)
    }

    // ── drag reorder (local only) ─────────────────────

    pub fn drag_start(&mut self, id: NoteId) {
        self.drag.start(id);
    }

    pub fn drag_over(&mut self, id: NoteId) {
        self.drag.hover(id);
    }

    pub fn drag_cancel(&mut self) {
        self.drag.cancel();
    }

    pub fn drop_on(&mut self, target: NoteId) -> bool {
        self.drag.drop_on(&mut self.notes, target)
    }

    pub fn drag_session(&self) -> &DragSession {
        &self.drag
    }

    // ── focus timer and stats ─────────────────────────

    pub fn timer(&self) -> &FocusTimer {
        &self.timer
    }

    pub fn start_timer(&mut self) -> Result<(), BoardError> {
        self.timer.start()?;
        Ok(())
    }

    pub fn pause_timer(&mut self) -> Result<(), BoardError> {
        self.timer.pause()?;
        self.stats.record_lap(self.clock.today());
        Ok(())
    }

    pub fn resume_timer(&mut self) -> Result<(), BoardError> {
        self.timer.resume()?;
        Ok(())
    }

    pub fn stop_timer(&mut self) -> Result<(), BoardError> {
        self.timer.stop()?;
        self.stats.record_reset(self.clock.today());
        Ok(())
    }

    /// One second of wall time. Counted only while the timer runs.
    pub fn timer_tick(&mut self) -> bool {
        let counted = self.timer.tick();
        if counted {
            self.stats.add_focus_second(self.clock.today());
        }
        counted
    }

    pub fn stats(&mut self) -> DailyStats {
        self.stats.current(self.clock.today()).clone()
    }

    // ── reminders and notices ─────────────────────────

    pub fn poll_reminders(&mut self) -> Vec<Reminder> {
        let now = self.clock.now();
        let fired = self
            .reminders
            .poll(&self.notes, now, self.notifier.as_ref());
        for reminder in &fired {
            self.push_notice(NoticeKind::Info, reminder.message());
        }
        fired
    }

    pub fn push_notice(&mut self, kind: NoticeKind, message: impl Into<String>) {
        let notice = Notice::new(kind, message, self.clock.now());
        self.notices.push(notice);
    }

    /// Notices still on screen; expired ones are dropped.
    pub fn notices(&mut self) -> &[Notice] {
        let now = self.clock.now();
        self.notices.retain(|n| n.is_visible(now));
        &self.notices
    }

    /// Visible notices, handed over once.
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        let now = self.clock.now();
        let mut drained = std::mem::take(&mut self.notices);
        drained.retain(|n| n.is_visible(now));
        drained
    }
}
