//! One-shot reminders.
//!
//! A reminder fires when a poll lands within [`REMINDER_WINDOW_SECS`] after
//! its time and the note id is not yet in the [`ReminderLog`]. A poll that
//! misses the window drops the reminder; delivery is at most once.

use crate::model::{Note, NoteId};
use crate::notify::{Notifier, REMINDER_NOTIFICATION_TITLE};
use crate::records::{self, RecordStore, NOTIFIED_REMINDERS_KEY};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

pub const REMINDER_POLL_INTERVAL: Duration = Duration::from_secs(60);
pub const REMINDER_WINDOW_SECS: i64 = 120;

/// Ids of notes whose reminder has already fired. Stored as a JSON array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReminderLog {
    ids: BTreeSet<NoteId>,
}

impl ReminderLog {
    pub fn contains(&self, id: NoteId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub note_id: NoteId,
    pub title: String,
}

impl Reminder {
    pub fn message(&self) -> String {
        format!("Reminder: {}", self.title)
    }
}

pub fn is_due(note: &Note, now: DateTime<Utc>) -> bool {
    note.reminder_at
        .map(|at| now >= at && (now - at).num_seconds() < REMINDER_WINDOW_SECS)
        .unwrap_or(false)
}

pub struct ReminderScheduler {
    log: ReminderLog,
    records: Arc<dyn RecordStore>,
}

impl ReminderScheduler {
    /// Load the log, starting empty when it is missing or unreadable.
    pub fn load(records: Arc<dyn RecordStore>) -> Self {
        let log = match records::load::<ReminderLog>(records.as_ref(), NOTIFIED_REMINDERS_KEY) {
            Ok(log) => log.unwrap_or_default(),
            Err(err) => {
                tracing::warn!(error = %err, "could not load reminder log, starting empty");
                ReminderLog::default()
            }
        };
        ReminderScheduler { log, records }
    }

    pub fn log(&self) -> &ReminderLog {
        &self.log
    }

    /// Fire every due reminder that has not fired before. Each fired id is
    /// logged and persisted before the next note is looked at.
    pub fn poll(
        &mut self,
        notes: &[Note],
        now: DateTime<Utc>,
        notifier: &dyn Notifier,
    ) -> Vec<Reminder> {
        let mut fired = Vec::new();
        for note in notes {
            if !is_due(note, now) || self.log.contains(note.id) {
                continue;
            }
            tracing::info!(note_id = note.id, title = %note.title, "reminder due");
            notifier.notify(REMINDER_NOTIFICATION_TITLE, &format!("msg: {}", note.title));
            self.log.ids.insert(note.id);
            self.persist();
            fired.push(Reminder {
                note_id: note.id,
                title: note.title.clone(),
            });
        }
        fired
    }

    /// Drop a deleted note from the log.
    pub fn forget(&mut self, id: NoteId) {
        if self.log.ids.remove(&id) {
            self.persist();
        }
    }

    fn persist(&self) {
        if let Err(err) = records::save(self.records.as_ref(), NOTIFIED_REMINDERS_KEY, &self.log) {
            tracing::warn!(error = %err, "could not persist reminder log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::RecordingNotifier;
    use crate::records::MemoryRecordStore;
    use chrono::Duration as ChronoDuration;
    use pretty_assertions::assert_eq;

    fn note_with_reminder(id: NoteId, at: DateTime<Utc>) -> Note {
        let mut note = Note::new(id, format!("note {id}"), vec![]);
        note.reminder_at = Some(at);
        note
    }

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_750_000_000, 0).unwrap()
    }

    #[test]
    fn window_is_half_open() {
        let t = now();
        let note = note_with_reminder(1, t);
        assert!(is_due(&note, t));
        assert!(is_due(&note, t + ChronoDuration::seconds(119)));
        assert!(!is_due(&note, t + ChronoDuration::seconds(120)));
        assert!(!is_due(&note, t - ChronoDuration::seconds(1)));
        assert!(!is_due(&note, t - ChronoDuration::milliseconds(900)));
        assert!(is_due(&note, t + ChronoDuration::milliseconds(119_900)));
        assert!(!is_due(&Note::new(2, "no reminder", vec![]), t));
    }

    #[test]
    fn fires_exactly_once() {
        let store = Arc::new(MemoryRecordStore::new());
        let notifier = RecordingNotifier::default();
        let mut scheduler = ReminderScheduler::load(store.clone());
        let notes = vec![note_with_reminder(5, now() - ChronoDuration::seconds(30))];

        let fired = scheduler.poll(&notes, now(), &notifier);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].message(), "Reminder: note 5");
        assert!(scheduler.log().contains(5));
        assert_eq!(store.raw(NOTIFIED_REMINDERS_KEY).as_deref(), Some("[5]"));

        let again = scheduler.poll(&notes, now(), &notifier);
        assert!(again.is_empty());
        assert_eq!(
            notifier.sent(),
            vec![(REMINDER_NOTIFICATION_TITLE.to_string(), "msg: note 5".to_string())]
        );
    }

    #[test]
    fn log_survives_reload() {
        let store = Arc::new(MemoryRecordStore::new());
        let notifier = RecordingNotifier::default();
        let notes = vec![note_with_reminder(9, now())];
        ReminderScheduler::load(store.clone()).poll(&notes, now(), &notifier);

        let mut reloaded = ReminderScheduler::load(store.clone());
        assert!(reloaded.poll(&notes, now(), &notifier).is_empty());
        assert_eq!(notifier.sent().len(), 1);
    }

    #[test]
    fn missed_window_is_dropped() {
        let store = Arc::new(MemoryRecordStore::new());
        let notifier = RecordingNotifier::default();
        let mut scheduler = ReminderScheduler::load(store);
        let notes = vec![note_with_reminder(3, now() - ChronoDuration::seconds(600))];
        assert!(scheduler.poll(&notes, now(), &notifier).is_empty());
        assert!(scheduler.log().is_empty());
    }

    #[test]
    fn persistence_failure_still_suppresses_repeats_in_memory() {
        let store = Arc::new(MemoryRecordStore::new());
        store.fail_writes(true);
        let notifier = RecordingNotifier::default();
        let mut scheduler = ReminderScheduler::load(store.clone());
        let notes = vec![note_with_reminder(1, now()), note_with_reminder(2, now())];

        assert_eq!(scheduler.poll(&notes, now(), &notifier).len(), 2);
        assert_eq!(store.raw(NOTIFIED_REMINDERS_KEY), None);
        assert!(scheduler.poll(&notes, now(), &notifier).is_empty());

        store.fail_writes(false);
        scheduler.forget(1);
        assert_eq!(store.raw(NOTIFIED_REMINDERS_KEY).as_deref(), Some("[2]"));
    }

    #[test]
    fn corrupt_log_starts_empty() {
        let store = Arc::new(MemoryRecordStore::new());
        store.save_raw(NOTIFIED_REMINDERS_KEY, "oops").unwrap();
        let scheduler = ReminderScheduler::load(store);
        assert!(scheduler.log().is_empty());
    }
}
