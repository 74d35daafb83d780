use crate::pin::PinSlot;
use crate::point::Point;
use chrono::serde::ts_seconds_option;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type NoteId = i64;

/// Identity of the signed-in user. Every store call is scoped by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Owner(String);

impl Owner {
    /// Returns `None` for a blank identity; a blank owner is treated as
    /// "not signed in".
    pub fn new(identity: impl Into<String>) -> Option<Self> {
        let identity = identity.into();
        let trimmed = identity.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Owner(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "NoteRecord", into = "NoteRecord")]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub description: Option<String>,
    pub points: Vec<Point>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub reminder_at: Option<DateTime<Utc>>,
    pub owner: Option<Owner>,
    /// `Some` exactly when the note is pinned.
    pub pin: Option<PinSlot>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("point text must not be empty")]
    EmptyPoint,
    #[error("nothing to update")]
    EmptyPatch,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("note {0}: pinned flag and pin order disagree")]
    PinMismatch(NoteId),
    #[error("note {id}: pin order {order} is outside 1..=3")]
    PinOrderOutOfRange { id: NoteId, order: u8 },
}

/// JSON shape of a note as exchanged with the remote store.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct NoteRecord {
    id: NoteId,
    title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default)]
    points: Vec<Point>,
    #[serde(default, with = "ts_seconds_option")]
    created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "ts_seconds_option")]
    updated_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        rename = "reminder_time",
        with = "ts_seconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    reminder_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    owner_email: Option<String>,
    #[serde(default)]
    pinned: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pin_order: Option<u8>,
}

impl TryFrom<NoteRecord> for Note {
    type Error = RecordError;

    fn try_from(record: NoteRecord) -> Result<Self, Self::Error> {
        let pin = match (record.pinned, record.pin_order) {
            (true, Some(order)) => Some(PinSlot::new(order).ok_or(
                RecordError::PinOrderOutOfRange {
                    id: record.id,
                    order,
                },
            )?),
            (false, None) => None,
            _ => return Err(RecordError::PinMismatch(record.id)),
        };
        Ok(Note {
            id: record.id,
            title: record.title,
            description: record.description,
            points: record.points,
            created_at: record.created_at,
            updated_at: record.updated_at,
            reminder_at: record.reminder_at,
            owner: record.owner_email.and_then(Owner::new),
            pin,
        })
    }
}

impl From<Note> for NoteRecord {
    fn from(note: Note) -> Self {
        NoteRecord {
            id: note.id,
            title: note.title,
            description: note.description,
            points: note.points,
            created_at: note.created_at,
            updated_at: note.updated_at,
            reminder_at: note.reminder_at,
            owner_email: note.owner.map(|o| o.0),
            pinned: note.pin.is_some(),
            pin_order: note.pin.map(PinSlot::get),
        }
    }
}

impl Note {
    pub fn new(id: NoteId, title: impl Into<String>, points: Vec<Point>) -> Self {
        let now = Utc::now();
        Note {
            id,
            title: title.into(),
            description: None,
            points,
            created_at: Some(now),
            updated_at: Some(now),
            reminder_at: None,
            owner: None,
            pin: None,
        }
    }

    pub fn is_pinned(&self) -> bool {
        self.pin.is_some()
    }

    pub fn is_edited(&self) -> bool {
        matches!((self.created_at, self.updated_at), (Some(c), Some(u)) if u > c)
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = Some(now);
    }
}

/// A note as typed by the user, before the store has assigned an id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteDraft {
    pub title: String,
    pub description: Option<String>,
    pub points: Vec<Point>,
    pub reminder_at: Option<DateTime<Utc>>,
}

impl NoteDraft {
    pub fn new(title: impl Into<String>) -> Self {
        NoteDraft {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_lines<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.points
            .extend(lines.into_iter().map(|l| Point::parse(l.as_ref())));
        self
    }

    pub fn with_reminder(mut self, at: DateTime<Utc>) -> Self {
        self.reminder_at = Some(at);
        self
    }

    /// Trims the title and drops blank points. Fails when no title is left.
    pub fn validated(mut self) -> Result<Self, ValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        self.title = title.to_string();
        self.points.retain(|p| !p.text().trim().is_empty());
        self.description = self.description.filter(|d| !d.trim().is_empty());
        Ok(self)
    }
}

/// Partial edit of a note. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub points: Option<Vec<Point>>,
}

impl NotePatch {
    pub fn points(points: Vec<Point>) -> Self {
        NotePatch {
            points: Some(points),
            ..Default::default()
        }
    }

    pub fn validated(mut self) -> Result<Self, ValidationError> {
        if self.title.is_none() && self.description.is_none() && self.points.is_none() {
            return Err(ValidationError::EmptyPatch);
        }
        if let Some(title) = self.title.take() {
            let title = title.trim();
            if title.is_empty() {
                return Err(ValidationError::EmptyTitle);
            }
            self.title = Some(title.to_string());
        }
        Ok(self)
    }

    pub fn apply(&self, note: &mut Note, now: DateTime<Utc>) {
        if let Some(title) = &self.title {
            note.title = title.clone();
        }
        if let Some(description) = &self.description {
            note.description = Some(description.clone());
        }
        if let Some(points) = &self.points {
            note.points = points.clone();
        }
        note.touch(now);
    }
}

/// Authoritative pin state reported by the store after a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PinStateRecord", into = "PinStateRecord")]
pub struct PinState {
    pub slot: Option<PinSlot>,
}

impl PinState {
    pub fn pinned(&self) -> bool {
        self.slot.is_some()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct PinStateRecord {
    pinned: bool,
    #[serde(default)]
    pin_order: Option<u8>,
}

impl TryFrom<PinStateRecord> for PinState {
    type Error = String;

    fn try_from(record: PinStateRecord) -> Result<Self, Self::Error> {
        match (record.pinned, record.pin_order) {
            (true, Some(order)) => PinSlot::new(order)
                .map(|slot| PinState { slot: Some(slot) })
                .ok_or_else(|| format!("pin order {order} is outside 1..=3")),
            (false, _) => Ok(PinState { slot: None }),
            (true, None) => Err("pinned without a pin order".to_string()),
        }
    }
}

impl From<PinState> for PinStateRecord {
    fn from(state: PinState) -> Self {
        PinStateRecord {
            pinned: state.slot.is_some(),
            pin_order: state.slot.map(PinSlot::get),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decodes_remote_note_record() {
        let json = r#"{
            "id": 7,
            "title": "Groceries",
            "description": null,
            "points": ["H:Dairy", "milk", "DONE:eggs"],
            "created_at": 1700000000,
            "updated_at": 1700000100,
            "owner_email": "sam@example.com",
            "reminder_time": 1700003600,
            "pinned": true,
            "pin_order": 2
        }"#;
        let note: Note = serde_json::from_str(json).unwrap();
        assert_eq!(note.id, 7);
        assert_eq!(note.pin.map(PinSlot::get), Some(2));
        assert_eq!(note.points[0], Point::Heading("Dairy".into()));
        assert_eq!(note.reminder_at.map(|t| t.timestamp()), Some(1700003600));
        assert_eq!(note.owner.as_ref().map(Owner::as_str), Some("sam@example.com"));
        assert!(note.is_edited());
    }

    #[test]
    fn missing_pin_fields_mean_unpinned() {
        let note: Note = serde_json::from_str(r#"{"id":1,"title":"t","points":[]}"#).unwrap();
        assert!(!note.is_pinned());
        assert!(note.created_at.is_none());
    }

    #[test]
    fn rejects_records_breaking_the_pin_invariant() {
        let pinned_without_order = r#"{"id":1,"title":"t","pinned":true}"#;
        let order_without_pin = r#"{"id":2,"title":"t","pinned":false,"pin_order":1}"#;
        let out_of_range = r#"{"id":3,"title":"t","pinned":true,"pin_order":4}"#;
        assert!(serde_json::from_str::<Note>(pinned_without_order).is_err());
        assert!(serde_json::from_str::<Note>(order_without_pin).is_err());
        assert!(serde_json::from_str::<Note>(out_of_range).is_err());
    }

    #[test]
    fn encodes_pin_and_reminder_with_wire_names() {
        let mut note = Note::new(3, "Call", vec![Point::Task("dentist".into())]);
        note.pin = PinSlot::new(1);
        note.reminder_at = DateTime::from_timestamp(1_800_000_000, 0);
        let value = serde_json::to_value(&note).unwrap();
        assert_eq!(value["pinned"], true);
        assert_eq!(value["pin_order"], 1);
        assert_eq!(value["reminder_time"], 1_800_000_000);
        assert_eq!(value["points"][0], "dentist");
    }

    #[test]
    fn draft_validation_trims_and_drops_blank_points() {
        let draft = NoteDraft::new("  Trip  ")
            .with_lines(["pack", "  ", "H:", "book hotel"])
            .validated()
            .unwrap();
        assert_eq!(draft.title, "Trip");
        assert_eq!(
            draft.points,
            vec![Point::Task("pack".into()), Point::Task("book hotel".into())]
        );
        assert_eq!(
            NoteDraft::new("   ").validated(),
            Err(ValidationError::EmptyTitle)
        );
    }

    #[test]
    fn patch_validation() {
        assert_eq!(
            NotePatch::default().validated(),
            Err(ValidationError::EmptyPatch)
        );
        let blank_title = NotePatch {
            title: Some(" ".into()),
            ..Default::default()
        };
        assert_eq!(blank_title.validated(), Err(ValidationError::EmptyTitle));
    }

    #[test]
    fn patch_bumps_updated_at() {
        let mut note = Note::new(1, "a", vec![]);
        let later = note.created_at.unwrap() + chrono::Duration::seconds(5);
        NotePatch {
            title: Some("b".into()),
            ..Default::default()
        }
        .apply(&mut note, later);
        assert_eq!(note.title, "b");
        assert_eq!(note.updated_at, Some(later));
        assert!(note.is_edited());
    }

    #[test]
    fn pin_state_decoding() {
        let pinned: PinState = serde_json::from_str(r#"{"pinned":true,"pin_order":3}"#).unwrap();
        assert_eq!(pinned.slot.map(PinSlot::get), Some(3));
        let unpinned: PinState = serde_json::from_str(r#"{"pinned":false,"pin_order":null}"#).unwrap();
        assert!(!unpinned.pinned());
    }

    #[test]
    fn blank_owner_is_not_an_identity() {
        assert!(Owner::new("  ").is_none());
        assert_eq!(Owner::new(" a@b.c ").unwrap().as_str(), "a@b.c");
    }
}
