//! Pin slots: at most three pinned notes per owner, each holding a distinct
//! slot in 1..=3. Slots are never renumbered; a new pin takes the lowest
//! free slot.

use crate::model::{Note, NoteId, PinState};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

pub const MAX_PINNED: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct PinSlot(u8);

impl PinSlot {
    pub fn new(order: u8) -> Option<Self> {
        (1..=MAX_PINNED).contains(&order).then_some(PinSlot(order))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn all() -> impl Iterator<Item = PinSlot> {
        (1..=MAX_PINNED).map(PinSlot)
    }
}

impl TryFrom<u8> for PinSlot {
    type Error = String;

    fn try_from(order: u8) -> Result<Self, Self::Error> {
        PinSlot::new(order).ok_or_else(|| format!("pin order {order} is outside 1..={MAX_PINNED}"))
    }
}

impl From<PinSlot> for u8 {
    fn from(slot: PinSlot) -> Self {
        slot.0
    }
}

impl fmt::Display for PinSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PinError {
    #[error("Maximum 3 notes can be pinned")]
    LimitExceeded,
    #[error("note not found: {0}")]
    NotFound(NoteId),
}

pub fn lowest_free_slot<I>(taken: I) -> Option<PinSlot>
where
    I: IntoIterator<Item = PinSlot>,
{
    let taken: Vec<PinSlot> = taken.into_iter().collect();
    PinSlot::all().find(|slot| !taken.contains(slot))
}

/// Flip the pin of `id` within one owner's notes.
///
/// Pinning with every slot taken fails with [`PinError::LimitExceeded`] and
/// leaves all notes untouched.
pub fn toggle_pin(notes: &mut [Note], id: NoteId) -> Result<PinState, PinError> {
    let idx = notes
        .iter()
        .position(|n| n.id == id)
        .ok_or(PinError::NotFound(id))?;
    if notes[idx].pin.take().is_some() {
        return Ok(PinState { slot: None });
    }
    let slot = lowest_free_slot(notes.iter().filter_map(|n| n.pin))
        .ok_or(PinError::LimitExceeded)?;
    notes[idx].pin = Some(slot);
    Ok(PinState { slot: Some(slot) })
}

/// Board order: pinned notes by slot, then unpinned notes newest id first.
pub fn board_order(a: &Note, b: &Note) -> Ordering {
    match (a.pin, b.pin) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b.id.cmp(&a.id),
    }
}

pub fn sort_board(notes: &mut [Note]) {
    notes.sort_by(board_order);
}

pub fn pinned_count(notes: &[Note]) -> usize {
    notes.iter().filter(|n| n.is_pinned()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    fn notes(n: i64) -> Vec<Note> {
        (1..=n).map(|id| Note::new(id, format!("note {id}"), vec![])).collect()
    }

    fn slots(notes: &[Note]) -> Vec<(NoteId, u8)> {
        notes
            .iter()
            .filter_map(|n| n.pin.map(|s| (n.id, s.get())))
            .collect()
    }

    fn assert_invariant(notes: &[Note]) {
        let taken: Vec<u8> = notes.iter().filter_map(|n| n.pin.map(PinSlot::get)).collect();
        let unique: HashSet<u8> = taken.iter().copied().collect();
        assert_eq!(taken.len(), unique.len());
        assert!(taken.iter().all(|s| (1..=3).contains(s)));
    }

    #[test]
    fn slot_bounds() {
        assert!(PinSlot::new(0).is_none());
        assert!(PinSlot::new(4).is_none());
        assert_eq!(PinSlot::all().map(PinSlot::get).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn pins_take_successive_slots() {
        let mut board = notes(3);
        for id in 1..=3 {
            toggle_pin(&mut board, id).unwrap();
        }
        assert_eq!(slots(&board), vec![(1, 1), (2, 2), (3, 3)]);
        assert_invariant(&board);
    }

    #[test]
    fn fourth_pin_is_refused_without_changes() {
        let mut board = notes(4);
        for id in 1..=3 {
            toggle_pin(&mut board, id).unwrap();
        }
        let before = slots(&board);
        assert_eq!(toggle_pin(&mut board, 4), Err(PinError::LimitExceeded));
        assert_eq!(slots(&board), before);
    }

    #[test]
    fn unpinning_leaves_a_gap_that_is_reused() {
        let mut board = notes(4);
        for id in 1..=3 {
            toggle_pin(&mut board, id).unwrap();
        }
        let state = toggle_pin(&mut board, 2).unwrap();
        assert!(!state.pinned());
        assert_eq!(slots(&board), vec![(1, 1), (3, 3)]);

        let state = toggle_pin(&mut board, 4).unwrap();
        assert_eq!(state.slot.map(PinSlot::get), Some(2));
        assert_eq!(slots(&board), vec![(1, 1), (3, 3), (4, 2)]);
        assert_invariant(&board);
    }

    #[test]
    fn unknown_note() {
        let mut board = notes(1);
        assert_eq!(toggle_pin(&mut board, 9), Err(PinError::NotFound(9)));
    }

    #[test]
    fn board_order_puts_pins_first_then_newest() {
        let mut board = notes(5);
        toggle_pin(&mut board, 2).unwrap();
        toggle_pin(&mut board, 4).unwrap();
        toggle_pin(&mut board, 2).unwrap();
        toggle_pin(&mut board, 1).unwrap();
        sort_board(&mut board);
        let ids: Vec<NoteId> = board.iter().map(|n| n.id).collect();
        // note 1 holds slot 1, note 4 slot 2
        assert_eq!(ids, vec![1, 4, 5, 3, 2]);
    }
}
