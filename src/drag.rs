use crate::model::{Note, NoteId};

/// Transient drag-to-reorder state. The resulting order is local only and
/// is never sent to the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DragSession {
    dragged: Option<NoteId>,
    hovered: Option<NoteId>,
}

impl DragSession {
    pub fn start(&mut self, id: NoteId) {
        self.dragged = Some(id);
        self.hovered = None;
    }

    pub fn hover(&mut self, id: NoteId) {
        if self.dragged.is_some() {
            self.hovered = Some(id);
        }
    }

    pub fn cancel(&mut self) {
        self.dragged = None;
        self.hovered = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.dragged.is_some()
    }

    pub fn dragged(&self) -> Option<NoteId> {
        self.dragged
    }

    pub fn hovered(&self) -> Option<NoteId> {
        self.hovered
    }

    /// Finish the drag over `target`. The dragged note is taken out of the
    /// list and inserted at the target's former index. Returns whether the
    /// list changed; the session is idle afterwards either way.
    pub fn drop_on(&mut self, notes: &mut Vec<Note>, target: NoteId) -> bool {
        let dragged = self.dragged.take();
        self.hovered = None;
        let Some(dragged) = dragged else {
            return false;
        };
        if dragged == target {
            return false;
        }
        let from = notes.iter().position(|n| n.id == dragged);
        let to = notes.iter().position(|n| n.id == target);
        match (from, to) {
            (Some(from), Some(to)) => {
                let note = notes.remove(from);
                notes.insert(to, note);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const A: NoteId = 1;
    const B: NoteId = 2;
    const C: NoteId = 3;

    fn board() -> Vec<Note> {
        [A, B, C]
            .iter()
            .map(|&id| Note::new(id, format!("{id}"), vec![]))
            .collect()
    }

    fn ids(notes: &[Note]) -> Vec<NoteId> {
        notes.iter().map(|n| n.id).collect()
    }

    #[test]
    fn dragging_first_onto_last() {
        let mut notes = board();
        let mut drag = DragSession::default();
        drag.start(A);
        drag.hover(C);
        assert_eq!(drag.hovered(), Some(C));
        assert!(drag.drop_on(&mut notes, C));
        assert_eq!(ids(&notes), vec![B, C, A]);
        assert!(!drag.is_dragging());
    }

    #[test]
    fn dragging_last_onto_first() {
        let mut notes = board();
        let mut drag = DragSession::default();
        drag.start(C);
        assert!(drag.drop_on(&mut notes, A));
        assert_eq!(ids(&notes), vec![C, A, B]);
    }

    #[test]
    fn dropping_on_itself_is_a_no_op() {
        let mut notes = board();
        let mut drag = DragSession::default();
        drag.start(A);
        assert!(!drag.drop_on(&mut notes, A));
        assert_eq!(ids(&notes), vec![A, B, C]);
        assert!(!drag.is_dragging());
    }

    #[test]
    fn drop_without_drag_is_a_no_op() {
        let mut notes = board();
        let mut drag = DragSession::default();
        drag.hover(B);
        assert_eq!(drag.hovered(), None);
        assert!(!drag.drop_on(&mut notes, B));
        assert_eq!(ids(&notes), vec![A, B, C]);
    }

    #[test]
    fn cancel_clears_the_session() {
        let mut notes = board();
        let mut drag = DragSession::default();
        drag.start(B);
        drag.cancel();
        assert!(!drag.drop_on(&mut notes, C));
        assert_eq!(ids(&notes), vec![A, B, C]);
    }

    #[test]
    fn unknown_target_leaves_list_alone() {
        let mut notes = board();
        let mut drag = DragSession::default();
        drag.start(A);
        assert!(!drag.drop_on(&mut notes, 42));
        assert_eq!(ids(&notes), vec![A, B, C]);
    }
}
