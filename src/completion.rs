use crate::point::Point;

/// Tally of a note's tasks. Headings and images do not count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompletionStatus {
    pub actionable: usize,
    pub completed: usize,
}

impl CompletionStatus {
    pub fn of(points: &[Point]) -> Self {
        points
            .iter()
            .filter(|p| p.is_actionable())
            .fold(CompletionStatus::default(), |mut acc, p| {
                acc.actionable += 1;
                if p.is_completed() {
                    acc.completed += 1;
                }
                acc
            })
    }

    pub fn all_done(&self) -> bool {
        self.actionable > 0 && self.completed == self.actionable
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The task flipped and the note is not newly complete.
    Toggled,
    /// The task flipped and this flip completed the note.
    Completed,
    /// The index addressed a heading or image; nothing changed.
    Inert,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PointError {
    #[error("no point at index {index} (note has {len})")]
    OutOfRange { index: usize, len: usize },
}

/// Toggle the task at `index` and report whether this toggle is the one that
/// completed the note.
pub fn toggle_point(points: &mut [Point], index: usize) -> Result<ToggleOutcome, PointError> {
    let len = points.len();
    let point = points
        .get_mut(index)
        .ok_or(PointError::OutOfRange { index, len })?;
    if !point.is_actionable() {
        return Ok(ToggleOutcome::Inert);
    }
    let was_done = CompletionStatus::of(points).all_done();
    let toggled = points[index].clone().toggle_completion();
    points[index] = toggled;
    let now_done = CompletionStatus::of(points).all_done();
    Ok(if now_done && !was_done {
        ToggleOutcome::Completed
    } else {
        ToggleOutcome::Toggled
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn points(lines: &[&str]) -> Vec<Point> {
        lines.iter().map(|l| Point::parse(l)).collect()
    }

    #[test]
    fn counts_only_tasks() {
        let status = CompletionStatus::of(&points(&["H:x", "a", "DONE:b", "data:image_block:u"]));
        assert_eq!(status, CompletionStatus { actionable: 2, completed: 1 });
        assert!(!status.all_done());
    }

    #[test]
    fn completing_the_last_task_completes_the_note() {
        let mut pts = points(&["DONE:a", "DONE:b", "c"]);
        assert_eq!(toggle_point(&mut pts, 0).unwrap(), ToggleOutcome::Toggled);
        assert_eq!(toggle_point(&mut pts, 0).unwrap(), ToggleOutcome::Toggled);
        assert_eq!(toggle_point(&mut pts, 2).unwrap(), ToggleOutcome::Completed);
        assert!(CompletionStatus::of(&pts).all_done());
    }

    #[test]
    fn notes_without_tasks_never_complete() {
        let mut pts = points(&["H:only heading", "data:image_block:data:image/png;base64,AA"]);
        assert_eq!(toggle_point(&mut pts, 0).unwrap(), ToggleOutcome::Inert);
        assert_eq!(toggle_point(&mut pts, 1).unwrap(), ToggleOutcome::Inert);
        assert!(!CompletionStatus::of(&pts).all_done());
        assert!(!CompletionStatus::of(&[]).all_done());
    }

    #[test]
    fn out_of_range_index() {
        let mut pts = points(&["a"]);
        assert_eq!(
            toggle_point(&mut pts, 3),
            Err(PointError::OutOfRange { index: 3, len: 1 })
        );
    }
}
