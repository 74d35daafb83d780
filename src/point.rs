use serde::{Deserialize, Serialize};
use std::fmt;

pub const IMAGE_PREFIX: &str = "data:image_block:";
pub const HEADING_PREFIX: &str = "H:";
pub const DONE_PREFIX: &str = "DONE:";

/// One content line of a note.
///
/// On the wire every point is a single string; the variant is carried by a
/// prefix. [`Point::parse`] and [`Point::serialize`] are the only places
/// that know about the prefixes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Point {
    Task(String),
    CompletedTask(String),
    Heading(String),
    /// Holds the data URI of the attached image.
    Image(String),
}

impl Point {
    /// Classify a raw line. Prefixes are checked image, heading, completion;
    /// anything else is a plain task.
    pub fn parse(line: &str) -> Self {
        if let Some(uri) = line.strip_prefix(IMAGE_PREFIX) {
            Point::Image(uri.to_string())
        } else if let Some(text) = line.strip_prefix(HEADING_PREFIX) {
            Point::Heading(text.to_string())
        } else if let Some(text) = line.strip_prefix(DONE_PREFIX) {
            Point::CompletedTask(text.to_string())
        } else {
            Point::Task(line.to_string())
        }
    }

    pub fn serialize(&self) -> String {
        match self {
            Point::Task(text) => text.clone(),
            Point::CompletedTask(text) => format!("{DONE_PREFIX}{text}"),
            Point::Heading(text) => format!("{HEADING_PREFIX}{text}"),
            Point::Image(uri) => format!("{IMAGE_PREFIX}{uri}"),
        }
    }

    /// Flip a task between open and completed. Headings and images are
    /// returned unchanged.
    pub fn toggle_completion(self) -> Self {
        match self {
            Point::Task(text) => Point::CompletedTask(text),
            Point::CompletedTask(text) => Point::Task(text),
            inert @ (Point::Heading(_) | Point::Image(_)) => inert,
        }
    }

    pub fn is_actionable(&self) -> bool {
        matches!(self, Point::Task(_) | Point::CompletedTask(_))
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Point::CompletedTask(_))
    }

    /// Text shown to the user, without any prefix.
    pub fn text(&self) -> &str {
        match self {
            Point::Task(text)
            | Point::CompletedTask(text)
            | Point::Heading(text)
            | Point::Image(text) => text,
        }
    }
}

impl From<String> for Point {
    fn from(line: String) -> Self {
        Point::parse(&line)
    }
}

impl From<Point> for String {
    fn from(point: Point) -> Self {
        point.serialize()
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Point::Task(text) => write!(f, "[ ] {text}"),
            Point::CompletedTask(text) => write!(f, "[x] {text}"),
            Point::Heading(text) => write!(f, "## {text}"),
            Point::Image(uri) => write!(f, "<image {} bytes>", uri.len()),
        }
    }
}

/// Presentation order for a note's points: every point that is not a
/// completed task first, then the completed tasks. Both groups keep their
/// source order. Indices refer to the original slice so toggles can address
/// the right point.
pub fn display_order(points: &[Point]) -> Vec<(usize, &Point)> {
    let (open, done): (Vec<_>, Vec<_>) = points
        .iter()
        .enumerate()
        .partition(|(_, point)| !point.is_completed());
    open.into_iter().chain(done).collect()
}
