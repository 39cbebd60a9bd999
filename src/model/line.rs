//! Reconstructed lines.

use serde::{Deserialize, Serialize};

/// A visual line: fragment contents that share a baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    /// Position of the first fragment assigned to the line (the anchor)
    pub y: f32,
    /// Fragment contents in reading order
    pub fragments: Vec<String>,
}

impl Line {
    /// Start a line anchored at `y`.
    pub fn new(y: f32) -> Self {
        Self {
            y,
            fragments: Vec::new(),
        }
    }

    /// Build a line from already-ordered contents.
    pub fn from_fragments<I, S>(y: f32, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            y,
            fragments: fragments.into_iter().map(Into::into).collect(),
        }
    }

    /// Append a fragment's content.
    pub fn push(&mut self, content: impl Into<String>) {
        self.fragments.push(content.into());
    }

    /// Contents joined by a single space.
    pub fn text(&self) -> String {
        self.fragments.join(" ")
    }

    /// Number of fragments on the line.
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Check if the line holds no fragments.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}
