//! Positioned text fragments.

use serde::{Deserialize, Serialize};

/// A decoded run of text sitting on a vertical baseline.
///
/// The `y` coordinate is in page space, so larger values are higher on the
/// page. Content is always trimmed and never empty when built through
/// [`TextFragment::new`] or [`TextFragment::from_raw`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFragment {
    /// Trimmed text content
    pub content: String,
    /// Baseline vertical position
    pub y: f32,
}

impl TextFragment {
    /// Create a fragment, trimming its content.
    ///
    /// Returns `None` when nothing but whitespace remains.
    pub fn new(content: impl AsRef<str>, y: f32) -> Option<Self> {
        let content = content.as_ref().trim();
        if content.is_empty() {
            return None;
        }
        Some(Self {
            content: content.to_string(),
            y,
        })
    }

    /// Build a fragment from what the content-stream walker produced.
    ///
    /// The baseline is the vertical translation (`f`, index 5) of the text
    /// matrix. Text shown without a matrix lands on `y = 0`.
    pub fn from_raw(content: impl AsRef<str>, matrix: Option<[f32; 6]>) -> Option<Self> {
        let y = match matrix {
            Some(m) => m[5],
            None => {
                log::warn!("Fragment {:?} has no text matrix, using y = 0", content.as_ref());
                0.0
            }
        };
        Self::new(content, y)
    }
}
