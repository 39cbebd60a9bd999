//! Reading-order line reconstruction.
//!
//! Fragments extracted from a page arrive in content-stream order, which is
//! not necessarily reading order. [`LineReconstructor`] groups them into
//! lines by baseline, top of the page first, and [`assemble_document`] joins
//! the per-page results into one text with page separators.
//!
//! ## Grouping
//!
//! Fragments are stable-sorted by `y` descending. The first fragment of a
//! line becomes its anchor; any later fragment within `threshold` of the
//! anchor joins the line. The anchor never moves, so a long run of slightly
//! descending baselines cannot drag a line down the page. Inside a line the
//! fragments keep the order they were extracted in, which for most PDFs is
//! left to right.
//!
//! ## Assembly
//!
//! Page texts are concatenated with no extra `\n` between them: the page
//! separator `\n\n--- Page N ---\n\n` already carries the blank lines,
//! and the last page has none.

use crate::model::{Line, TextFragment};

/// Default vertical tolerance, in page units, for two fragments to share a line.
pub const DEFAULT_THRESHOLD: f32 = 1.0;

/// Groups positioned fragments into top-to-bottom lines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineReconstructor {
    threshold: f32,
}

impl LineReconstructor {
    /// Create a reconstructor with the given same-line tolerance.
    ///
    /// Negative or NaN tolerances are clamped to `0.0`, which only groups
    /// fragments with identical baselines.
    pub fn new(threshold: f32) -> Self {
        let threshold = if threshold.is_nan() || threshold < 0.0 {
            log::warn!("Invalid line threshold {}, using 0.0", threshold);
            0.0
        } else {
            threshold
        };
        Self { threshold }
    }

    /// The same-line tolerance in use.
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Group one page's fragments into lines.
    ///
    /// Every non-blank input fragment ends up in exactly one line, so the
    /// line count never exceeds the fragment count. Empty input gives an
    /// empty result.
    pub fn group<I>(&self, fragments: I) -> Vec<Line>
    where
        I: IntoIterator<Item = TextFragment>,
    {
        // Fields are public, so blank fragments can still arrive here.
        let mut indexed: Vec<(usize, TextFragment)> = fragments
            .into_iter()
            .filter_map(|f| TextFragment::new(f.content, f.y))
            .enumerate()
            .collect();

        if indexed.is_empty() {
            return vec![];
        }

        // sort_by is stable: equal baselines keep extraction order.
        indexed.sort_by(|(_, a), (_, b)| b.y.total_cmp(&a.y));

        let fragment_count = indexed.len();
        let mut anchor = indexed[0].1.y;
        let mut lines = Vec::new();
        let mut members: Vec<(usize, String)> = Vec::new();

        for (index, fragment) in indexed {
            let same_line = (fragment.y - anchor).abs() <= self.threshold;
            if !same_line {
                if !members.is_empty() {
                    lines.push(flush_line(anchor, &mut members));
                }
                anchor = fragment.y;
            }
            members.push((index, fragment.content));
        }

        if !members.is_empty() {
            lines.push(flush_line(anchor, &mut members));
        }

        log::debug!(
            "Grouped {} fragments into {} lines (threshold {})",
            fragment_count,
            lines.len(),
            self.threshold
        );

        lines
    }
}

impl Default for LineReconstructor {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

/// Close the pending line, restoring extraction order among its members.
fn flush_line(anchor: f32, members: &mut Vec<(usize, String)>) -> Line {
    members.sort_by_key(|(index, _)| *index);
    let mut line = Line::new(anchor);
    for (_, content) in members.drain(..) {
        line.push(content);
    }
    line
}

/// Group fragments into lines with the given tolerance.
///
/// Shorthand for `LineReconstructor::new(threshold).group(fragments)`.
pub fn group_fragments_into_lines<I>(fragments: I, threshold: f32) -> Vec<Line>
where
    I: IntoIterator<Item = TextFragment>,
{
    LineReconstructor::new(threshold).group(fragments)
}

/// Marker appended after page `index` (1-based) when another page follows.
pub fn page_separator(index: usize) -> String {
    format!("\n\n--- Page {} ---\n\n", index)
}

/// Assemble per-page lines into a single document text.
///
/// Lines within a page are joined by `\n`. Every page but the last is
/// followed by [`page_separator`] numbered with its position in `pages`.
/// Separators depend on position only: a page without lines still gets one.
pub fn assemble_document(pages: &[Vec<Line>]) -> String {
    assemble_pages(pages.iter().map(Vec::as_slice))
}

/// Like [`assemble_document`], over any sequence of line slices.
pub fn assemble_pages<'a, I>(pages: I) -> String
where
    I: IntoIterator<Item = &'a [Line]>,
{
    let pages: Vec<&[Line]> = pages.into_iter().collect();
    let last = pages.len().saturating_sub(1);
    let mut output = String::new();

    for (i, lines) in pages.iter().enumerate() {
        let text = lines.iter().map(Line::text).collect::<Vec<_>>().join("\n");
        output.push_str(&text);
        if i < last {
            output.push_str(&page_separator(i + 1));
        }
    }

    output
}
