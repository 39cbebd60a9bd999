//! Extraction options and configuration.

use std::ops::RangeInclusive;

use crate::error::{Error, Result};
use crate::layout::DEFAULT_THRESHOLD;

/// Options for extracting and reconstructing PDF text.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Vertical tolerance for two fragments to share a line
    pub threshold: f32,

    /// Error handling mode
    pub error_mode: ErrorMode,

    /// Page selection (which pages to extract)
    pub pages: PageSelection,
}

impl ExtractOptions {
    /// Create new extract options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the same-line tolerance.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set error mode.
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Enable lenient mode (pages that fail to decode become empty).
    pub fn lenient(mut self) -> Self {
        self.error_mode = ErrorMode::Lenient;
        self
    }

    /// Set page selection.
    pub fn with_pages(mut self, pages: PageSelection) -> Self {
        self.pages = pages;
        self
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            error_mode: ErrorMode::Strict,
            pages: PageSelection::All,
        }
    }
}

/// Error handling mode during extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Fail on any error
    #[default]
    Strict,
    /// Treat undecodable pages as empty and continue
    Lenient,
}

/// Which pages to extract.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PageSelection {
    /// All pages
    #[default]
    All,
    /// A range of pages (inclusive, 1-indexed)
    Range(RangeInclusive<u32>),
    /// Specific pages (1-indexed, sorted, deduplicated)
    Pages(Vec<u32>),
}

impl PageSelection {
    /// Check if a page number should be included.
    pub fn includes(&self, page: u32) -> bool {
        match self {
            PageSelection::All => true,
            PageSelection::Range(range) => range.contains(&page),
            PageSelection::Pages(pages) => pages.binary_search(&page).is_ok(),
        }
    }

    /// Parse a page selection string (e.g., "1-10", "1,3,5,7-10", "all").
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();

        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            return Ok(PageSelection::All);
        }

        if !s.contains(',') {
            if let Some((start, end)) = s.split_once('-') {
                let (start, end) = parse_bounds(start, end, s)?;
                return Ok(PageSelection::Range(start..=end));
            }
        }

        let mut pages = Vec::new();
        for part in s.split(',') {
            let part = part.trim();
            if let Some((start, end)) = part.split_once('-') {
                let (start, end) = parse_bounds(start, end, part)?;
                pages.extend(start..=end);
            } else {
                pages.push(parse_page_number(part)?);
            }
        }

        pages.sort_unstable();
        pages.dedup();
        Ok(PageSelection::Pages(pages))
    }
}

fn parse_page_number(s: &str) -> Result<u32> {
    match s.trim().parse::<u32>() {
        Ok(0) => Err(Error::InvalidPageRange(
            "page numbers start at 1".to_string(),
        )),
        Ok(n) => Ok(n),
        Err(_) => Err(Error::InvalidPageRange(format!(
            "'{}' is not a page number",
            s.trim()
        ))),
    }
}

fn parse_bounds(start: &str, end: &str, spec: &str) -> Result<(u32, u32)> {
    let start = parse_page_number(start)?;
    let end = parse_page_number(end)?;
    if start > end {
        return Err(Error::InvalidPageRange(format!(
            "'{}' ends before it starts",
            spec
        )));
    }
    Ok((start, end))
}
