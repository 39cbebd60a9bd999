//! Document-level types.

use super::Page;
use crate::layout::assemble_pages;
use serde::{Deserialize, Serialize};

/// A PDF document reduced to pages of reconstructed lines.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    /// Document metadata
    pub metadata: Metadata,

    /// Pages in output order
    pub pages: Vec<Page>,
}

impl Document {
    /// Create a new empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of pages in the document.
    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    /// Add a page to the document.
    pub fn add_page(&mut self, page: Page) {
        self.pages.push(page);
    }

    /// Check if the document has any pages.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// The assembled document text, with page separators.
    pub fn text(&self) -> String {
        assemble_pages(self.pages.iter().map(|page| page.lines.as_slice()))
    }
}

/// Document metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    /// PDF version (e.g., "1.7")
    pub pdf_version: String,

    /// Total page count in the source file
    pub page_count: u32,

    /// Document title from the Info dictionary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Document author from the Info dictionary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// Producing application
    #[serde(skip_serializing_if = "Option::is_none")]
    pub producer: Option<String>,

    /// Whether the document is encrypted
    pub encrypted: bool,
}
