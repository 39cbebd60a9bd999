//! # pdf2json
//!
//! Reading-order text reconstruction for PDF documents, with an optional
//! LLM step that turns the reconstructed text into JSON.
//!
//! PDF content streams draw text in whatever order the producer chose.
//! This crate pulls every text fragment of a page together with its
//! baseline, groups fragments that share a baseline into lines (top of the
//! page first), and joins pages into one text with page separators.
//!
//! ## Quick Start
//!
//! ```no_run
//! fn main() -> pdf2json::Result<()> {
//!     let text = pdf2json::extract_text("statement.pdf")?;
//!     println!("{}", text);
//!     Ok(())
//! }
//! ```
//!
//! Lines can also be rebuilt from fragments obtained elsewhere:
//!
//! ```
//! use pdf2json::{group_fragments_into_lines, TextFragment};
//!
//! let fragments = vec![
//!     TextFragment::new("Total:", 500.0).unwrap(),
//!     TextFragment::new("$42.00", 500.3).unwrap(),
//!     TextFragment::new("Date:", 480.0).unwrap(),
//! ];
//! let lines = group_fragments_into_lines(fragments, 1.0);
//! assert_eq!(lines[0].text(), "Total: $42.00");
//! assert_eq!(lines[1].text(), "Date:");
//! ```
//!
//! ## Features
//!
//! - `llm` (default): blocking Groq/OpenAI-compatible chat-completion
//!   client and the PDF → JSON pipeline.

pub mod detect;
pub mod error;
pub mod layout;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod render;

#[cfg(feature = "llm")]
pub mod llm;

pub use detect::{is_pdf_bytes, sniff_file, sniff_header, PdfHeader};
pub use error::{Error, Result};
pub use layout::{
    assemble_document, group_fragments_into_lines, page_separator, LineReconstructor,
    DEFAULT_THRESHOLD,
};
pub use model::{Document, Line, Metadata, Page, TextFragment};
pub use parser::{ErrorMode, ExtractOptions, PageSelection, PdfExtractor};
pub use render::{to_json, JsonFormat};

#[cfg(feature = "llm")]
pub use llm::{GroqClient, LlmConfig};
#[cfg(feature = "llm")]
pub use pipeline::convert_pdf_to_json;
pub use pipeline::write_text_file;

use std::io::Read;
use std::path::Path;

/// Extract a PDF file into a document of reconstructed pages.
///
/// # Example
///
/// ```no_run
/// let doc = pdf2json::extract_file("statement.pdf").unwrap();
/// println!("Pages: {}", doc.page_count());
/// ```
pub fn extract_file<P: AsRef<Path>>(path: P) -> Result<Document> {
    extract_file_with_options(path, ExtractOptions::default())
}

/// Extract a PDF file with custom options.
///
/// # Example
///
/// ```no_run
/// use pdf2json::{extract_file_with_options, ExtractOptions, PageSelection};
///
/// let options = ExtractOptions::new()
///     .lenient()
///     .with_threshold(2.0)
///     .with_pages(PageSelection::Range(1..=3));
/// let doc = extract_file_with_options("statement.pdf", options).unwrap();
/// ```
pub fn extract_file_with_options<P: AsRef<Path>>(
    path: P,
    options: ExtractOptions,
) -> Result<Document> {
    PdfExtractor::open_with_options(path, options)?.extract_document()
}

/// Extract a PDF held in memory.
pub fn extract_bytes(data: &[u8]) -> Result<Document> {
    PdfExtractor::from_bytes(data)?.extract_document()
}

/// Extract a PDF from a reader.
pub fn extract_reader<R: Read>(reader: R) -> Result<Document> {
    PdfExtractor::from_reader(reader)?.extract_document()
}

/// Extract the assembled text of a PDF file.
///
/// Pages are separated by `--- Page N ---` markers.
pub fn extract_text<P: AsRef<Path>>(path: P) -> Result<String> {
    Ok(extract_file(path)?.text())
}
