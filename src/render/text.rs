//! Plain text rendering.

use crate::model::Document;

/// Convert a document to its assembled text, page separators included.
pub fn to_text(doc: &Document) -> String {
    doc.text()
}
