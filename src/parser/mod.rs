//! PDF fragment extraction module.

mod backend;
mod extractor;
mod options;

pub use backend::{decode_text_simple, ContentOp, LopdfBackend, PageId, PdfBackend, PdfValue};
pub use extractor::{walk_content, PdfExtractor};
pub use options::{ErrorMode, ExtractOptions, PageSelection};
