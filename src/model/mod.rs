//! Document model types.
//!
//! Fragments come out of the extractor, lines out of the reconstructor,
//! and pages and documents carry them to the renderers.

mod document;
mod fragment;
mod line;
mod page;

pub use document::{Document, Metadata};
pub use fragment::TextFragment;
pub use line::Line;
pub use page::Page;
