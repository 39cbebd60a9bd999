//! Pull-based fragment extraction.
//!
//! [`PdfExtractor::extract_fragments`] walks a page's content stream and
//! returns every text-showing operation as a [`TextFragment`], positioned at
//! the vertical translation of the text matrix in effect when it was shown.

use std::io::Read;
use std::path::Path;

use crate::detect::{sniff_file, sniff_header};
use crate::error::{Error, Result};
use crate::layout::LineReconstructor;
use crate::model::{Document, Metadata, Page, TextFragment};

use super::backend::{ContentOp, LopdfBackend, PageId, PdfBackend, PdfValue};
use super::options::{ErrorMode, ExtractOptions};

/// Kerning adjustment (thousandths of an em) treated as a word break in `TJ`.
const TJ_SPACE_THRESHOLD: f32 = 200.0;

/// Extracts positioned fragments and reconstructed pages from a PDF.
pub struct PdfExtractor<B: PdfBackend = LopdfBackend> {
    backend: B,
    options: ExtractOptions,
}

impl PdfExtractor<LopdfBackend> {
    /// Open a PDF file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, ExtractOptions::default())
    }

    /// Open a PDF file with custom options.
    pub fn open_with_options<P: AsRef<Path>>(path: P, options: ExtractOptions) -> Result<Self> {
        let path = path.as_ref();
        let header = sniff_file(path)?;
        log::debug!("Opening {} ({})", path.display(), header);
        let backend = LopdfBackend::load_file(path)?;
        Ok(Self::with_backend(backend, options))
    }

    /// Load a PDF from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_bytes_with_options(data, ExtractOptions::default())
    }

    /// Load a PDF from bytes with custom options.
    pub fn from_bytes_with_options(data: &[u8], options: ExtractOptions) -> Result<Self> {
        sniff_header(data)?;
        let backend = LopdfBackend::load_bytes(data)?;
        Ok(Self::with_backend(backend, options))
    }

    /// Load a PDF from a reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Self::from_reader_with_options(reader, ExtractOptions::default())
    }

    /// Load a PDF from a reader with custom options.
    pub fn from_reader_with_options<R: Read>(mut reader: R, options: ExtractOptions) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes_with_options(&data, options)
    }
}

impl<B: PdfBackend> PdfExtractor<B> {
    /// Wrap an arbitrary backend.
    pub fn with_backend(backend: B, options: ExtractOptions) -> Self {
        Self { backend, options }
    }

    /// Options in use.
    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Document metadata (version, Info dictionary fields).
    pub fn metadata(&self) -> Metadata {
        self.backend.metadata()
    }

    /// Total number of pages in the document.
    pub fn page_count(&self) -> u32 {
        self.backend.pages().len() as u32
    }

    /// Page numbers to extract, in document order, after page selection.
    pub fn page_numbers(&self) -> Vec<u32> {
        self.backend
            .pages()
            .into_keys()
            .filter(|n| self.options.pages.includes(*n))
            .collect()
    }

    fn page_id(&self, page_num: u32) -> Result<PageId> {
        let pages = self.backend.pages();
        pages
            .get(&page_num)
            .copied()
            .ok_or(Error::PageOutOfRange(page_num, pages.len() as u32))
    }

    /// Extract the text fragments of one page, in content-stream order.
    pub fn extract_fragments(&self, page_num: u32) -> Result<Vec<TextFragment>> {
        let page_id = self.page_id(page_num)?;
        let content = self
            .backend
            .page_content(page_id)
            .map_err(|e| Error::TextExtract(format!("Page {}: {}", page_num, e)))?;
        let ops = self
            .backend
            .decode_content(&content)
            .map_err(|e| Error::TextExtract(format!("Page {}: {}", page_num, e)))?;

        Ok(walk_content(&ops, |font, bytes| {
            self.backend.decode_text(page_id, font, bytes)
        }))
    }

    /// Extract one page and group its fragments into lines.
    ///
    /// In lenient mode a page whose content cannot be read yields an empty
    /// page instead of an error.
    pub fn extract_page(&self, page_num: u32) -> Result<Page> {
        let page_id = self.page_id(page_num)?;
        let (width, height) = self.backend.page_size(page_id).unwrap_or((612.0, 792.0));
        let page = Page::new(page_num, width, height);

        let fragments = match self.extract_fragments(page_num) {
            Ok(fragments) => fragments,
            Err(e) if self.options.error_mode == ErrorMode::Lenient => {
                log::warn!("Failed to extract text from page {}: {}", page_num, e);
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        let lines = LineReconstructor::new(self.options.threshold).group(fragments);
        log::debug!("Page {}: {} lines", page_num, lines.len());
        Ok(page.with_lines(lines))
    }

    /// Extract every selected page into a document.
    pub fn extract_document(&self) -> Result<Document> {
        let mut document = Document::new();
        document.metadata = self.metadata();

        for page_num in self.page_numbers() {
            document.add_page(self.extract_page(page_num)?);
        }

        Ok(document)
    }
}

/// Text state tracked while walking a content stream.
#[derive(Debug, Clone)]
struct TextState {
    /// Text line matrix [a b c d e f]
    matrix: [f32; 6],
    /// Leading set by TL / TD
    leading: f32,
    /// Current font resource name
    font: Vec<u8>,
    in_text_object: bool,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            matrix: IDENTITY,
            leading: 0.0,
            font: Vec::new(),
            in_text_object: false,
        }
    }
}

const IDENTITY: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

impl TextState {
    fn translate(&mut self, tx: f32, ty: f32) {
        let [a, b, c, d, e, f] = self.matrix;
        self.matrix[4] = tx * a + ty * c + e;
        self.matrix[5] = tx * b + ty * d + f;
    }

    fn next_line(&mut self) {
        self.translate(0.0, -self.leading);
    }

    fn position(&self) -> Option<[f32; 6]> {
        self.in_text_object.then_some(self.matrix)
    }
}

/// Walk content-stream operations and collect positioned fragments.
///
/// `decode` turns a string operand into text for the given font resource
/// name. Text shown outside `BT`/`ET` has no text matrix and is placed at
/// `y = 0`.
pub fn walk_content<F>(ops: &[ContentOp], decode: F) -> Vec<TextFragment>
where
    F: Fn(&[u8], &[u8]) -> String,
{
    let mut fragments = Vec::new();
    let mut state = TextState::default();

    let mut emit = |state: &TextState, text: String| {
        if let Some(fragment) = TextFragment::from_raw(&text, state.position()) {
            fragments.push(fragment);
        }
    };

    for op in ops {
        match op.operator.as_str() {
            "BT" => {
                state.in_text_object = true;
                state.matrix = IDENTITY;
            }
            "ET" => {
                state.in_text_object = false;
            }
            "Tf" => {
                if let Some(PdfValue::Name(name)) = op.operands.first() {
                    state.font = name.clone();
                }
            }
            "TL" => {
                if let Some(leading) = op.number(0) {
                    state.leading = leading;
                }
            }
            "Tm" => {
                if op.operands.len() >= 6 {
                    let mut matrix = IDENTITY;
                    for (i, slot) in matrix.iter_mut().enumerate() {
                        *slot = op.number(i).unwrap_or(IDENTITY[i]);
                    }
                    state.matrix = matrix;
                }
            }
            "Td" => {
                if let (Some(tx), Some(ty)) = (op.number(0), op.number(1)) {
                    state.translate(tx, ty);
                }
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (op.number(0), op.number(1)) {
                    state.leading = -ty;
                    state.translate(tx, ty);
                }
            }
            "T*" => state.next_line(),
            "Tj" => {
                if let Some(PdfValue::Str(bytes)) = op.operands.first() {
                    emit(&state, decode(&state.font, bytes));
                }
            }
            "TJ" => {
                if let Some(PdfValue::Array(items)) = op.operands.first() {
                    emit(&state, join_tj_array(items, |bytes| decode(&state.font, bytes)));
                }
            }
            "'" => {
                state.next_line();
                if let Some(PdfValue::Str(bytes)) = op.operands.first() {
                    emit(&state, decode(&state.font, bytes));
                }
            }
            "\"" => {
                state.next_line();
                if let Some(PdfValue::Str(bytes)) = op.operands.get(2) {
                    emit(&state, decode(&state.font, bytes));
                }
            }
            _ => {}
        }
    }

    fragments
}

/// Concatenate the strings of a `TJ` array, turning wide negative kerning
/// into word spaces.
fn join_tj_array<F>(items: &[PdfValue], decode: F) -> String
where
    F: Fn(&[u8]) -> String,
{
    let mut combined = String::new();

    for item in items {
        match item {
            PdfValue::Str(bytes) => combined.push_str(&decode(bytes)),
            other => {
                let Some(adjustment) = other.as_number().map(|n| -n) else {
                    continue;
                };
                if adjustment > TJ_SPACE_THRESHOLD
                    && !combined.ends_with(' ')
                    && !combined.ends_with('\u{00A0}')
                {
                    if let Some(last) = combined.chars().last() {
                        if !is_spaceless_script_char(last) {
                            combined.push(' ');
                        }
                    }
                }
            }
        }
    }

    combined
}

/// Check if a character belongs to a script written without word spaces.
///
/// Chinese and Japanese don't use spaces between words; Korean does.
fn is_spaceless_script_char(c: char) -> bool {
    matches!(c as u32,
        0x4E00..=0x9FFF        // CJK Unified Ideographs
        | 0x3400..=0x4DBF      // Extension A
        | 0x20000..=0x2EBEF    // Extensions B-F
        | 0x3040..=0x309F      // Hiragana
        | 0x30A0..=0x30FF      // Katakana
        | 0x3000..=0x303F      // CJK Symbols and Punctuation
    )
}
