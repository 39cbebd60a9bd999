//! PDF backend abstraction layer.
//!
//! The extractor only needs pages, content streams and text decoding. This
//! trait keeps `lopdf` types out of the content walker so it can be driven
//! by hand-built operations in tests.

use std::collections::BTreeMap;

use lopdf::{Document as LopdfDocument, Object, Stream};

use crate::error::{Error, Result};
use crate::model::Metadata;

/// Page identifier: (object number, generation number).
pub type PageId = (u32, u16);

/// A value from a PDF content stream operand.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfValue {
    Integer(i64),
    Real(f32),
    Name(Vec<u8>),
    Str(Vec<u8>),
    Array(Vec<PdfValue>),
    Other,
}

impl PdfValue {
    /// Numeric value, if the operand is a number.
    pub fn as_number(&self) -> Option<f32> {
        match self {
            PdfValue::Integer(i) => Some(*i as f32),
            PdfValue::Real(r) => Some(*r),
            _ => None,
        }
    }
}

/// A single operation from a PDF content stream.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentOp {
    pub operator: String,
    pub operands: Vec<PdfValue>,
}

impl ContentOp {
    /// Build an operation.
    pub fn new(operator: impl Into<String>, operands: Vec<PdfValue>) -> Self {
        Self {
            operator: operator.into(),
            operands,
        }
    }

    /// Numeric operand at `index`.
    pub fn number(&self, index: usize) -> Option<f32> {
        self.operands.get(index).and_then(PdfValue::as_number)
    }
}

/// Abstract interface for PDF document access.
pub trait PdfBackend {
    /// Return all pages as (page_number → PageId).
    fn pages(&self) -> BTreeMap<u32, PageId>;

    /// Return the raw (decompressed) content stream bytes for a page.
    fn page_content(&self, page: PageId) -> Result<Vec<u8>>;

    /// Parse raw content stream bytes into a sequence of operations.
    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>>;

    /// Decode a text byte sequence using the font's encoding on the given page.
    fn decode_text(&self, page: PageId, font_name: &[u8], bytes: &[u8]) -> String;

    /// Page size as (width, height), if the page declares a MediaBox.
    fn page_size(&self, _page: PageId) -> Option<(f32, f32)> {
        None
    }

    /// Document metadata.
    fn metadata(&self) -> Metadata {
        Metadata {
            page_count: self.pages().len() as u32,
            ..Metadata::default()
        }
    }
}

/// Simple text decoding fallback when no encoding is available.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    // UTF-16BE with BOM
    if let [0xFE, 0xFF, rest @ ..] = bytes {
        let utf16: Vec<u16> = rest
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    // Latin-1
    bytes.iter().map(|&b| b as char).collect()
}

/// Concrete [`PdfBackend`] backed by `lopdf::Document`.
pub struct LopdfBackend {
    doc: LopdfDocument,
}

impl LopdfBackend {
    /// Load from a file path.
    pub fn load_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let doc = LopdfDocument::load(path)?;
        Ok(Self::from_document(doc))
    }

    /// Load from an in-memory byte slice.
    pub fn load_bytes(data: &[u8]) -> Result<Self> {
        let doc = LopdfDocument::load_mem(data)?;
        Ok(Self::from_document(doc))
    }

    /// Load from a reader.
    pub fn load_reader<R: std::io::Read>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::load_bytes(&data)
    }

    fn from_document(doc: LopdfDocument) -> Self {
        if doc.is_encrypted() {
            log::warn!("Document is encrypted; extracted text may be unreadable");
        }
        Self { doc }
    }

    /// Get PDF version string.
    pub fn version(&self) -> String {
        self.doc.version.to_string()
    }

    fn info_string(&self, key: &[u8]) -> Option<String> {
        let info_ref = self.doc.trailer.get(b"Info").ok()?.as_reference().ok()?;
        let info = self.doc.get_dictionary(info_ref).ok()?;
        match info.get(key).ok()? {
            Object::String(bytes, _) => Some(decode_text_simple(bytes)),
            Object::Name(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
            _ => None,
        }
    }
}

impl PdfBackend for LopdfBackend {
    fn pages(&self) -> BTreeMap<u32, PageId> {
        self.doc.get_pages()
    }

    fn page_content(&self, page_id: PageId) -> Result<Vec<u8>> {
        let page_dict = self.doc.get_dictionary(page_id)?;
        let contents = match page_dict.get(b"Contents") {
            Ok(contents) => contents,
            // A page without Contents is blank.
            Err(_) => return Ok(Vec::new()),
        };

        match contents {
            Object::Reference(r) => match self.doc.get_object(*r)? {
                Object::Stream(s) => stream_bytes(s),
                Object::Array(arr) => self.concat_streams(arr),
                _ => Err(Error::PdfParse("Invalid content stream".to_string())),
            },
            Object::Array(arr) => self.concat_streams(arr),
            _ => Err(Error::PdfParse("Invalid content stream".to_string())),
        }
    }

    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>> {
        let content = lopdf::content::Content::decode(data)?;

        Ok(content
            .operations
            .into_iter()
            .map(|op| ContentOp {
                operator: op.operator,
                operands: op.operands.iter().map(convert_object).collect(),
            })
            .collect())
    }

    fn decode_text(&self, page: PageId, font_name: &[u8], bytes: &[u8]) -> String {
        if let Ok(fonts) = self.doc.get_page_fonts(page) {
            if let Some(font_dict) = fonts.get(font_name) {
                if let Ok(enc) = font_dict.get_font_encoding(&self.doc) {
                    if let Ok(text) = LopdfDocument::decode_text(&enc, bytes) {
                        return text;
                    }
                }
            }
        }
        decode_text_simple(bytes)
    }

    fn page_size(&self, page: PageId) -> Option<(f32, f32)> {
        let page_dict = self.doc.get_dictionary(page).ok()?;
        let media_box = match page_dict.get(b"MediaBox") {
            Ok(mb) => mb,
            // Inherited from the page tree.
            Err(_) => {
                let parent = page_dict.get(b"Parent").ok()?.as_reference().ok()?;
                self.doc.get_dictionary(parent).ok()?.get(b"MediaBox").ok()?
            }
        };
        let values: Vec<f32> = media_box
            .as_array()
            .ok()?
            .iter()
            .filter_map(|o| o.as_float().ok())
            .collect();
        match values.as_slice() {
            [x0, y0, x1, y1] => Some(((x1 - x0).abs(), (y1 - y0).abs())),
            _ => None,
        }
    }

    fn metadata(&self) -> Metadata {
        Metadata {
            pdf_version: self.version(),
            page_count: self.doc.get_pages().len() as u32,
            title: self.info_string(b"Title"),
            author: self.info_string(b"Author"),
            producer: self.info_string(b"Producer"),
            encrypted: self.doc.is_encrypted(),
        }
    }
}

impl LopdfBackend {
    fn concat_streams(&self, refs: &[Object]) -> Result<Vec<u8>> {
        let mut content = Vec::new();
        for obj in refs {
            if let Object::Reference(r) = obj {
                if let Ok(Object::Stream(s)) = self.doc.get_object(*r) {
                    match stream_bytes(s) {
                        Ok(data) => {
                            content.extend_from_slice(&data);
                            content.push(b' ');
                        }
                        Err(e) => log::warn!("Skipping undecodable content stream {:?}: {}", r, e),
                    }
                }
            }
        }
        Ok(content)
    }
}

/// Bytes of a content stream, decoded through its filters if it has any.
///
/// lopdf's `decompressed_content` fails on streams without `/Filter`, which
/// are plain uncompressed content.
fn stream_bytes(stream: &Stream) -> Result<Vec<u8>> {
    if stream.dict.get(b"Filter").is_err() {
        return Ok(stream.content.clone());
    }
    Ok(stream.decompressed_content()?)
}

/// Convert a `lopdf::Object` to [`PdfValue`].
fn convert_object(obj: &Object) -> PdfValue {
    match obj {
        Object::Integer(i) => PdfValue::Integer(*i),
        Object::Real(r) => PdfValue::Real(*r),
        Object::Name(n) => PdfValue::Name(n.clone()),
        Object::String(b, _) => PdfValue::Str(b.clone()),
        Object::Array(arr) => PdfValue::Array(arr.iter().map(convert_object).collect()),
        _ => PdfValue::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_text_simple_utf8() {
        assert_eq!(decode_text_simple(b"Hello"), "Hello");
    }

    #[test]
    fn test_decode_text_simple_latin1() {
        // 0xE9 = 'é' in Latin-1
        let bytes = vec![0x48, 0x65, 0x6C, 0x6C, 0xE9];
        assert_eq!(decode_text_simple(&bytes), "Hellé");
    }

    #[test]
    fn test_decode_text_simple_utf16be() {
        let bytes = vec![0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69];
        assert_eq!(decode_text_simple(&bytes), "Hi");
    }

    #[test]
    fn test_operand_numbers() {
        let op = ContentOp::new(
            "Td",
            vec![PdfValue::Integer(72), PdfValue::Real(-14.5), PdfValue::Other],
        );
        assert_eq!(op.number(0), Some(72.0));
        assert_eq!(op.number(1), Some(-14.5));
        assert_eq!(op.number(2), None);
        assert_eq!(op.number(3), None);
    }

    /// One page per entry; each entry lists the page's content streams.
    fn backend_with_pages(pages: Vec<Vec<Stream>>) -> LopdfBackend {
        use lopdf::dictionary;

        let mut doc = LopdfDocument::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut kids = Vec::new();
        for streams in pages {
            let refs: Vec<Object> = streams
                .into_iter()
                .map(|s| Object::Reference(doc.add_object(s)))
                .collect();
            let contents = match refs.as_slice() {
                [single] => single.clone(),
                _ => Object::Array(refs),
            };
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => contents,
            });
            kids.push(Object::Reference(page_id));
        }
        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        LopdfBackend::from_document(doc)
    }

    fn raw_stream(content: &str) -> Stream {
        Stream::new(lopdf::Dictionary::new(), content.as_bytes().to_vec())
    }

    #[test]
    fn test_uncompressed_stream_is_read_as_is() {
        let content = "BT 1 0 0 1 72 500 Tm (Total:) Tj ET";
        let backend = backend_with_pages(vec![vec![raw_stream(content)]]);
        let page = backend.pages()[&1];

        assert_eq!(backend.page_content(page).unwrap(), content.as_bytes());

        let ops = backend.decode_content(content.as_bytes()).unwrap();
        assert_eq!(ops.len(), 4);
        assert_eq!(ops[2].operator, "Tj");
    }

    #[test]
    fn test_mixed_stream_array_keeps_every_part() {
        let header = "BT 1 0 0 1 72 700 Tm (Header) Tj ET\n".repeat(50);
        let mut compressed = raw_stream(&header);
        compressed.compress().unwrap();
        assert!(compressed.dict.get(b"Filter").is_ok());

        let footer = raw_stream("BT 1 0 0 1 72 40 Tm (Footer) Tj ET");
        let backend = backend_with_pages(vec![vec![compressed, footer]]);
        let page = backend.pages()[&1];

        let content = String::from_utf8(backend.page_content(page).unwrap()).unwrap();
        assert!(content.starts_with("BT 1 0 0 1 72 700 Tm (Header) Tj ET"));
        assert_eq!(content.matches("(Header)").count(), 50);
        assert!(content.contains("(Footer)"));
    }

    #[test]
    fn test_empty_contents_array_is_blank() {
        let backend = backend_with_pages(vec![vec![]]);
        let page = backend.pages()[&1];
        assert!(backend.page_content(page).unwrap().is_empty());
    }

    #[test]
    fn test_convert_object_nested_array() {
        let obj = Object::Array(vec![
            Object::string_literal("Hi"),
            Object::Integer(-250),
            Object::Real(1.5),
        ]);
        assert_eq!(
            convert_object(&obj),
            PdfValue::Array(vec![
                PdfValue::Str(b"Hi".to_vec()),
                PdfValue::Integer(-250),
                PdfValue::Real(1.5),
            ])
        );
    }
}
