//! PDF header sniffing.
//!
//! Readers accept a `%PDF-x.y` marker anywhere in the first kilobyte of the
//! file, so leading garbage (mail headers, BOMs) is tolerated here as well.

use crate::error::{Error, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// PDF magic bytes: %PDF-
const PDF_MAGIC: &[u8] = b"%PDF-";
/// How far into the file the header may start.
const HEADER_SEARCH_LIMIT: usize = 1024;

/// Header information found at the start of a PDF file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfHeader {
    /// Version string as written (e.g., "1.7")
    pub version: String,
    /// Byte offset of `%PDF-` in the file
    pub offset: usize,
}

impl std::fmt::Display for PdfHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PDF {}", self.version)
    }
}

/// Read the beginning of a file and look for a PDF header.
pub fn sniff_file<P: AsRef<Path>>(path: P) -> Result<PdfHeader> {
    let file = File::open(path)?;
    let mut head = Vec::with_capacity(HEADER_SEARCH_LIMIT + 8);
    file.take((HEADER_SEARCH_LIMIT + 8) as u64)
        .read_to_end(&mut head)?;
    sniff_header(&head)
}

/// Look for a PDF header in a byte slice.
///
/// Versions 1.0 through 1.7 and 2.0 are accepted.
pub fn sniff_header(data: &[u8]) -> Result<PdfHeader> {
    let window = &data[..data.len().min(HEADER_SEARCH_LIMIT + PDF_MAGIC.len())];
    let offset = window
        .windows(PDF_MAGIC.len())
        .position(|w| w == PDF_MAGIC)
        .ok_or(Error::UnknownFormat)?;

    let version_bytes = data
        .get(offset + PDF_MAGIC.len()..offset + PDF_MAGIC.len() + 3)
        .ok_or(Error::UnknownFormat)?;

    let version = match version_bytes {
        [major @ b'1', b'.', minor @ b'0'..=b'7'] | [major @ b'2', b'.', minor @ b'0'] => {
            format!("{}.{}", *major as char, *minor as char)
        }
        _ => {
            return Err(Error::UnsupportedVersion(
                String::from_utf8_lossy(version_bytes).into_owned(),
            ))
        }
    };

    Ok(PdfHeader { version, offset })
}

/// Check if bytes start like a PDF.
pub fn is_pdf_bytes(data: &[u8]) -> bool {
    sniff_header(data).is_ok()
}
