//! PDF text extraction
//!
//! Pages are decoded independently with `lopdf`. A page that yields only
//! whitespace contributes neither text nor a page marker.

use crate::error::IngestError;
use improver_domain::{DocumentFormat, ExtractedDocument};
use lopdf::{Dictionary, Document, Object};
use tracing::{debug, warn};

/// Backend name recorded in [`ExtractedDocument::extraction_method`]
pub const EXTRACTION_METHOD: &str = "lopdf";

/// Separator placed before the text of each kept page
pub fn page_marker(page_number: u32) -> String {
    format!("\n--- Page {} ---\n", page_number)
}

/// Extract the text and metadata of a PDF held in memory
///
/// The returned text may be blank; [`crate::extract`] turns that into an error.
pub fn extract(bytes: &[u8]) -> Result<ExtractedDocument, IngestError> {
    let doc = Document::load_mem(bytes).map_err(|e| IngestError::failed(DocumentFormat::Pdf, e))?;

    let pages = doc.get_pages();
    let mut parts: Vec<String> = Vec::with_capacity(pages.len() * 2);

    for &page_number in pages.keys() {
        let page_text = match doc.extract_text(&[page_number]) {
            Ok(text) => text,
            Err(e) => {
                warn!(page = page_number, error = %e, "Skipping undecodable PDF page");
                continue;
            }
        };

        if page_text.trim().is_empty() {
            debug!(page = page_number, "Skipping blank PDF page");
            continue;
        }

        parts.push(page_marker(page_number));
        parts.push(page_text);
    }

    let info = info_dictionary(&doc);

    Ok(ExtractedDocument {
        text: parts.join("\n"),
        format: DocumentFormat::Pdf,
        unit_count: pages.len(),
        title: info.and_then(|dict| info_string(dict, b"Title")),
        author: info.and_then(|dict| info_string(dict, b"Author")),
        extraction_method: EXTRACTION_METHOD.to_string(),
    })
}

/// The trailer's document information dictionary, direct or referenced
fn info_dictionary(doc: &Document) -> Option<&Dictionary> {
    match doc.trailer.get(b"Info").ok()? {
        Object::Reference(id) => doc.get_object(*id).ok()?.as_dict().ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

fn info_string(dict: &Dictionary, key: &[u8]) -> Option<String> {
    let raw = dict.get(key).ok()?.as_str().ok()?;
    let value = decode_pdf_string(raw);
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Decode a PDF text string
///
/// UTF-16BE when it starts with a byte-order mark, otherwise UTF-8 with a
/// Latin-1 fallback (close enough to PDFDocEncoding for titles and names).
fn decode_pdf_string(raw: &[u8]) -> String {
    if let Some(utf16) = raw.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }

    match std::str::from_utf8(raw) {
        Ok(s) => s.to_string(),
        Err(_) => raw.iter().map(|&b| b as char).collect(),
    }
}
