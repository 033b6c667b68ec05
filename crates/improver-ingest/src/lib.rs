//! Protocol Improver Ingest
//!
//! Turns uploaded protocol documents into plain text.
//!
//! # Architecture
//!
//! ```text
//! bytes + filename → DocumentFormat → pdf::extract | docx::extract → ExtractedDocument
//! ```
//!
//! - **PDF**: pages are decoded one by one; blank pages are skipped and every
//!   kept page is preceded by a `--- Page N ---` marker
//! - **DOCX**: body paragraphs in document order, then table cells row by row,
//!   table by table
//!
//! # Example Usage
//!
//! ```no_run
//! use improver_ingest::{extract_file, preview};
//!
//! let bytes = std::fs::read("protocol.pdf").unwrap();
//! let document = extract_file(&bytes, "protocol.pdf").unwrap();
//! println!("{}", preview(&document.text, 500));
//! ```

#![warn(missing_docs)]

mod error;
pub mod docx;
pub mod pdf;

pub use error::IngestError;

use improver_domain::{DocumentFormat, ExtractedDocument};
use std::path::Path;
use tracing::debug;

/// Marker appended to a truncated preview
pub const TRUNCATION_MARKER: &str = "...";

/// Resolve the format of an upload from its filename
pub fn detect_format(filename: &str) -> Result<DocumentFormat, IngestError> {
    DocumentFormat::from_filename(filename).ok_or_else(|| {
        let ext = Path::new(filename)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
            .unwrap_or_default();
        IngestError::UnsupportedFormat(ext)
    })
}

/// Extract text from a document of a known format
pub fn extract(bytes: &[u8], format: DocumentFormat) -> Result<ExtractedDocument, IngestError> {
    debug!(%format, size = bytes.len(), "Extracting document text");

    let document = match format {
        DocumentFormat::Pdf => pdf::extract(bytes)?,
        DocumentFormat::Docx => docx::extract(bytes)?,
    };

    if document.text.trim().is_empty() {
        return Err(IngestError::failed(
            format,
            format!("No text could be extracted from the {}", format.as_str().to_uppercase()),
        ));
    }

    debug!(
        %format,
        text_len = document.text.len(),
        units = document.unit_count,
        "Extraction complete"
    );
    Ok(document)
}

/// Extract text from a document, resolving its format from the filename
pub fn extract_file(bytes: &[u8], filename: &str) -> Result<ExtractedDocument, IngestError> {
    extract(bytes, detect_format(filename)?)
}

/// Shorten text for display
///
/// Returns `text` unchanged when it has at most `max_chars` characters,
/// otherwise the first `max_chars` characters followed by `...`.
/// Characters are Unicode scalar values, so the cut never splits a code point.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((cut, _)) => format!("{}{}", &text[..cut], TRUNCATION_MARKER),
    }
}
