//! Document module - supported upload formats and extracted text

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Binary document formats accepted for review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    /// Portable Document Format
    Pdf,

    /// Office Open XML word-processing package (`.docx`, legacy `.doc`)
    Docx,
}

impl DocumentFormat {
    /// Upload extensions that are accepted, with the leading dot
    pub const ALLOWED_EXTENSIONS: [&'static str; 3] = [".pdf", ".docx", ".doc"];

    /// Resolve a format from a bare extension (no dot, any case)
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(DocumentFormat::Pdf),
            "docx" | "doc" => Some(DocumentFormat::Docx),
            _ => None,
        }
    }

    /// Resolve a format from a filename's extension
    ///
    /// # Examples
    ///
    /// ```
    /// use improver_domain::DocumentFormat;
    ///
    /// assert_eq!(DocumentFormat::from_filename("PCR.PDF"), Some(DocumentFormat::Pdf));
    /// assert_eq!(DocumentFormat::from_filename("notes.doc"), Some(DocumentFormat::Docx));
    /// assert_eq!(DocumentFormat::from_filename("notes.txt"), None);
    /// ```
    pub fn from_filename(filename: &str) -> Option<Self> {
        Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Get the format name
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Docx => "docx",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Plain text pulled out of an uploaded document
///
/// Transient: produced and consumed within one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedDocument {
    /// Extracted text; never blank
    pub text: String,

    /// Source format
    pub format: DocumentFormat,

    /// Page count (PDF) or non-empty paragraph count (DOCX)
    pub unit_count: usize,

    /// Title from the document's embedded metadata
    pub title: Option<String>,

    /// Author from the document's embedded metadata
    pub author: Option<String>,

    /// Which extraction backend produced the text
    pub extraction_method: String,
}
