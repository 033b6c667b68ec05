//! Error types for document ingestion

use improver_domain::DocumentFormat;
use thiserror::Error;

/// Errors that can occur while turning an upload into text
#[derive(Error, Debug)]
pub enum IngestError {
    /// Extension outside the accepted set
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Document could not be parsed or yielded no text
    #[error("Error extracting text from {format}: {reason}")]
    ExtractionFailed {
        /// Format the document was read as
        format: DocumentFormat,
        /// Underlying cause
        reason: String,
    },
}

impl IngestError {
    pub(crate) fn failed(format: DocumentFormat, reason: impl ToString) -> Self {
        IngestError::ExtractionFailed {
            format,
            reason: reason.to_string(),
        }
    }
}
