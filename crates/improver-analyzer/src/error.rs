//! Error types for the analyzer

use improver_ingest::IngestError;
use thiserror::Error;

/// Errors that can occur while analyzing or improving a protocol
#[derive(Error, Debug)]
pub enum AnalyzerError {
    /// Upload extension outside the accepted set
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Document could not be read or yielded no text
    #[error("{0}")]
    ExtractionFailed(String),

    /// LLM provider error
    #[error("Model call failed: {0}")]
    ModelCallFailed(String),

    /// Model call did not finish in time
    #[error("Model call timed out after {0}s")]
    Timeout(u64),

    /// Model output looked like JSON but could not be decoded
    #[error("Could not parse analysis response: {0}")]
    ResponseMalformed(String),

    /// No cached analysis under the given id
    #[error("Analysis not found: {0}")]
    AnalysisNotFound(String),

    /// Analysis store error
    #[error("Store error: {0}")]
    Store(String),
}

impl From<IngestError> for AnalyzerError {
    fn from(e: IngestError) -> Self {
        match e {
            IngestError::UnsupportedFormat(ext) => AnalyzerError::UnsupportedFormat(ext),
            other @ IngestError::ExtractionFailed { .. } => {
                AnalyzerError::ExtractionFailed(other.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use improver_domain::DocumentFormat;

    #[test]
    fn test_ingest_errors_convert() {
        let err: AnalyzerError = IngestError::UnsupportedFormat(".txt".into()).into();
        assert!(matches!(err, AnalyzerError::UnsupportedFormat(ref ext) if ext == ".txt"));

        let err: AnalyzerError = IngestError::ExtractionFailed {
            format: DocumentFormat::Pdf,
            reason: "bad xref".into(),
        }
        .into();
        assert_eq!(err.to_string(), "Error extracting text from pdf: bad xref");
    }
}
