//! Analysis module - the review result and its cached record

use crate::suggestion::Suggestion;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a cached analysis
///
/// Derived from the stored upload filename and the local creation time
/// (`{stored_filename}_{YYYYmmddHHMMSS}`). The store appends a numeric
/// suffix when the same filename is analyzed twice within one second, so an
/// id is unique for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalysisId(String);

impl AnalysisId {
    /// Build the base id for a stored filename and creation time
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{Local, TimeZone};
    /// use improver_domain::AnalysisId;
    ///
    /// let at = Local.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
    /// let id = AnalysisId::derive("20250314_092653_pcr.pdf", at);
    /// assert_eq!(id.as_str(), "20250314_092653_pcr.pdf_20250314092653");
    /// ```
    pub fn derive(stored_filename: &str, created_at: DateTime<Local>) -> Self {
        Self(format!(
            "{}_{}",
            stored_filename,
            created_at.format("%Y%m%d%H%M%S")
        ))
    }

    /// The same id with a disambiguating sequence suffix
    pub fn with_suffix(&self, n: u32) -> Self {
        Self(format!("{}_{}", self.0, n))
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for AnalysisId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AnalysisId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for AnalysisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The structured review of one protocol
///
/// `suggestions` is always sorted by priority (see
/// [`crate::suggestion::sort_by_priority`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Brief overview of the protocol and overall assessment
    pub summary: String,

    /// Score as reported by the model ("7", "7/10", ...)
    pub overall_score: String,

    /// Number of issues reported; defaults to the suggestion count
    pub total_issues: usize,

    /// Suggestions ordered by priority
    pub suggestions: Vec<Suggestion>,

    /// Raw model output, kept when the output could not be fully decoded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

/// Everything needed to cache an analysis, before an id is assigned
#[derive(Debug, Clone)]
pub struct AnalysisDraft {
    /// Filename the upload was saved under; the id is derived from it
    pub stored_filename: String,

    /// Filename the user uploaded
    pub source_filename: String,

    /// Full extracted protocol text
    pub original_text: String,

    /// Parsed analysis
    pub result: AnalysisResult,

    /// When the analysis completed
    pub created_at: DateTime<Local>,
}

/// A cached analysis
///
/// Created once by the store and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct AnalysisRecord {
    /// Unique identifier
    pub id: AnalysisId,

    /// Full extracted protocol text
    pub original_text: String,

    /// Parsed analysis
    pub result: AnalysisResult,

    /// Filename the user uploaded
    pub source_filename: String,

    /// When the analysis completed
    pub created_at: DateTime<Local>,
}

impl AnalysisRecord {
    /// Turn a draft into a record under the given id
    pub fn from_draft(id: AnalysisId, draft: AnalysisDraft) -> Self {
        Self {
            id,
            original_text: draft.original_text,
            result: draft.result,
            source_filename: draft.source_filename,
            created_at: draft.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_analysis_id_derive_format() {
        let at = Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let id = AnalysisId::derive("20240102_030405_protocol.docx", at);
        assert_eq!(id.to_string(), "20240102_030405_protocol.docx_20240102030405");
    }

    #[test]
    fn test_analysis_id_suffix() {
        let id = AnalysisId::from("a.pdf_20240102030405");
        assert_eq!(id.with_suffix(2).as_str(), "a.pdf_20240102030405_2");
    }

    #[test]
    fn test_analysis_id_serializes_as_plain_string() {
        let id = AnalysisId::from("x_1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"x_1\"");
    }
}
