//! Request and result types for the analyzer

use improver_domain::{AnalysisId, AnalysisResult};
use serde::{Deserialize, Serialize};

/// An uploaded protocol to analyze
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    /// Raw file contents
    pub document: Vec<u8>,

    /// Filename the user uploaded; selects the format and appears in the prompt
    pub filename: String,

    /// Filename the upload was saved under; the analysis id is derived from it
    pub stored_filename: String,
}

/// Bookkeeping about a completed analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    /// Filename the user uploaded
    pub filename: String,

    /// Model that produced the analysis
    pub model_used: String,

    /// Length of the extracted protocol text in characters
    pub protocol_length: usize,

    /// Input plus output tokens of the analysis call
    pub tokens_used: u32,
}

/// Result of [`crate::ProtocolAnalyzer::analyze`]
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    /// Key of the cached analysis, needed to request a revision
    pub analysis_id: AnalysisId,

    /// Filename the user uploaded
    pub filename: String,

    /// Parsed analysis, suggestions sorted by priority
    pub result: AnalysisResult,

    /// Call bookkeeping
    pub metadata: AnalysisMetadata,
}

/// Result of [`crate::ProtocolAnalyzer::improve`]
#[derive(Debug, Clone, PartialEq)]
pub enum ImproveOutcome {
    /// No accepted index was in range; the original text, without a model call
    Unchanged {
        /// Original protocol text
        text: String,
    },

    /// The model rewrote the protocol
    Revised {
        /// Revised protocol text
        text: String,
        /// Number of suggestions sent to the model
        suggestions_applied: usize,
        /// Filename the user originally uploaded
        source_filename: String,
    },
}

impl ImproveOutcome {
    /// The protocol text to show the user
    pub fn text(&self) -> &str {
        match self {
            ImproveOutcome::Unchanged { text } | ImproveOutcome::Revised { text, .. } => text,
        }
    }

    /// Number of suggestions applied; zero when unchanged
    pub fn suggestions_applied(&self) -> usize {
        match self {
            ImproveOutcome::Unchanged { .. } => 0,
            ImproveOutcome::Revised {
                suggestions_applied,
                ..
            } => *suggestions_applied,
        }
    }
}
