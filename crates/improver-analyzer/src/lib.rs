//! Protocol Improver Analyzer
//!
//! Reviews laboratory protocols with an LLM and rewrites them with the
//! suggestions a user accepts.
//!
//! # Architecture
//!
//! ```text
//! analyze: Document → Extractor → Prompt → LLM → Parser → AnalysisStore
//! improve: AnalysisStore → accepted Suggestions → Revision Prompt → LLM → Text
//! ```
//!
//! # Key Features
//!
//! - **Structured Review**: suggestions with category, priority and location,
//!   sorted HIGH → MEDIUM → LOW
//! - **Tolerant Parsing**: model output that is not clean JSON still yields a
//!   result; only undecodable JSON is an error
//! - **Selective Revision**: only the accepted suggestions reach the model, and
//!   accepting none costs no model call
//! - **Bounded Calls**: every model call runs under a timeout
//!
//! # Example Usage
//!
//! ```
//! use improver_analyzer::{AnalyzerConfig, ImproveOutcome, ProtocolAnalyzer};
//! use improver_llm::MockProvider;
//! use improver_store::InMemoryStore;
//!
//! # tokio_test::block_on(async {
//! let llm = MockProvider::new(r#"{"summary": "Clear", "suggestions": [
//!     {"priority": "HIGH", "location": "Step 1", "suggestion": "Wear gloves"}
//! ]}"#);
//! let analyzer = ProtocolAnalyzer::new(llm, InMemoryStore::new(), AnalyzerConfig::default());
//!
//! let report = analyzer
//!     .analyze_text("1. Mix reagents".to_string(), "pcr.pdf", "20240101_120000_pcr.pdf")
//!     .await
//!     .unwrap();
//! assert_eq!(report.result.suggestions.len(), 1);
//!
//! let outcome = analyzer.improve(&report.analysis_id, &[]).await.unwrap();
//! assert_eq!(outcome, ImproveOutcome::Unchanged { text: "1. Mix reagents".to_string() });
//! # });
//! ```

#![warn(missing_docs)]

mod analyzer;
mod config;
mod error;
mod parser;
mod prompt;
mod types;

#[cfg(test)]
mod tests;

pub use analyzer::ProtocolAnalyzer;
pub use config::{AnalyzerConfig, DEFAULT_MODEL};
pub use error::AnalyzerError;
pub use parser::{parse_analysis_response, ParseOutcome};
pub use prompt::{build_analysis_prompt, build_revision_prompt, HEALTH_CHECK_PROMPT};
pub use types::{AnalysisMetadata, AnalysisReport, AnalysisRequest, ImproveOutcome};
