//! Protocol Improver Domain Layer
//!
//! This crate contains the domain model shared by every other crate in the
//! workspace. It defines the value types that flow through the review
//! pipeline and the trait interfaces for the two pieces of infrastructure the
//! pipeline talks to: the language model and the analysis cache.
//!
//! ## Key Concepts
//!
//! - **Protocol**: a laboratory procedure document submitted for review
//! - **Suggestion**: one structured improvement item returned by the review
//! - **Analysis**: the summary, score and ordered suggestions for one protocol
//! - **Analysis record**: the cached original text plus its analysis
//!
//! ## Architecture
//!
//! - No I/O in this crate
//! - Infrastructure implementations live in other crates
//! - Trait definitions for all external interactions

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod document;
pub mod suggestion;
pub mod traits;

// Re-exports for convenience
pub use analysis::{AnalysisDraft, AnalysisId, AnalysisRecord, AnalysisResult};
pub use document::{DocumentFormat, ExtractedDocument};
pub use suggestion::{sort_by_priority, Category, Priority, Suggestion};
