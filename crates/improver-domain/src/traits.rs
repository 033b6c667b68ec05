//! Trait definitions for external interactions
//!
//! These traits define the boundaries between the review pipeline and
//! infrastructure. Infrastructure implementations live in other crates.

use crate::analysis::{AnalysisDraft, AnalysisId, AnalysisRecord};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A single text-completion request to the language model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model identifier
    pub model: String,

    /// Upper bound on generated tokens
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// The full user prompt
    pub prompt: String,
}

/// The model's answer to a [`CompletionRequest`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    /// Generated text
    pub text: String,

    /// Tokens consumed by the prompt
    pub input_tokens: u32,

    /// Tokens generated
    pub output_tokens: u32,
}

impl Completion {
    /// Total tokens billed for the call
    pub fn total_tokens(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// Trait for LLM provider operations
///
/// Implemented by the infrastructure layer (improver-llm)
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Error type for LLM operations
    type Error;

    /// Run one completion
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, Self::Error>;
}

#[async_trait]
impl<T> LlmProvider for Arc<T>
where
    T: LlmProvider + ?Sized,
{
    type Error = T::Error;

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, Self::Error> {
        (**self).complete(request).await
    }
}

/// Trait for caching completed analyses
///
/// Implemented by the infrastructure layer (improver-store). Implementations
/// must be safe to share between concurrent requests.
pub trait AnalysisStore: Send + Sync {
    /// Error type for store operations
    type Error;

    /// Store a completed analysis and return its newly assigned id
    ///
    /// No two calls may return the same id within a process lifetime.
    fn put(&self, draft: AnalysisDraft) -> Result<AnalysisId, Self::Error>;

    /// Get an analysis by id
    fn get(&self, id: &AnalysisId) -> Result<Option<AnalysisRecord>, Self::Error>;

    /// Number of cached analyses
    fn len(&self) -> Result<usize, Self::Error>;

    /// Whether the store holds no analyses
    fn is_empty(&self) -> Result<bool, Self::Error> {
        Ok(self.len()? == 0)
    }
}
