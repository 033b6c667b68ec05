//! Core ProtocolAnalyzer implementation

use crate::config::AnalyzerConfig;
use crate::error::AnalyzerError;
use crate::parser::{parse_analysis_response, ParseOutcome};
use crate::prompt::{build_analysis_prompt, build_revision_prompt, HEALTH_CHECK_PROMPT};
use crate::types::{AnalysisMetadata, AnalysisReport, AnalysisRequest, ImproveOutcome};
use chrono::Local;
use improver_domain::traits::{AnalysisStore, Completion, CompletionRequest, LlmProvider};
use improver_domain::{AnalysisDraft, AnalysisId, ExtractedDocument, Suggestion};
use std::fmt::Display;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Reviews protocols with an LLM and rewrites them with accepted suggestions
pub struct ProtocolAnalyzer<L, S>
where
    L: LlmProvider,
    S: AnalysisStore,
{
    llm_provider: L,
    store: S,
    config: AnalyzerConfig,
}

impl<L, S> ProtocolAnalyzer<L, S>
where
    L: LlmProvider,
    S: AnalysisStore,
    L::Error: Display,
    S::Error: Display,
{
    /// Create a new ProtocolAnalyzer
    pub fn new(llm_provider: L, store: S, config: AnalyzerConfig) -> Self {
        Self {
            llm_provider,
            store,
            config,
        }
    }

    /// The analysis cache
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Active configuration
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Number of cached analyses
    pub fn cached_analyses(&self) -> Result<usize, AnalyzerError> {
        self.store.len().map_err(store_error)
    }

    /// Extract the text of an uploaded document on the blocking pool
    pub async fn extract(
        &self,
        document: Vec<u8>,
        filename: &str,
    ) -> Result<ExtractedDocument, AnalyzerError> {
        let format = improver_ingest::detect_format(filename)?;

        let extracted = tokio::task::spawn_blocking(move || improver_ingest::extract(&document, format))
            .await
            .map_err(|e| AnalyzerError::ExtractionFailed(format!("Extraction task failed: {}", e)))??;

        Ok(extracted)
    }

    /// Extract, review and cache an uploaded protocol
    pub async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisReport, AnalyzerError> {
        let AnalysisRequest {
            document,
            filename,
            stored_filename,
        } = request;

        let extracted = self.extract(document, &filename).await?;
        self.analyze_text(extracted.text, &filename, &stored_filename)
            .await
    }

    /// Review and cache protocol text that has already been extracted
    pub async fn analyze_text(
        &self,
        protocol_text: String,
        filename: &str,
        stored_filename: &str,
    ) -> Result<AnalysisReport, AnalyzerError> {
        info!(
            filename = %filename,
            text_len = protocol_text.len(),
            "Starting protocol analysis"
        );

        let prompt = build_analysis_prompt(&protocol_text, filename);
        let completion = self
            .call_model(prompt, self.config.max_tokens, self.config.temperature)
            .await?;

        debug!(response_len = completion.text.len(), "Model response received");

        let result = match parse_analysis_response(&completion.text) {
            ParseOutcome::Structured(result) => result,
            ParseOutcome::Unstructured(result) => {
                warn!(filename = %filename, "Model response had no JSON object, keeping raw text");
                result
            }
            ParseOutcome::Malformed { reason, .. } => {
                return Err(AnalyzerError::ResponseMalformed(reason));
            }
        };

        let metadata = AnalysisMetadata {
            filename: filename.to_string(),
            model_used: self.config.model.clone(),
            protocol_length: protocol_text.chars().count(),
            tokens_used: completion.total_tokens(),
        };

        let analysis_id = self
            .store
            .put(AnalysisDraft {
                stored_filename: stored_filename.to_string(),
                source_filename: filename.to_string(),
                original_text: protocol_text,
                result: result.clone(),
                created_at: Local::now(),
            })
            .map_err(store_error)?;

        info!(
            analysis_id = %analysis_id,
            suggestions = result.suggestions.len(),
            tokens = metadata.tokens_used,
            "Analysis complete"
        );

        Ok(AnalysisReport {
            analysis_id,
            filename: filename.to_string(),
            result,
            metadata,
        })
    }

    /// Rewrite a cached protocol with the suggestions at `accepted_indices`
    ///
    /// Indices are positions in the cached (priority-sorted) suggestion list.
    /// Negative and out-of-range indices are ignored; the rest are applied in
    /// the order given, duplicates included.
    pub async fn improve(
        &self,
        analysis_id: &AnalysisId,
        accepted_indices: &[i64],
    ) -> Result<ImproveOutcome, AnalyzerError> {
        let record = self
            .store
            .get(analysis_id)
            .map_err(store_error)?
            .ok_or_else(|| AnalyzerError::AnalysisNotFound(analysis_id.to_string()))?;

        let accepted = select_suggestions(&record.result.suggestions, accepted_indices);

        if accepted.is_empty() {
            info!(analysis_id = %analysis_id, "No suggestions accepted, returning original protocol");
            return Ok(ImproveOutcome::Unchanged {
                text: record.original_text,
            });
        }

        info!(
            analysis_id = %analysis_id,
            accepted = accepted.len(),
            "Generating improved protocol"
        );

        let prompt = build_revision_prompt(&record.original_text, &accepted);
        let completion = self
            .call_model(prompt, self.config.max_tokens, self.config.revision_temperature)
            .await?;

        Ok(ImproveOutcome::Revised {
            text: completion.text,
            suggestions_applied: accepted.len(),
            source_filename: record.source_filename,
        })
    }

    /// Check that the model answers at all
    pub async fn quick_check(&self) -> bool {
        let result = self
            .call_model(
                HEALTH_CHECK_PROMPT.to_string(),
                self.config.health_check_max_tokens,
                self.config.temperature,
            )
            .await;

        match result {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "Model connection check failed");
                false
            }
        }
    }

    /// Call the LLM provider, bounded by the configured timeout
    async fn call_model(
        &self,
        prompt: String,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<Completion, AnalyzerError> {
        let request = CompletionRequest {
            model: self.config.model.clone(),
            max_tokens,
            temperature,
            prompt,
        };

        debug!(prompt_len = request.prompt.len(), max_tokens, "Calling model");

        timeout(
            self.config.model_timeout(),
            self.llm_provider.complete(&request),
        )
        .await
        .map_err(|_| AnalyzerError::Timeout(self.config.model_timeout_secs))?
        .map_err(|e| AnalyzerError::ModelCallFailed(e.to_string()))
    }
}

/// Suggestions at the given positions, in the order given
fn select_suggestions(suggestions: &[Suggestion], indices: &[i64]) -> Vec<Suggestion> {
    indices
        .iter()
        .filter_map(|&i| usize::try_from(i).ok())
        .filter_map(|i| suggestions.get(i).cloned())
        .collect()
}

fn store_error(e: impl Display) -> AnalyzerError {
    AnalyzerError::Store(e.to_string())
}
