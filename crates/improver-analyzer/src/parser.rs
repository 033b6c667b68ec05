//! Parse LLM output into an analysis result
//!
//! Parsing never fails: output that cannot be decoded still produces a
//! result, tagged by [`ParseOutcome`] so the caller decides what to do.

use improver_domain::{sort_by_priority, AnalysisResult, Category, Priority, Suggestion};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Summary used when the model gives none
pub const DEFAULT_SUMMARY: &str = "Analysis completed";

/// Summary used when the output contains no JSON object at all
pub const UNSTRUCTURED_SUMMARY: &str = "Analysis completed but response format was unexpected";

/// Score used when the model gives none
pub const DEFAULT_SCORE: &str = "N/A";

/// How a model response was interpreted
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    /// A JSON object was found and normalized
    Structured(AnalysisResult),

    /// No JSON object in the output; raw text kept, not an error
    Unstructured(AnalysisResult),

    /// Something that looked like JSON failed to decode
    Malformed {
        /// Empty result carrying the raw text
        result: AnalysisResult,
        /// Decoder message
        reason: String,
    },
}

impl ParseOutcome {
    /// Whether the response should be reported as an error
    pub fn is_error(&self) -> bool {
        matches!(self, ParseOutcome::Malformed { .. })
    }

    /// The result, whatever the outcome
    pub fn result(&self) -> &AnalysisResult {
        match self {
            ParseOutcome::Structured(result)
            | ParseOutcome::Unstructured(result)
            | ParseOutcome::Malformed { result, .. } => result,
        }
    }
}

/// Top-level shape demanded of the model; every field optional
#[derive(Debug, Default, Deserialize)]
struct RawAnalysis {
    #[serde(default)]
    summary: Option<Value>,
    #[serde(default)]
    overall_score: Option<Value>,
    #[serde(default)]
    total_issues: Option<Value>,
    #[serde(default)]
    suggestions: Option<Value>,
}

/// One suggestion as the model wrote it; scalar fields are coerced to text
#[derive(Debug, Deserialize)]
struct RawSuggestion {
    #[serde(default)]
    category: Option<Value>,
    #[serde(default)]
    priority: Option<Value>,
    #[serde(default)]
    location: Option<Value>,
    #[serde(default)]
    issue: Option<Value>,
    #[serde(default)]
    suggestion: Option<Value>,
    #[serde(default)]
    example: Option<Value>,
}

impl RawSuggestion {
    fn into_suggestion(self) -> Option<Suggestion> {
        let text = field_text(&self.suggestion).filter(|s| !s.trim().is_empty())?;
        Some(Suggestion {
            category: Category::parse(&field_text(&self.category).unwrap_or_default()),
            priority: field_text(&self.priority)
                .map(|p| Priority::parse(&p))
                .unwrap_or_default(),
            location: field_text(&self.location).unwrap_or_default(),
            issue: field_text(&self.issue).unwrap_or_default(),
            suggestion: text,
            example: field_text(&self.example).filter(|e| !e.trim().is_empty()),
        })
    }
}

fn field_text(value: &Option<Value>) -> Option<String> {
    value.as_ref().and_then(as_text)
}

/// Parse a raw model response
pub fn parse_analysis_response(raw: &str) -> ParseOutcome {
    let Some(payload) = json_span(raw) else {
        debug!(len = raw.len(), "No JSON object in model response");
        return ParseOutcome::Unstructured(AnalysisResult {
            summary: UNSTRUCTURED_SUMMARY.to_string(),
            overall_score: DEFAULT_SCORE.to_string(),
            total_issues: 0,
            suggestions: Vec::new(),
            raw_response: Some(raw.to_string()),
        });
    };

    match serde_json::from_str::<RawAnalysis>(payload) {
        Ok(analysis) => ParseOutcome::Structured(normalize(analysis)),
        Err(e) => {
            warn!(error = %e, "Model response is not a decodable JSON object");
            ParseOutcome::Malformed {
                result: AnalysisResult {
                    summary: String::new(),
                    overall_score: DEFAULT_SCORE.to_string(),
                    total_issues: 0,
                    suggestions: Vec::new(),
                    raw_response: Some(raw.to_string()),
                },
                reason: e.to_string(),
            }
        }
    }
}

/// The span from the first `{` to the last `}`, inclusive
fn json_span(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end > start {
        Some(&raw[start..=end])
    } else {
        None
    }
}

fn normalize(analysis: RawAnalysis) -> AnalysisResult {
    let items = match analysis.suggestions {
        Some(Value::Array(items)) => items,
        Some(Value::Null) | None => Vec::new(),
        Some(other) => {
            warn!(kind = value_kind(&other), "Ignoring non-array suggestions");
            Vec::new()
        }
    };

    let mut suggestions = Vec::with_capacity(items.len());
    for (idx, item) in items.into_iter().enumerate() {
        if !item.is_object() {
            warn!(index = idx, kind = value_kind(&item), "Skipping suggestion that is not an object");
            continue;
        }
        match serde_json::from_value::<RawSuggestion>(item) {
            Ok(raw) => match raw.into_suggestion() {
                Some(suggestion) => suggestions.push(suggestion),
                None => warn!(index = idx, "Skipping suggestion without suggestion text"),
            },
            Err(e) => warn!(index = idx, error = %e, "Failed to decode suggestion"),
        }
    }
    sort_by_priority(&mut suggestions);

    let total_issues = analysis
        .total_issues
        .as_ref()
        .and_then(as_count)
        .unwrap_or(suggestions.len());

    AnalysisResult {
        summary: analysis
            .summary
            .as_ref()
            .and_then(as_text)
            .unwrap_or_else(|| DEFAULT_SUMMARY.to_string()),
        overall_score: analysis
            .overall_score
            .as_ref()
            .and_then(as_text)
            .unwrap_or_else(|| DEFAULT_SCORE.to_string()),
        total_issues,
        suggestions,
        raw_response: None,
    }
}

/// Strings verbatim, numbers and booleans printed; null and containers absent
fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Non-negative integers, given as numbers or numeric strings
fn as_count(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
