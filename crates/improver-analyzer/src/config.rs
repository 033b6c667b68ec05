//! Configuration for the analyzer

use serde::Deserialize;
use std::time::Duration;

/// Model used when the configuration names none
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Configuration for the ProtocolAnalyzer
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Model identifier sent with every request
    pub model: String,

    /// Token budget for analysis and revision responses
    pub max_tokens: u32,

    /// Sampling temperature for the analysis call
    pub temperature: f32,

    /// Sampling temperature for the revision call
    pub revision_temperature: f32,

    /// Token budget for the connection check
    pub health_check_max_tokens: u32,

    /// Maximum time for a single model call (seconds)
    pub model_timeout_secs: u64,
}

impl AnalyzerConfig {
    /// Get the model timeout as a Duration
    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model_timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.model.trim().is_empty() {
            return Err("model must not be empty".to_string());
        }
        if self.max_tokens == 0 {
            return Err("max_tokens must be greater than 0".to_string());
        }
        if self.health_check_max_tokens == 0 {
            return Err("health_check_max_tokens must be greater than 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err("temperature must be between 0.0 and 1.0".to_string());
        }
        if !(0.0..=1.0).contains(&self.revision_temperature) {
            return Err("revision_temperature must be between 0.0 and 1.0".to_string());
        }
        if self.model_timeout_secs == 0 {
            return Err("model_timeout_secs must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 4000,
            temperature: 0.3,
            revision_temperature: 0.3,
            health_check_max_tokens: 50,
            model_timeout_secs: 120,
        }
    }
}
