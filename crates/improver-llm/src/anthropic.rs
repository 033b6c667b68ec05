//! Anthropic Provider Implementation
//!
//! Sends completion requests to the Anthropic Messages API.
//!
//! # Features
//!
//! - Async HTTP communication through `reqwest`
//! - Configurable endpoint and request timeout
//! - Status codes mapped onto [`LlmError`] variants
//!
//! Calls are never retried; a failed call fails the enclosing request.
//!
//! # Examples
//!
//! ```no_run
//! use improver_llm::AnthropicProvider;
//!
//! let provider = AnthropicProvider::new("https://api.anthropic.com", "sk-ant-...").unwrap();
//! ```

use crate::LlmError;
use async_trait::async_trait;
use improver_domain::traits::{Completion, CompletionRequest, LlmProvider};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Default Anthropic API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com";

/// API version header value
pub const API_VERSION: &str = "2023-06-01";

/// Default timeout for LLM requests (120 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Anthropic Messages API provider
pub struct AnthropicProvider {
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
    timeout: Duration,
}

/// Request body for the Messages API
#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

/// Response from the Messages API
#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: Usage,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

impl MessagesResponse {
    /// The first text block plus token usage
    fn into_completion(self) -> Result<Completion, LlmError> {
        let text = self
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text)
            .ok_or_else(|| LlmError::InvalidResponse("Response has no text block".to_string()))?;

        Ok(Completion {
            text,
            input_tokens: self.usage.input_tokens,
            output_tokens: self.usage.output_tokens,
        })
    }
}

impl AnthropicProvider {
    /// Create a new Anthropic provider
    ///
    /// # Parameters
    ///
    /// - `endpoint`: API base URL (e.g., "https://api.anthropic.com")
    /// - `api_key`: Secret API key
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Result<Self, LlmError> {
        Self::with_timeout(endpoint, api_key, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a provider whose HTTP calls give up after `timeout`
    pub fn with_timeout(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Other(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
            timeout,
        })
    }

    /// Create a provider against the public endpoint
    pub fn default_endpoint(api_key: impl Into<String>) -> Result<Self, LlmError> {
        Self::new(DEFAULT_ENDPOINT, api_key)
    }

    /// Configured request timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send one completion request
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The endpoint is unreachable or the request times out
    /// - The API key is rejected
    /// - The model is not available
    /// - The rate limit is exceeded
    /// - The response body cannot be decoded
    pub async fn send(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        let url = format!("{}/v1/messages", self.endpoint);

        let body = MessagesRequest {
            model: &request.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages: vec![Message {
                role: "user",
                content: &request.prompt,
            }],
        };

        debug!(model = %request.model, prompt_len = request.prompt.len(), "Sending messages request");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Communication(format!("Request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            let decoded = response
                .json::<MessagesResponse>()
                .await
                .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;
            return decoded.into_completion();
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        Err(match status {
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                LlmError::Authentication(error_text)
            }
            reqwest::StatusCode::NOT_FOUND => LlmError::ModelNotAvailable(request.model.clone()),
            reqwest::StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimitExceeded,
            _ => LlmError::Communication(format!("HTTP {}: {}", status, error_text)),
        })
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    type Error = LlmError;

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, Self::Error> {
        self.send(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anthropic_provider_creation() {
        let provider = AnthropicProvider::new("https://api.example.com/", "sk-ant-test").unwrap();
        assert_eq!(provider.endpoint, "https://api.example.com");
        assert_eq!(provider.api_key, "sk-ant-test");
        assert_eq!(provider.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn test_anthropic_provider_default_endpoint() {
        let provider = AnthropicProvider::default_endpoint("sk-ant-test").unwrap();
        assert_eq!(provider.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_request_body_shape() {
        let body = MessagesRequest {
            model: "claude-test",
            max_tokens: 4000,
            temperature: 0.3,
            messages: vec![Message {
                role: "user",
                content: "Analyze this",
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "claude-test");
        assert_eq!(json["max_tokens"], 4000);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "Analyze this");
    }

    #[test]
    fn test_response_decoding() {
        let raw = r#"{
            "id": "msg_1",
            "type": "message",
            "content": [{"type": "text", "text": "{\"summary\": \"ok\"}"}],
            "usage": {"input_tokens": 120, "output_tokens": 30}
        }"#;
        let decoded: MessagesResponse = serde_json::from_str(raw).unwrap();
        let completion = decoded.into_completion().unwrap();
        assert_eq!(completion.text, r#"{"summary": "ok"}"#);
        assert_eq!(completion.input_tokens, 120);
        assert_eq!(completion.output_tokens, 30);
    }

    #[test]
    fn test_response_without_text_block() {
        let raw = r#"{
            "content": [{"type": "tool_use", "id": "t1"}],
            "usage": {"input_tokens": 1, "output_tokens": 1}
        }"#;
        let decoded: MessagesResponse = serde_json::from_str(raw).unwrap();
        assert!(matches!(
            decoded.into_completion(),
            Err(LlmError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_anthropic_error_handling() {
        // Use invalid endpoint to trigger error
        let provider = AnthropicProvider::with_timeout(
            "http://localhost:99999",
            "sk-ant-test",
            Duration::from_secs(2),
        )
        .unwrap();

        let request = CompletionRequest {
            model: "claude-test".to_string(),
            max_tokens: 10,
            temperature: 0.0,
            prompt: "test".to_string(),
        };

        match provider.send(&request).await {
            Err(LlmError::Communication(_)) => {} // Expected
            other => panic!("Expected Communication error, got {:?}", other.map(|c| c.text)),
        }
    }
}
