//! Protocol Improver LLM Provider Layer
//!
//! Implementations of the `LlmProvider` trait from `improver-domain`.
//!
//! # Providers
//!
//! - `MockProvider`: Deterministic mock for testing
//! - `AnthropicProvider`: Anthropic Messages API integration
//!
//! # Examples
//!
//! ```
//! use improver_domain::traits::{CompletionRequest, LlmProvider};
//! use improver_llm::MockProvider;
//!
//! # tokio_test::block_on(async {
//! let provider = MockProvider::new("Hello from LLM!");
//! let request = CompletionRequest {
//!     model: "mock".into(),
//!     max_tokens: 50,
//!     temperature: 0.0,
//!     prompt: "test prompt".into(),
//! };
//! let completion = provider.complete(&request).await.unwrap();
//! assert_eq!(completion.text, "Hello from LLM!");
//! # });
//! ```

#![warn(missing_docs)]

pub mod anthropic;

use async_trait::async_trait;
use improver_domain::traits::{Completion, CompletionRequest, LlmProvider};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;

pub use anthropic::AnthropicProvider;

/// Errors that can occur during LLM operations
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from LLM
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// API key rejected
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

/// Provider handle used by the server, erased over the concrete backend
pub type SharedProvider = Arc<dyn LlmProvider<Error = LlmError>>;

#[derive(Debug, Clone)]
enum MockReply {
    Text(String),
    Error(String),
}

#[derive(Debug, Default)]
struct MockState {
    by_prompt: HashMap<String, MockReply>,
    queued: VecDeque<MockReply>,
    requests: Vec<CompletionRequest>,
}

/// Mock LLM provider for deterministic testing
///
/// Returns pre-configured responses without making any network calls.
/// Replies are chosen in this order: an exact-prompt match, then the next
/// queued reply, then the default response.
///
/// # Examples
///
/// ```
/// use improver_domain::traits::{CompletionRequest, LlmProvider};
/// use improver_llm::MockProvider;
///
/// # tokio_test::block_on(async {
/// let provider = MockProvider::default();
/// provider.push_response("first");
/// provider.push_response("second");
///
/// let request = CompletionRequest {
///     model: "mock".into(),
///     max_tokens: 10,
///     temperature: 0.0,
///     prompt: "anything".into(),
/// };
/// assert_eq!(provider.complete(&request).await.unwrap().text, "first");
/// assert_eq!(provider.complete(&request).await.unwrap().text, "second");
/// assert_eq!(provider.call_count(), 2);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    delay: Option<Duration>,
    state: Arc<Mutex<MockState>>,
}

impl MockProvider {
    /// Create a new MockProvider with a fixed response for all prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            delay: None,
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Sleep before answering, to exercise caller timeouts
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Add a specific response for a given prompt
    pub fn add_response(&self, prompt: impl Into<String>, response: impl Into<String>) {
        self.state()
            .by_prompt
            .insert(prompt.into(), MockReply::Text(response.into()));
    }

    /// Configure to return an error for a specific prompt
    pub fn add_error(&self, prompt: impl Into<String>) {
        self.state()
            .by_prompt
            .insert(prompt.into(), MockReply::Error("Mock error".to_string()));
    }

    /// Queue a response for the next call that has no exact-prompt match
    pub fn push_response(&self, response: impl Into<String>) {
        self.state().queued.push_back(MockReply::Text(response.into()));
    }

    /// Queue an error for the next call that has no exact-prompt match
    pub fn push_error(&self, message: impl Into<String>) {
        self.state().queued.push_back(MockReply::Error(message.into()));
    }

    /// Get the number of times complete was called
    pub fn call_count(&self) -> usize {
        self.state().requests.len()
    }

    /// All requests received so far, oldest first
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.state().requests.clone()
    }

    /// The most recent request, if any
    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.state().requests.last().cloned()
    }

    /// Forget recorded requests
    pub fn reset_call_count(&self) {
        self.state().requests.clear();
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread must not take the other tests' mock down with it
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    type Error = LlmError;

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, Self::Error> {
        let reply = {
            let mut state = self.state();
            state.requests.push(request.clone());
            match state.by_prompt.get(&request.prompt) {
                Some(reply) => reply.clone(),
                None => state
                    .queued
                    .pop_front()
                    .unwrap_or_else(|| MockReply::Text(self.default_response.clone())),
            }
        };

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match reply {
            MockReply::Text(text) => Ok(Completion {
                input_tokens: request.prompt.split_whitespace().count() as u32,
                output_tokens: text.split_whitespace().count() as u32,
                text,
            }),
            MockReply::Error(message) => Err(LlmError::Other(message)),
        }
    }
}
