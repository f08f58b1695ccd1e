/*!
 * Mock provider implementations for testing.
 *
 * This module provides a mock LLM that simulates different behaviors:
 * - `MockProvider::working()` - Returns the MT draft with a `[polished] ` prefix
 * - `MockProvider::drop_markers()` - Returns the draft without its markers
 * - `MockProvider::failing()` - Always fails with an error
 * - `MockProvider::slow(ms)` - Answers after a delay, for timeout testing
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::ProviderError;
use crate::providers::{Provider, SamplingParams, TextGenerator};
use crate::translation::postedit::extract_draft;
use crate::validation::markers::extract_markers;

/// Mock request for testing
#[derive(Debug, Clone)]
pub struct MockRequest {
    pub prompt: String,
}

/// Mock response for testing
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub text: String,
}

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a polished draft
    Working,
    /// Succeeds but drops every marker of the draft
    DropMarkers,
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Always fails with an error
    Failing,
    /// Returns empty response
    Empty,
    /// Simulates slow response (for timeout testing)
    Slow { delay_ms: u64 },
}

/// Mock provider for testing post-edit behavior
#[derive(Debug)]
pub struct MockProvider {
    behavior: MockBehavior,
    /// Request counter, shared between clones
    request_count: Arc<AtomicUsize>,
    /// Every prompt received, shared between clones
    prompts: Arc<Mutex<Vec<String>>>,
    /// Custom response generator for `Working` (receives the prompt)
    custom_response: Option<fn(&str) -> String>,
}

impl MockProvider {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            prompts: Arc::new(Mutex::new(Vec::new())),
            custom_response: None,
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn drop_markers() -> Self {
        Self::new(MockBehavior::DropMarkers)
    }

    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every })
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Set a custom response generator
    pub fn with_custom_response(mut self, generator: fn(&str) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Number of requests received so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Prompts received so far
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    fn polished(prompt: &str) -> String {
        format!("[polished] {}", extract_draft(prompt).unwrap_or_default())
    }
}

impl Clone for MockProvider {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior,
            request_count: Arc::clone(&self.request_count),
            prompts: Arc::clone(&self.prompts),
            custom_response: self.custom_response,
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    type Request = MockRequest;
    type Response = MockResponse;

    async fn complete(&self, request: Self::Request) -> Result<Self::Response, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(request.prompt.clone());

        let text = match self.behavior {
            MockBehavior::Working => match self.custom_response {
                Some(generator) => generator(&request.prompt),
                None => Self::polished(&request.prompt),
            },
            MockBehavior::DropMarkers => {
                let mut draft = extract_draft(&request.prompt).unwrap_or_default();
                for marker in extract_markers(&draft.clone()) {
                    draft = draft.replace(&marker, "");
                }
                draft
            }
            MockBehavior::Intermittent { fail_every } => {
                if count % fail_every == fail_every - 1 {
                    return Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    });
                }
                Self::polished(&request.prompt)
            }
            MockBehavior::Failing => {
                return Err(ProviderError::ApiError {
                    message: "Simulated provider failure".to_string(),
                    status_code: 500,
                });
            }
            MockBehavior::Empty => String::new(),
            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                Self::polished(&request.prompt)
            }
        };

        Ok(MockResponse { text })
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        match self.behavior {
            MockBehavior::Failing => Err(ProviderError::ConnectionError("mock offline".to_string())),
            _ => Ok(()),
        }
    }

    fn extract_text(response: &Self::Response) -> String {
        response.text.clone()
    }
}

#[async_trait]
impl TextGenerator for MockProvider {
    fn name(&self) -> String {
        format!("mock/{:?}", self.behavior)
    }

    async fn generate(&self, prompt: &str, _params: &SamplingParams) -> Result<String, ProviderError> {
        let response = self
            .complete(MockRequest {
                prompt: prompt.to_string(),
            })
            .await?;
        Ok(Self::extract_text(&response))
    }

    async fn check_connection(&self) -> Result<(), ProviderError> {
        self.test_connection().await
    }
}
