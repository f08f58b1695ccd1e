/*!
 * Provider implementations for LLM services used by the post-editor.
 *
 * This module contains client implementations for:
 * - Ollama: Local LLM server
 * - OpenAI: OpenAI API, and any OpenAI-compatible server such as LM Studio
 * - Mock: Scripted provider for tests
 *
 * Each client implements `Provider` for its native request/response types,
 * and `TextGenerator`, the object-safe prompt-in/text-out seam the
 * post-editor depends on.
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::errors::ProviderError;

/// Common trait for all LLM providers
///
/// This trait defines the interface that all provider implementations must follow,
/// allowing them to be used interchangeably.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// The request type for this provider
    type Request: Send + Sync;

    /// The response type for this provider
    type Response: Send + Sync;

    /// Complete a request using this provider
    async fn complete(&self, request: Self::Request) -> Result<Self::Response, ProviderError>;

    /// Test the connection to the provider
    async fn test_connection(&self) -> Result<(), ProviderError>;

    /// Extract text from the provider response
    fn extract_text(response: &Self::Response) -> String;
}

/// Sampling controls; a fixed seed makes runs reproducible where the backend honors it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    pub temperature: f32,
    pub top_p: f32,
    pub seed: Option<u64>,
    pub max_tokens: u32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            top_p: 0.9,
            seed: None,
            max_tokens: 2048,
        }
    }
}

/// Prompt in, text out
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Human-readable name for logs
    fn name(&self) -> String;

    async fn generate(&self, prompt: &str, params: &SamplingParams) -> Result<String, ProviderError>;

    async fn check_connection(&self) -> Result<(), ProviderError>;
}

pub mod mock;
pub mod ollama;
pub mod openai;
