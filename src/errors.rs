/*!
 * Error types for the mdtrans library.
 *
 * This module contains custom error types for different parts of the pipeline,
 * using the thiserror crate for ergonomic error definitions.
 *
 * Fatal conditions (unsupported language pair, unparseable input, cancellation)
 * surface as `TranslationError`. Per-segment problems never abort a document;
 * they are recorded on the segment result instead.
 */

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when working with LLM provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

impl ProviderError {
    /// Whether a retry with the same input may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RequestFailed(_) | Self::ConnectionError(_) | Self::RateLimitExceeded(_) => true,
            Self::ApiError { status_code, .. } => *status_code >= 500 || *status_code == 429,
            Self::ParseError(_) | Self::AuthenticationError(_) => false,
        }
    }
}

/// Which leg of a pivot translation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PivotLeg {
    /// source -> pivot language
    First,
    /// pivot language -> target
    Second,
}

impl std::fmt::Display for PivotLeg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::First => write!(f, "first"),
            Self::Second => write!(f, "second"),
        }
    }
}

/// Errors raised by a loaded MT model or its loader
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// The model could not be loaded
    #[error("failed to load model {model_id}: {message}")]
    Load { model_id: String, message: String },

    /// The model was loaded but the invocation failed
    #[error("model {model_id} failed: {message}")]
    Invocation { model_id: String, message: String },
}

/// Errors that can occur during translation
#[derive(Error, Debug)]
pub enum TranslationError {
    /// A language code is unknown or has no fallback-model equivalent
    #[error("Unsupported language '{code}': {reason}")]
    UnsupportedLanguage { code: String, reason: String },

    /// The input cannot be split into segments
    #[error("Segmentation failed: {0}")]
    Segmentation(String),

    /// A model failed to load or to translate
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// A model returned no text
    #[error("Model {model_id} returned an empty translation")]
    EmptyOutput { model_id: String },

    /// One leg of a pivot translation failed
    #[error("Pivot translation failed on the {leg} leg ({model_id}): {message}")]
    PivotTranslation {
        leg: PivotLeg,
        model_id: String,
        message: String,
    },

    /// The document translation was cancelled by the caller
    #[error("Translation cancelled")]
    Cancelled,
}

impl TranslationError {
    /// Whether this error aborts the whole document
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedLanguage { .. } | Self::Segmentation(_) | Self::Cancelled
        )
    }
}

/// Failure of a single post-edit attempt
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PostEditError {
    /// The LLM did not answer in time
    #[error("post-edit timed out after {0:?}")]
    Timeout(Duration),

    /// The provider returned an error
    #[error("post-edit provider error: {0}")]
    Provider(String),

    /// The LLM answered with nothing usable
    #[error("post-edit returned an empty response")]
    EmptyResponse,

    /// Markers of the MT output are missing from the answer
    #[error("post-edit dropped markers: {}", .0.join(", "))]
    MissingMarkers(Vec<String>),

    /// The answer contains extra, duplicated or reordered markers
    #[error("post-edit changed markers: {0}")]
    MarkerMismatch(String),

    /// The request was not sent (prompt too large)
    #[error("post-edit aborted: {0}")]
    Aborted(String),

    /// The run was cancelled while waiting
    #[error("post-edit cancelled")]
    Cancelled,
}

impl PostEditError {
    /// Whether the next attempt should switch to the strict prompt
    pub fn violates_constraints(&self) -> bool {
        matches!(self, Self::MissingMarkers(_) | Self::MarkerMismatch(_))
    }

    /// Whether retrying makes any sense
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Aborted(_) | Self::Cancelled)
    }
}
