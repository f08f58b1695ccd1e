/*!
 * # mdtrans - Markdown-preserving machine translation
 *
 * A Rust library for translating markdown documents with offline MT models
 * while keeping links, code, numbers and placeholders intact.
 *
 * ## Features
 *
 * - Markdown segmentation with reversible placeholder protection
 * - Model routing per language pair:
 *   - Direct bilingual models
 *   - Pivot through English
 *   - Multilingual fallback model with mapped language codes
 * - Glossary enforcement, including terms kept untranslated
 * - Optional LLM post-edit pass through various providers:
 *   - Ollama (local LLM)
 *   - OpenAI API and compatible servers such as LM Studio
 * - Marker and content validation per segment with safe degradation
 * - JSON debug report of every stage
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `translation`: The translation pipeline:
 *   - `translation::segmenter`: Markdown segmentation
 *   - `translation::registry`: Model route resolution
 *   - `translation::mt`: Machine translation with a model cache
 *   - `translation::glossary`: Glossary enforcement
 *   - `translation::postedit`: LLM post-editing
 *   - `translation::pipeline`: Document orchestration
 * - `validation`: Marker and content checks
 * - `file_utils`: File system operations
 * - `app_controller`: Main application controller
 * - `language_utils`: ISO language code utilities
 * - `providers`: Client implementations for LLM providers
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod providers;
pub mod translation;
pub mod validation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use errors::{PostEditError, ProviderError, TranslationError};
pub use language_utils::{LanguageCode, LanguagePair};
pub use translation::{Glossary, TranslationOutput, TranslationPipeline, TranslationRequest};
