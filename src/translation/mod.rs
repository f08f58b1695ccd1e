/*!
 * Markdown translation.
 *
 * This module contains everything between a markdown document and its
 * translation. It is split into several submodules:
 *
 * - `document`: Segment and placeholder model
 * - `segmenter`: Block segmentation and inline span protection
 * - `registry`: Language pair to model route resolution
 * - `models`: Model loading, the model cache and the HTTP inference backend
 * - `mt`: Runs a resolved strategy against cached models
 * - `glossary`: Term enforcement around MT and post-edit
 * - `postedit`: LLM post-edit pass
 * - `pipeline`: Orchestration of a document run
 */

pub mod document;
pub mod glossary;
pub mod models;
pub mod mt;
pub mod pipeline;
pub mod postedit;
pub mod registry;
pub mod segmenter;

// Re-export main types for easier usage
pub use self::document::{Document, Placeholder, PlaceholderKind, PlaceholderMap, Segment, SegmentKind};
pub use self::glossary::{Glossary, GlossaryApplier, GlossaryEntry};
pub use self::models::{HttpModelLoader, ModelCache, ModelLoader, TranslationModel};
pub use self::mt::MtTranslator;
pub use self::pipeline::{PipelineOptions, TranslationOutput, TranslationPipeline, TranslationRequest};
pub use self::postedit::{PostEditOutcome, PostEditSettings, PostEditor};
pub use self::registry::{ModelRegistry, ModelSpec, TranslationStrategy};
pub use self::segmenter::MarkdownSegmenter;
