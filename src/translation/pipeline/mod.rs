/*!
 * Document translation pipeline.
 *
 * - `orchestrator`: runs segmentation, MT, post-edit, validation and reassembly
 * - `strategy_chain`: per-segment fallback from the primary strategy to the fallback model
 * - `report`: optional debug report of every stage
 */

pub mod orchestrator;
pub mod report;
pub mod strategy_chain;

pub use orchestrator::{
    PipelineOptions, PipelinePhase, PipelineProgress, PipelineStats, ProgressCallback, SegmentIssue,
    SegmentSummary, TextSource, TranslationOutput, TranslationPipeline, TranslationRequest, ValidationStatus,
};
pub use report::{DebugReport, SegmentSnapshot};
pub use strategy_chain::{ChainState, StrategyChain, StrategyFailure};
