/*!
 * Pipeline orchestrator for markdown document translation.
 *
 * A document run moves through these phases:
 * 1. Segmenting: split into segments, protect inline spans
 * 2. StrategyResolved: resolve the model route for the language pair
 * 3. Translating: MT per segment (and link label), with strategy fallback
 * 4. PostEditing: optional LLM pass over restorable MT output
 * 5. Validating: marker and content checks, final text selection
 * 6. Reassembling: concatenate final texts in source order
 *
 * Segment failures never abort the document; they are recorded as issues on
 * the segment and the last known good text is emitted.
 */

use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

use crate::errors::TranslationError;
use crate::language_utils::LanguagePair;
use crate::providers::SamplingParams;
use crate::translation::document::{Document, Segment, SegmentKind, has_translatable_text, placeholder_marker};
use crate::translation::glossary::{Glossary, GlossaryApplier, GlossaryMatch, GlossaryProtected};
use crate::translation::mt::MtTranslator;
use crate::translation::postedit::{PostEditOutcome, PostEditor};
use crate::translation::registry::{ModelRegistry, TranslationStrategy};
use crate::translation::segmenter::MarkdownSegmenter;
use crate::validation::content::ContentValidator;
use crate::validation::markers::{MarkerValidationResult, MarkerValidator, extract_markers};

use super::report::{DebugReport, SegmentSnapshot};
use super::strategy_chain::StrategyChain;

/// Phases of a document run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelinePhase {
    Segmenting,
    StrategyResolved,
    Translating,
    PostEditing,
    Validating,
    Reassembling,
    Done,
}

impl std::fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Segmenting => "segmenting",
            Self::StrategyResolved => "strategy resolved",
            Self::Translating => "translating",
            Self::PostEditing => "post-editing",
            Self::Validating => "validating",
            Self::Reassembling => "reassembling",
            Self::Done => "done",
        };
        write!(f, "{}", name)
    }
}

/// Progress within the current phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineProgress {
    pub phase: PipelinePhase,
    pub completed: usize,
    pub total: usize,
}

/// Progress sink called from the pipeline task
pub type ProgressCallback<'a> = &'a (dyn Fn(PipelineProgress) + Send + Sync);

/// Per-request pipeline options
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Route through English when no direct model exists
    pub allow_pivot: bool,
    /// Run the LLM post-edit pass (needs a post-editor)
    pub postedit: bool,
    pub sampling: SamplingParams,
    /// Build a debug report
    pub debug: bool,
    pub max_concurrent_segments: usize,
    pub translate_link_labels: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            allow_pivot: true,
            postedit: true,
            sampling: SamplingParams::default(),
            debug: false,
            max_concurrent_segments: 4,
            translate_link_labels: true,
        }
    }
}

/// One document to translate
#[derive(Debug, Clone)]
pub struct TranslationRequest {
    pub source_language: String,
    pub target_language: String,
    pub text: String,
    pub glossary: Option<Glossary>,
    pub options: PipelineOptions,
}

impl TranslationRequest {
    pub fn new(source_language: impl Into<String>, target_language: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source_language: source_language.into(),
            target_language: target_language.into(),
            text: text.into(),
            glossary: None,
            options: PipelineOptions::default(),
        }
    }

    pub fn with_glossary(mut self, glossary: Glossary) -> Self {
        self.glossary = Some(glossary);
        self
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }
}

/// Where the final text of a segment comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextSource {
    Raw,
    Mt,
    PostEdit,
}

/// Marker integrity of the final text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    /// Every marker once, in source order
    Passed,
    /// Every marker once, but reordered
    Reordered,
    /// Every post-edit attempt was rejected; the MT text passed and was kept
    PostEditRejected,
    /// MT output lost or duplicated markers; raw text emitted
    Failed,
    /// Nothing was sent to a model
    NotTranslated,
}

/// Non-fatal problem recorded on a segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SegmentIssue {
    /// Every strategy failed; the segment is emitted untranslated
    TranslationFailure { strategy: String, message: String },
    /// A strategy failed and a later one succeeded
    StrategyRetried { strategy: String, message: String },
    /// Marker check failed on `stage` output
    ValidationFailure { stage: String, message: String },
    /// A post-edit attempt was rejected
    PostEditFailure { message: String },
    /// A link label kept its original text
    LinkLabelFailure { marker: String, message: String },
    /// Numbers or link targets differ between source and final text
    ContentMismatch { message: String },
}

/// Result of one segment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentSummary {
    pub id: usize,
    pub kind: SegmentKind,
    /// Strategy that produced the translation
    pub strategy: Option<String>,
    /// MT output with markers
    pub mt_text: Option<String>,
    /// Accepted post-edit output with markers
    pub postedit_text: Option<String>,
    pub postedit_attempts: u32,
    pub final_text: String,
    pub text_source: TextSource,
    pub validation_status: ValidationStatus,
    pub issues: Vec<SegmentIssue>,
}

impl SegmentSummary {
    fn untouched(segment: &Segment) -> Self {
        Self {
            id: segment.id,
            kind: segment.kind,
            strategy: None,
            mt_text: None,
            postedit_text: None,
            postedit_attempts: 0,
            final_text: segment.raw_text.clone(),
            text_source: TextSource::Raw,
            validation_status: ValidationStatus::NotTranslated,
            issues: Vec::new(),
        }
    }

    pub fn is_flagged(&self) -> bool {
        !self.issues.is_empty()
    }
}

/// Counts over a finished run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub segments: usize,
    pub translated: usize,
    pub post_edited: usize,
    pub untranslated: usize,
    pub flagged: usize,
}

impl PipelineStats {
    pub fn summary(&self) -> String {
        format!(
            "{} segments: {} translated, {} post-edited, {} left untranslated, {} flagged",
            self.segments, self.translated, self.post_edited, self.untranslated, self.flagged
        )
    }
}

/// Result of a document run
#[derive(Debug, Clone)]
pub struct TranslationOutput {
    pub text: String,
    pub segments: Vec<SegmentSummary>,
    pub strategy: TranslationStrategy,
    pub report: Option<DebugReport>,
}

impl TranslationOutput {
    pub fn stats(&self) -> PipelineStats {
        let translatable: Vec<&SegmentSummary> = self.segments.iter().filter(|s| s.kind.is_translatable()).collect();
        PipelineStats {
            segments: self.segments.len(),
            translated: translatable.iter().filter(|s| s.text_source != TextSource::Raw).count(),
            post_edited: translatable
                .iter()
                .filter(|s| s.text_source == TextSource::PostEdit)
                .count(),
            untranslated: translatable
                .iter()
                .filter(|s| s.text_source == TextSource::Raw && s.is_flagged())
                .count(),
            flagged: self.segments.iter().filter(|s| s.is_flagged()).count(),
        }
    }
}

/// MT stage output of one segment
#[derive(Debug, Default)]
struct MtStage {
    index: usize,
    glossary: GlossaryProtected,
    /// Marker sequence sent to the model
    expected: Vec<String>,
    /// The body was sent to a model
    attempted: bool,
    strategy: Option<TranslationStrategy>,
    mt_text: Option<String>,
    labels: HashMap<usize, String>,
    issues: Vec<SegmentIssue>,
    postedit: Option<PostEditOutcome>,
}

impl MtStage {
    fn is_restorable(&self) -> bool {
        self.mt_text
            .as_deref()
            .is_some_and(|mt| MarkerValidator::validate(&self.expected, mt).restorable())
    }
}

/// Context shared by the segment tasks of one run
struct RunContext<'a> {
    strategy: &'a TranslationStrategy,
    fallback: Option<&'a TranslationStrategy>,
    applier: &'a GlossaryApplier,
    options: &'a PipelineOptions,
}

/// The markdown translation pipeline
pub struct TranslationPipeline {
    segmenter: MarkdownSegmenter,
    registry: ModelRegistry,
    translator: MtTranslator,
    posteditor: Option<PostEditor>,
}

impl TranslationPipeline {
    pub fn new(segmenter: MarkdownSegmenter, registry: ModelRegistry, translator: MtTranslator) -> Self {
        Self {
            segmenter,
            registry,
            translator,
            posteditor: None,
        }
    }

    pub fn with_posteditor(mut self, posteditor: PostEditor) -> Self {
        self.posteditor = Some(posteditor);
        self
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn translator(&self) -> &MtTranslator {
        &self.translator
    }

    pub fn posteditor(&self) -> Option<&PostEditor> {
        self.posteditor.as_ref()
    }

    /// Validate the pair and resolve its strategy without calling any model
    pub fn resolve(
        &self,
        source_language: &str,
        target_language: &str,
        allow_pivot: bool,
    ) -> Result<(LanguagePair, TranslationStrategy), TranslationError> {
        let pair = LanguagePair::new(source_language, target_language)?;
        let strategy = self.registry.resolve(&pair, allow_pivot)?;
        Ok((pair, strategy))
    }

    /// Load the models of the resolved strategy
    pub async fn prefetch(
        &self,
        source_language: &str,
        target_language: &str,
        allow_pivot: bool,
    ) -> Result<TranslationStrategy, TranslationError> {
        let (_, strategy) = self.resolve(source_language, target_language, allow_pivot)?;
        info!("Prefetching models for {}", strategy);
        self.translator.prefetch(&strategy).await?;
        Ok(strategy)
    }

    pub async fn translate(
        &self,
        request: &TranslationRequest,
        cancel: &CancellationToken,
    ) -> Result<TranslationOutput, TranslationError> {
        self.translate_with_progress(request, cancel, None).await
    }

    /// Translate a document. Cancellation drops in-flight segment work and
    /// returns `Cancelled` without partial output.
    pub async fn translate_with_progress(
        &self,
        request: &TranslationRequest,
        cancel: &CancellationToken,
        progress: Option<ProgressCallback<'_>>,
    ) -> Result<TranslationOutput, TranslationError> {
        if cancel.is_cancelled() {
            return Err(TranslationError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("Translation cancelled");
                Err(TranslationError::Cancelled)
            }
            result = self.run(request, cancel, progress) => result,
        }
    }

    async fn run(
        &self,
        request: &TranslationRequest,
        cancel: &CancellationToken,
        progress: Option<ProgressCallback<'_>>,
    ) -> Result<TranslationOutput, TranslationError> {
        let options = &request.options;
        let concurrency = options.max_concurrent_segments.max(1);
        let enter = |phase: PipelinePhase, total: usize| {
            debug!("Pipeline phase: {}", phase);
            if let Some(callback) = progress {
                callback(PipelineProgress {
                    phase,
                    completed: 0,
                    total,
                });
            }
        };
        let advance = |phase: PipelinePhase, completed: usize, total: usize| {
            if let Some(callback) = progress {
                callback(PipelineProgress { phase, completed, total });
            }
        };

        enter(PipelinePhase::Segmenting, 0);
        let pair = LanguagePair::new(&request.source_language, &request.target_language)?;
        let document = Document::new(request.text.as_str(), pair.source.clone());
        let segments = self.segmenter.segment(document.text())?;
        debug!("Split document into {} segments", segments.len());

        let strategy = self.registry.resolve(&pair, options.allow_pivot)?;
        let fallback = self.registry.fallback_strategy(&pair).ok();
        enter(PipelinePhase::StrategyResolved, 0);
        info!("Translating {} using {}", pair, strategy);

        let applier = GlossaryApplier::new(request.glossary.as_ref());
        let context = RunContext {
            strategy: &strategy,
            fallback: fallback.as_ref(),
            applier: &applier,
            options,
        };

        let work: Vec<usize> = segments
            .iter()
            .enumerate()
            .filter(|(_, segment)| {
                segment.needs_translation()
                    || (segment.is_translatable() && options.translate_link_labels && segment.link_labels().next().is_some())
            })
            .map(|(i, _)| i)
            .collect();

        enter(PipelinePhase::Translating, work.len());
        let mut stages: Vec<MtStage> = Vec::with_capacity(work.len());
        {
            let mut pending = stream::iter(work.iter().map(|&i| self.machine_translate(i, &segments[i], &context)))
                .buffer_unordered(concurrency);
            while let Some(stage) = pending.next().await {
                stages.push(stage);
                advance(PipelinePhase::Translating, stages.len(), work.len());
            }
        }
        stages.sort_by_key(|stage| stage.index);

        if let Some(posteditor) = self.posteditor.as_ref().filter(|_| options.postedit) {
            let targets: Vec<usize> = stages
                .iter()
                .enumerate()
                .filter(|(_, stage)| stage.is_restorable())
                .map(|(pos, _)| pos)
                .collect();
            enter(PipelinePhase::PostEditing, targets.len());

            let mut outcomes = Vec::with_capacity(targets.len());
            {
                let stages_ref = &stages;
                let mut pending = stream::iter(targets.iter().map(|&pos| async move {
                    let stage = &stages_ref[pos];
                    let mt_text = stage.mt_text.as_deref().unwrap_or_default();
                    let outcome = posteditor
                        .postedit_with_sampling(&stage.glossary.text, mt_text, &stage.glossary, &options.sampling, cancel)
                        .await;
                    (pos, outcome)
                }))
                .buffer_unordered(concurrency);
                while let Some(result) = pending.next().await {
                    outcomes.push(result);
                    advance(PipelinePhase::PostEditing, outcomes.len(), targets.len());
                }
            }
            for (pos, outcome) in outcomes {
                stages[pos].postedit = Some(outcome);
            }
        }

        enter(PipelinePhase::Validating, segments.len());
        let mut stages_by_index: HashMap<usize, MtStage> = stages.into_iter().map(|s| (s.index, s)).collect();
        let mut summaries = Vec::with_capacity(segments.len());
        let mut report = options.debug.then(|| {
            DebugReport::new(
                &document,
                pair.target.as_str(),
                strategy.clone(),
                self.posteditor
                    .as_ref()
                    .filter(|_| options.postedit)
                    .map(PostEditor::generator_name),
            )
        });

        for (i, segment) in segments.iter().enumerate() {
            let stage = stages_by_index.remove(&i);
            let (summary, glossary_matches, marker_check) = finalize(segment, stage, &applier);
            if summary.is_flagged() {
                warn!("Segment {} ({:?}) flagged: {:?}", segment.id, segment.kind, summary.issues);
            }
            if let Some(report) = report.as_mut() {
                report.push(SegmentSnapshot::new(segment, &summary, glossary_matches, marker_check));
            }
            summaries.push(summary);
        }

        enter(PipelinePhase::Reassembling, 0);
        let text: String = summaries.iter().map(|s| s.final_text.as_str()).collect();

        let output = TranslationOutput {
            text,
            segments: summaries,
            strategy,
            report,
        };
        enter(PipelinePhase::Done, 0);
        info!("Translation finished: {}", output.stats().summary());
        Ok(output)
    }

    /// MT for one segment body and its link labels
    async fn machine_translate(&self, index: usize, segment: &Segment, context: &RunContext<'_>) -> MtStage {
        let glossary = context.applier.protect(&segment.protected_text);
        let mut stage = MtStage {
            index,
            expected: extract_markers(&glossary.text),
            glossary,
            ..MtStage::default()
        };

        let mut label_strategy = context.strategy.clone();
        if segment.needs_translation() {
            stage.attempted = true;
            let mut chain = StrategyChain::new(context.strategy.clone(), context.fallback.cloned());
            let text = stage.glossary.text.as_str();
            let translator = &self.translator;
            let result = chain
                .run(move |strategy| async move { translator.translate(&strategy, text).await })
                .await;

            match result {
                Some((used, output)) => {
                    stage.issues.extend(chain.failures().iter().map(|f| SegmentIssue::StrategyRetried {
                        strategy: f.strategy.clone(),
                        message: f.message.clone(),
                    }));
                    label_strategy = used.clone();
                    stage.strategy = Some(used);
                    stage.mt_text = Some(output.trim().to_string());
                }
                None => {
                    stage.issues.extend(chain.failures().iter().map(|f| SegmentIssue::TranslationFailure {
                        strategy: f.strategy.clone(),
                        message: f.message.clone(),
                    }));
                    return stage;
                }
            }
        }

        if context.options.translate_link_labels {
            for (index, link) in segment.link_labels() {
                match self.translate_label(&link.label, &label_strategy, context.applier).await {
                    Ok(label) => {
                        stage.labels.insert(index, label);
                    }
                    Err(message) => {
                        debug!("Keeping original label of {}: {}", placeholder_marker(index), message);
                        stage.issues.push(SegmentIssue::LinkLabelFailure {
                            marker: placeholder_marker(index),
                            message,
                        });
                    }
                }
            }
            if stage.strategy.is_none() && !stage.labels.is_empty() {
                stage.strategy = Some(label_strategy);
            }
        }

        stage
    }

    /// Translate a link label as its own unit
    async fn translate_label(
        &self,
        label: &str,
        strategy: &TranslationStrategy,
        applier: &GlossaryApplier,
    ) -> Result<String, String> {
        let protected = self.segmenter.protect(label);
        let glossary = applier.protect(&protected.text);
        if !has_translatable_text(&glossary.text) {
            return Ok(label.to_string());
        }

        let output = self
            .translator
            .translate(strategy, &glossary.text)
            .await
            .map_err(|e| e.to_string())?;
        let output = output.trim();

        let check = MarkerValidator::validate(&extract_markers(&glossary.text), output);
        if !check.restorable() {
            return Err(check
                .error_message
                .unwrap_or_else(|| "label markers changed".to_string()));
        }

        Ok(protected.placeholders.restore(&applier.restore(output, &glossary)))
    }
}

/// Pick the final text of a segment and record its checks
fn finalize(
    segment: &Segment,
    stage: Option<MtStage>,
    applier: &GlossaryApplier,
) -> (SegmentSummary, Vec<GlossaryMatch>, Option<MarkerValidationResult>) {
    let mut summary = SegmentSummary::untouched(segment);
    let Some(stage) = stage else {
        return (summary, Vec::new(), None);
    };

    summary.strategy = stage.strategy.as_ref().map(ToString::to_string);
    summary.issues = stage.issues;

    let Some(mt_text) = stage.mt_text else {
        // Body failed, or only link labels needed translation
        if !stage.attempted && !stage.labels.is_empty() {
            summary.final_text = segment
                .placeholders
                .restore_with_labels(&segment.protected_text, &stage.labels);
            summary.text_source = TextSource::Mt;
            summary.validation_status = ValidationStatus::Passed;
        }
        return (summary, stage.glossary.matches, None);
    };
    summary.mt_text = Some(mt_text.clone());

    let mt_check = MarkerValidator::validate(&stage.expected, &mt_text);
    if !mt_check.restorable() {
        summary.issues.push(SegmentIssue::ValidationFailure {
            stage: "mt".to_string(),
            message: mt_check
                .error_message
                .clone()
                .unwrap_or_else(|| "markers changed".to_string()),
        });
        summary.validation_status = ValidationStatus::Failed;
        return (summary, stage.glossary.matches, Some(mt_check));
    }

    let mut marked = mt_text;
    let mut postedit_rejected = false;
    summary.text_source = TextSource::Mt;
    if let Some(outcome) = stage.postedit {
        postedit_rejected = !outcome.succeeded() && !outcome.errors.is_empty();
        summary.postedit_attempts = outcome.attempts;
        summary
            .issues
            .extend(outcome.errors.iter().map(|e| SegmentIssue::PostEditFailure { message: e.to_string() }));
        if let Some(edited) = outcome.text {
            summary.postedit_text = Some(edited.clone());
            summary.text_source = TextSource::PostEdit;
            marked = edited;
        }
    }

    let final_check = MarkerValidator::validate(&stage.expected, &marked);
    summary.validation_status = if final_check.passed() {
        if postedit_rejected {
            ValidationStatus::PostEditRejected
        } else {
            ValidationStatus::Passed
        }
    } else {
        summary.issues.push(SegmentIssue::ValidationFailure {
            stage: "order".to_string(),
            message: final_check
                .error_message
                .clone()
                .unwrap_or_else(|| "markers reordered".to_string()),
        });
        ValidationStatus::Reordered
    };

    summary.final_text = segment
        .placeholders
        .restore_with_labels(&applier.restore(&marked, &stage.glossary), &stage.labels);

    let content = ContentValidator::check(&segment.raw_text, &summary.final_text);
    if !content.passed() {
        summary.issues.push(SegmentIssue::ContentMismatch {
            message: content.describe(),
        });
    }

    (summary, stage.glossary.matches, Some(final_check))
}
