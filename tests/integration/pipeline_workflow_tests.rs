/*!
 * End-to-end tests of the translation pipeline with mock models and a mock LLM
 */

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use mdtrans::errors::{PostEditError, TranslationError};
use mdtrans::providers::mock::MockProvider;
use mdtrans::translation::pipeline::{
    PipelinePhase, PipelineProgress, SegmentIssue, TextSource, TranslationRequest, ValidationStatus,
};
use mdtrans::translation::{Glossary, MarkdownSegmenter, PostEditSettings, PostEditor, TranslationStrategy};

use crate::common::mock_models::{MockModelBehavior, MockModelLoader};
use crate::common::{init_test_logging, pipeline_with, sample_markdown};

const EN_DE: &str = "Helsinki-NLP/opus-mt-en-de";
const FALLBACK: &str = "facebook/nllb-200-distilled-600M";

fn posteditor(provider: MockProvider, timeout: Duration, max_attempts: u32) -> PostEditor {
    let settings = PostEditSettings {
        timeout,
        max_attempts,
        ..PostEditSettings::default()
    };
    PostEditor::new(Arc::new(provider), settings)
}

#[tokio::test]
async fn test_translate_withSampleDocument_shouldPreserveStructure() {
    init_test_logging();
    let loader = MockModelLoader::new();
    let pipeline = pipeline_with(loader.clone());
    let request = TranslationRequest::new("en", "de", sample_markdown());

    let output = pipeline.translate(&request, &CancellationToken::new()).await.unwrap();

    assert!(output.text.starts_with("---\ntitle: Guide\n---\n# [Helsinki-NLP/opus-mt-en-de] Getting started\n"));
    assert!(output
        .text
        .contains("[[Helsinki-NLP/opus-mt-en-de] the guide](https://example.com/guide)"));
    assert!(output.text.contains("`make build`"));
    assert!(output.text.contains("```sh\nmake build\n```\n"));
    assert!(output.text.contains("12.50"));
    assert!(output.text.ends_with("EUR.\n"));

    let segments = MarkdownSegmenter::new().segment(sample_markdown()).unwrap();
    assert_eq!(output.segments.len(), segments.len());
    assert_eq!(output.stats().flagged, 0);

    // Code blocks and frontmatter never reach a model
    assert!(loader.calls().iter().all(|call| !call.text.contains("title: Guide")));
    assert!(loader.calls().iter().all(|call| !call.text.contains("```")));
}

#[tokio::test]
async fn test_translate_withUnsupportedDirectPair_shouldUseFallbackCodes() {
    let loader = MockModelLoader::new();
    let pipeline = pipeline_with(loader.clone());
    let request = TranslationRequest::new("ja", "pt", "こんにちは世界\n");

    let output = pipeline.translate(&request, &CancellationToken::new()).await.unwrap();

    assert_eq!(output.strategy.name(), "fallback");
    assert_eq!(output.text, "[facebook/nllb-200-distilled-600M] こんにちは世界\n");
    let calls = loader.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].source_code.as_deref(), Some("jpn_Jpan"));
    assert_eq!(calls[0].target_code.as_deref(), Some("por_Latn"));
}

#[tokio::test]
async fn test_translate_withPivotPair_shouldChainThroughEnglish() {
    let pipeline = pipeline_with(MockModelLoader::new());
    let request = TranslationRequest::new("es", "de", "Hola mundo");

    let output = pipeline.translate(&request, &CancellationToken::new()).await.unwrap();

    assert!(matches!(output.strategy, TranslationStrategy::Pivot { .. }));
    assert_eq!(
        output.text,
        "[Helsinki-NLP/opus-mt-en-de] [Helsinki-NLP/opus-mt-es-en] Hola mundo"
    );
}

#[tokio::test]
async fn test_translate_withPivotDisabled_shouldUseFallbackModel() {
    let loader = MockModelLoader::new();
    let pipeline = pipeline_with(loader.clone());
    let mut request = TranslationRequest::new("es", "de", "Hola mundo");
    request.options.allow_pivot = false;

    let output = pipeline.translate(&request, &CancellationToken::new()).await.unwrap();

    assert!(output.strategy.is_fallback());
    assert_eq!(loader.calls()[0].source_code.as_deref(), Some("spa_Latn"));
}

#[tokio::test]
async fn test_translate_withMissingDirectModel_shouldRetrySegmentsWithFallback() {
    let loader = MockModelLoader::new().with_missing(EN_DE);
    let pipeline = pipeline_with(loader.clone());
    let request = TranslationRequest::new("en", "de", "One\n\nTwo\n");

    let output = pipeline.translate(&request, &CancellationToken::new()).await.unwrap();

    assert_eq!(output.text, format!("[{0}] One\n\n[{0}] Two\n", FALLBACK));
    let translated: Vec<_> = output.segments.iter().filter(|s| s.kind.is_translatable()).collect();
    assert!(translated
        .iter()
        .all(|s| matches!(s.issues.first(), Some(SegmentIssue::StrategyRetried { .. }))));
    assert_eq!(output.stats().translated, 2);
}

#[tokio::test]
async fn test_translate_withEveryModelMissing_shouldLoadEachModelOnlyOnce() {
    let loader = MockModelLoader::new().with_missing(EN_DE).with_missing(FALLBACK);
    let pipeline = pipeline_with(loader.clone());
    let text: String = (1..=10).map(|i| format!("Paragraph {}\n\n", i)).collect();
    let mut request = TranslationRequest::new("en", "de", text.as_str());
    request.options.max_concurrent_segments = 1;

    let output = pipeline.translate(&request, &CancellationToken::new()).await.unwrap();

    assert_eq!(output.text, text);
    assert_eq!(output.stats().untranslated, 10);
    // One failed load per model for the whole run, not one per segment
    assert_eq!(loader.load_count(), 2);
    assert!(pipeline.translator().cache().is_failed(EN_DE));
    assert!(pipeline.translator().cache().is_failed(FALLBACK));
}

#[tokio::test]
async fn test_translate_withModelDroppingMarkers_shouldEmitRawSegment() {
    let loader = MockModelLoader::new().with_behavior(EN_DE, MockModelBehavior::DropMarkers);
    let pipeline = pipeline_with(loader);
    let request = TranslationRequest::new("en", "de", "Run `cargo test` now\n\nPlain text\n");

    let output = pipeline.translate(&request, &CancellationToken::new()).await.unwrap();

    assert_eq!(
        output.text,
        "Run `cargo test` now\n\n[Helsinki-NLP/opus-mt-en-de] Plain text\n"
    );
    let failed = &output.segments[0];
    assert_eq!(failed.validation_status, ValidationStatus::Failed);
    assert_eq!(failed.text_source, TextSource::Raw);
    assert!(matches!(
        &failed.issues[0],
        SegmentIssue::ValidationFailure { stage, .. } if stage == "mt"
    ));
    assert_eq!(output.stats().untranslated, 1);
}

#[tokio::test]
async fn test_translate_withReorderedMarkers_shouldKeepMtAndFlag() {
    let loader = MockModelLoader::new().with_behavior(EN_DE, MockModelBehavior::ReverseMarkers);
    let pipeline = pipeline_with(loader);
    let request = TranslationRequest::new("en", "de", "Use `a` before `b` here");

    let output = pipeline.translate(&request, &CancellationToken::new()).await.unwrap();

    assert_eq!(output.text, "[Helsinki-NLP/opus-mt-en-de] Use `b` before `a` here");
    let summary = &output.segments[0];
    assert_eq!(summary.validation_status, ValidationStatus::Reordered);
    assert_eq!(summary.text_source, TextSource::Mt);
    assert!(summary.is_flagged());
}

#[tokio::test]
async fn test_translate_withGlossary_shouldEnforceTerms() {
    let loader = MockModelLoader::new();
    let pipeline = pipeline_with(loader.clone());
    let glossary = Glossary::from_entries([("pipeline", "Pipeline-DE"), ("Rust", "KEEP")]);
    let request = TranslationRequest::new("en", "de", "Rust makes the pipeline fast").with_glossary(glossary);

    let output = pipeline.translate(&request, &CancellationToken::new()).await.unwrap();

    assert_eq!(loader.calls()[0].text, "__GL0__ makes the __GL1__ fast");
    assert_eq!(
        output.text,
        "[Helsinki-NLP/opus-mt-en-de] Rust makes the Pipeline-DE fast"
    );
}

#[tokio::test]
async fn test_translate_withWorkingPostEditor_shouldUsePostEditedText() {
    let provider = MockProvider::working();
    let pipeline = pipeline_with(MockModelLoader::new())
        .with_posteditor(posteditor(provider.clone(), Duration::from_secs(5), 2));
    let request = TranslationRequest::new("en", "de", "Read `README.md` first");

    let output = pipeline.translate(&request, &CancellationToken::new()).await.unwrap();

    assert_eq!(
        output.text,
        "[polished] [Helsinki-NLP/opus-mt-en-de] Read `README.md` first"
    );
    assert_eq!(output.segments[0].text_source, TextSource::PostEdit);
    assert_eq!(output.segments[0].validation_status, ValidationStatus::Passed);
    assert_eq!(output.segments[0].postedit_attempts, 1);
    assert_eq!(provider.request_count(), 1);
    assert!(provider.prompts()[0].contains("__PH0__"));
}

#[tokio::test]
async fn test_translate_withPostEditDisabledInOptions_shouldSkipLlm() {
    let provider = MockProvider::working();
    let pipeline = pipeline_with(MockModelLoader::new())
        .with_posteditor(posteditor(provider.clone(), Duration::from_secs(5), 2));
    let mut request = TranslationRequest::new("en", "de", "Hello");
    request.options.postedit = false;

    let output = pipeline.translate(&request, &CancellationToken::new()).await.unwrap();

    assert_eq!(output.segments[0].text_source, TextSource::Mt);
    assert_eq!(provider.request_count(), 0);
}

#[tokio::test]
async fn test_translate_withTimingOutPostEditor_shouldKeepMtAndRecordFailures() {
    init_test_logging();
    let provider = MockProvider::slow(2000);
    let pipeline = pipeline_with(MockModelLoader::new())
        .with_posteditor(posteditor(provider.clone(), Duration::from_millis(20), 2));
    let request = TranslationRequest::new("en", "de", "Hello world");

    let output = pipeline.translate(&request, &CancellationToken::new()).await.unwrap();

    assert_eq!(output.text, "[Helsinki-NLP/opus-mt-en-de] Hello world");
    let summary = &output.segments[0];
    assert_eq!(summary.text_source, TextSource::Mt);
    assert_eq!(summary.validation_status, ValidationStatus::PostEditRejected);
    assert_eq!(summary.postedit_attempts, 2);
    let timeout_message = PostEditError::Timeout(Duration::from_millis(20)).to_string();
    assert_eq!(
        summary
            .issues
            .iter()
            .filter(|i| matches!(i, SegmentIssue::PostEditFailure { message } if *message == timeout_message))
            .count(),
        2
    );
}

#[tokio::test]
async fn test_translate_withPostEditorDroppingMarkers_shouldRejectAnswer() {
    let provider = MockProvider::drop_markers();
    let pipeline = pipeline_with(MockModelLoader::new())
        .with_posteditor(posteditor(provider.clone(), Duration::from_secs(5), 2));
    let request = TranslationRequest::new("en", "de", "Open [the docs](https://docs.rs) now");

    let output = pipeline.translate(&request, &CancellationToken::new()).await.unwrap();

    let summary = &output.segments[0];
    assert_eq!(summary.text_source, TextSource::Mt);
    assert_eq!(summary.validation_status, ValidationStatus::PostEditRejected);
    assert!(summary.postedit_text.is_none());
    assert!(output.text.contains("](https://docs.rs)"));
    // The second attempt switches to the strict prompt
    let prompts = provider.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(!prompts[0].contains("return the MT draft verbatim"));
    assert!(prompts[1].contains("return the MT draft verbatim"));
}

#[tokio::test]
async fn test_translate_withConcurrentSegments_shouldKeepSourceOrder() {
    // The first paragraph finishes last
    let loader = MockModelLoader::new().with_delay(|text| {
        Duration::from_millis(if text.contains("first") { 80 } else { 5 })
    });
    let pipeline = pipeline_with(loader.clone());
    let text = "The first one\n\nSecond\n\nThird\n\nFourth\n\nFifth\n";
    let mut request = TranslationRequest::new("en", "de", text);
    request.options.max_concurrent_segments = 4;

    let output = pipeline.translate(&request, &CancellationToken::new()).await.unwrap();

    let expected: String = ["The first one", "Second", "Third", "Fourth", "Fifth"]
        .iter()
        .map(|p| format!("[{}] {}\n", EN_DE, p))
        .collect::<Vec<_>>()
        .join("\n");
    assert_eq!(output.text, expected);
    assert_ne!(loader.calls()[0].text, "The first one");
    let ids: Vec<usize> = output.segments.iter().map(|s| s.id).collect();
    assert!(ids.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test]
async fn test_translate_withSeveralSegments_shouldLoadModelOnce() {
    let loader = MockModelLoader::new();
    let pipeline = pipeline_with(loader.clone());
    let request = TranslationRequest::new("en", "de", "A\n\nB\n\nC\n\nD\n");

    pipeline.translate(&request, &CancellationToken::new()).await.unwrap();
    pipeline.translate(&request, &CancellationToken::new()).await.unwrap();

    assert_eq!(loader.load_count(), 1);
    assert_eq!(loader.calls().len(), 8);
    assert!(pipeline.translator().cache().contains(EN_DE));
}

#[tokio::test]
async fn test_translate_withCancelledToken_shouldReturnCancelled() {
    let loader = MockModelLoader::new();
    let pipeline = pipeline_with(loader.clone());
    let request = TranslationRequest::new("en", "de", "Hello");
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = pipeline.translate(&request, &cancel).await.unwrap_err();

    assert!(matches!(err, TranslationError::Cancelled));
    assert_eq!(loader.load_count(), 0);
}

#[tokio::test]
async fn test_translate_withCancelDuringRun_shouldStopPromptly() {
    let loader = MockModelLoader::new().with_delay(|_| Duration::from_secs(10));
    let pipeline = pipeline_with(loader);
    let request = TranslationRequest::new("en", "de", "One\n\nTwo\n");
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        trigger.cancel();
    });

    let result = tokio::time::timeout(Duration::from_secs(2), pipeline.translate(&request, &cancel))
        .await
        .expect("cancellation should not wait for the models");
    assert!(matches!(result, Err(TranslationError::Cancelled)));
}

#[tokio::test]
async fn test_translate_withProgressCallback_shouldReportPhasesInOrder() {
    let pipeline = pipeline_with(MockModelLoader::new());
    let request = TranslationRequest::new("en", "de", "One\n\nTwo\n");
    let phases = Mutex::new(Vec::new());
    let on_progress = |progress: PipelineProgress| phases.lock().push(progress.phase);

    pipeline
        .translate_with_progress(&request, &CancellationToken::new(), Some(&on_progress))
        .await
        .unwrap();

    let mut seen = phases.into_inner();
    seen.dedup();
    assert_eq!(
        seen,
        vec![
            PipelinePhase::Segmenting,
            PipelinePhase::StrategyResolved,
            PipelinePhase::Translating,
            PipelinePhase::Validating,
            PipelinePhase::Reassembling,
            PipelinePhase::Done,
        ]
    );
}

#[tokio::test]
async fn test_translate_withDebugFlag_shouldSnapshotEveryStage() {
    let provider = MockProvider::working();
    let pipeline = pipeline_with(MockModelLoader::new())
        .with_posteditor(posteditor(provider, Duration::from_secs(5), 1));
    let mut request = TranslationRequest::new("en", "de", "Costs 42% today\n\n```\ncode\n```\n");
    request.options.debug = true;

    let output = pipeline.translate(&request, &CancellationToken::new()).await.unwrap();
    let report = output.report.expect("debug report requested");

    assert_eq!(report.segments.len(), output.segments.len());
    assert!(report.postedit_enabled);
    let first = &report.segments[0];
    assert_eq!(first.protected_text, "Costs __PH0__ today");
    assert!(first.mt_text.is_some());
    assert!(first.postedit_text.is_some());

    let json: serde_json::Value = serde_json::from_str(&report.to_json_pretty().unwrap()).unwrap();
    assert_eq!(json["segments"][0]["placeholder_map"][0]["original"], "42%");
    assert_eq!(json["target_language"], "de");
}

#[tokio::test]
async fn test_translate_withDebugToggled_shouldProduceSameOutcome() {
    let provider = MockProvider::working();
    let pipeline = pipeline_with(MockModelLoader::new())
        .with_posteditor(posteditor(provider, Duration::from_secs(5), 2));
    let glossary = Glossary::from_entries([("guide", "Leitfaden")]);
    let plain = TranslationRequest::new("en", "de", sample_markdown()).with_glossary(glossary);
    let mut debug = plain.clone();
    debug.options.debug = true;

    let without = pipeline.translate(&plain, &CancellationToken::new()).await.unwrap();
    let with = pipeline.translate(&debug, &CancellationToken::new()).await.unwrap();

    assert!(without.report.is_none());
    assert!(with.report.is_some());
    assert_eq!(without.text, with.text);
    assert_eq!(without.segments, with.segments);
    assert_eq!(without.strategy, with.strategy);
}
