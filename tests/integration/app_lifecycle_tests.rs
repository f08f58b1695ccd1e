/*!
 * Full application lifecycle tests: file in, translated file and report out
 */

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use mdtrans::app_config::Config;
use mdtrans::app_controller::{Controller, RunOptions};
use mdtrans::providers::mock::MockProvider;
use mdtrans::translation::{PostEditSettings, PostEditor};

use crate::common::mock_models::MockModelLoader;
use crate::common::{create_temp_dir, create_test_file, init_test_logging, pipeline_with, sample_markdown};

#[tokio::test]
async fn test_run_withInputFile_shouldWriteOutputNextToInput() {
    init_test_logging();
    let dir = create_temp_dir().unwrap();
    let input = create_test_file(dir.path(), "guide.md", sample_markdown()).unwrap();
    let controller = Controller::new_for_test().unwrap();
    let pipeline = pipeline_with(MockModelLoader::new());

    let options = RunOptions {
        input: input.clone(),
        ..RunOptions::default()
    };
    let summary = controller
        .run_with_pipeline(&pipeline, options, CancellationToken::new())
        .await
        .unwrap();

    let output_path = summary.output_path.unwrap();
    assert_eq!(output_path, dir.path().join("guide.de.md"));
    let written = std::fs::read_to_string(&output_path).unwrap();
    assert!(written.contains("# [Helsinki-NLP/opus-mt-en-de] Getting started"));
    assert!(summary.report_path.is_none());
    assert_eq!(summary.stats.flagged, 0);
    // The source file is left alone
    assert_eq!(std::fs::read_to_string(&input).unwrap(), sample_markdown());
}

#[tokio::test]
async fn test_run_withDebugAndGlossary_shouldWriteReport() {
    let dir = create_temp_dir().unwrap();
    let input = create_test_file(dir.path(), "notes.md", "The pipeline is fast.\n").unwrap();
    let glossary = create_test_file(dir.path(), "terms.json", r#"{"pipeline": "Pipeline-DE"}"#).unwrap();
    let output = dir.path().join("out").join("notes.md");
    let controller = Controller::new_for_test().unwrap();
    let pipeline = pipeline_with(MockModelLoader::new());

    let options = RunOptions {
        input,
        output: Some(output.clone()),
        glossary: Some(glossary),
        debug: true,
        prefetch_only: false,
    };
    let summary = controller
        .run_with_pipeline(&pipeline, options, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        std::fs::read_to_string(&output).unwrap(),
        "[Helsinki-NLP/opus-mt-en-de] The Pipeline-DE is fast.\n"
    );
    let report_path = summary.report_path.unwrap();
    assert_eq!(report_path, dir.path().join("out").join("notes.md.debug.json"));
    let report: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(report_path).unwrap()).unwrap();
    assert_eq!(report["segments"][0]["glossary_matches"][0]["rendering"], "Pipeline-DE");
    assert_eq!(report["source_language"], "en");
}

#[tokio::test]
async fn test_run_withUnreachableLlm_shouldFinishWithoutPostEdit() {
    let dir = create_temp_dir().unwrap();
    let input = create_test_file(dir.path(), "a.md", "Hello\n").unwrap();
    let controller = Controller::new_for_test().unwrap();
    let provider = MockProvider::failing();
    let posteditor = PostEditor::new(Arc::new(provider.clone()), PostEditSettings::default());
    let pipeline = pipeline_with(MockModelLoader::new()).with_posteditor(posteditor);

    let options = RunOptions {
        input,
        ..RunOptions::default()
    };
    let summary = controller
        .run_with_pipeline(&pipeline, options, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.stats.post_edited, 0);
    assert_eq!(summary.stats.translated, 1);
    assert_eq!(provider.request_count(), 0);
}

#[tokio::test]
async fn test_run_withMissingInput_shouldFail() {
    let dir = create_temp_dir().unwrap();
    let controller = Controller::new_for_test().unwrap();
    let pipeline = pipeline_with(MockModelLoader::new());

    let options = RunOptions {
        input: dir.path().join("nope.md"),
        ..RunOptions::default()
    };
    let result = controller
        .run_with_pipeline(&pipeline, options, CancellationToken::new())
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_run_withSameLanguages_shouldFailBeforeWriting() {
    let dir = create_temp_dir().unwrap();
    let input = create_test_file(dir.path(), "a.md", "Hello\n").unwrap();
    let config = Config {
        target_language: "en".to_string(),
        ..Config::default()
    };
    let controller = Controller::with_config(config).unwrap();
    let loader = MockModelLoader::new();
    let pipeline = pipeline_with(loader.clone());

    let options = RunOptions {
        input,
        ..RunOptions::default()
    };
    let result = controller
        .run_with_pipeline(&pipeline, options, CancellationToken::new())
        .await;

    assert!(result.is_err());
    assert!(!dir.path().join("a.en.md").exists());
    assert_eq!(loader.load_count(), 0);
}

#[test]
fn test_run_withPrefetchOnly_shouldLoadModelsWithoutInput() {
    let loader = MockModelLoader::new();
    let pipeline = pipeline_with(loader.clone());
    let controller = Controller::new_for_test().unwrap();

    let options = RunOptions {
        prefetch_only: true,
        ..RunOptions::default()
    };
    let summary = tokio_test::block_on(controller.run_with_pipeline(&pipeline, options, CancellationToken::new()))
        .unwrap();

    assert!(summary.output_path.is_none());
    assert_eq!(summary.strategy.name(), "direct");
    assert_eq!(loader.load_count(), 1);
    assert!(loader.calls().is_empty());
}

#[tokio::test]
async fn test_run_withCancelledToken_shouldNotWriteOutput() {
    let dir = create_temp_dir().unwrap();
    let input = create_test_file(dir.path(), "a.md", "Hello\n").unwrap();
    let controller = Controller::new_for_test().unwrap();
    let pipeline = pipeline_with(MockModelLoader::new().with_delay(|_| Duration::from_secs(10)));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let options = RunOptions {
        input,
        ..RunOptions::default()
    };
    let result = controller.run_with_pipeline(&pipeline, options, cancel).await;

    assert!(result.is_err());
    assert!(!dir.path().join("a.de.md").exists());
}

#[tokio::test]
async fn test_run_withDashOutput_shouldWriteNoFileButKeepReport() {
    let dir = create_temp_dir().unwrap();
    let input = create_test_file(dir.path(), "a.md", "Hello\n").unwrap();
    let controller = Controller::new_for_test().unwrap();
    let pipeline = pipeline_with(MockModelLoader::new());

    let options = RunOptions {
        input,
        output: Some("-".into()),
        debug: true,
        ..RunOptions::default()
    };
    let summary = controller
        .run_with_pipeline(&pipeline, options, CancellationToken::new())
        .await
        .unwrap();

    assert!(summary.output_path.is_none());
    assert!(!dir.path().join("a.de.md").exists());
    assert_eq!(summary.report_path, Some(dir.path().join("a.de.md.debug.json")));
    assert!(dir.path().join("a.de.md.debug.json").exists());
    assert_eq!(summary.stats.translated, 1);
}
