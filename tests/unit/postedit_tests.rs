/*!
 * Tests for the LLM post-edit pass through the public API
 */

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use mdtrans::app_config::{PostEditConfig, ToneProfile};
use mdtrans::errors::PostEditError;
use mdtrans::providers::mock::MockProvider;
use mdtrans::translation::glossary::{GlossaryApplier, GlossaryProtected};
use mdtrans::translation::postedit::extract_draft;
use mdtrans::translation::{Glossary, PostEditSettings, PostEditor};

fn swap_first_markers(prompt: &str) -> String {
    extract_draft(prompt)
        .unwrap_or_default()
        .replace("__PH0__", "__TMP__")
        .replace("__PH1__", "__PH0__")
        .replace("__TMP__", "__PH1__")
}

fn quoted_draft(prompt: &str) -> String {
    format!("\"{}\"", extract_draft(prompt).unwrap_or_default())
}

#[test]
fn test_settings_fromConfig_shouldCarrySamplingAndTone() {
    let config = PostEditConfig {
        seed: Some(42),
        temperature: 0.0,
        max_attempts: 0,
        timeout_secs: 5,
        ..PostEditConfig::default()
    };
    let tone = ToneProfile {
        register: "formal".to_string(),
        audience: Some("developers".to_string()),
        ..ToneProfile::default()
    };

    let settings = PostEditSettings::from_config(&config, &tone);

    assert_eq!(settings.sampling.seed, Some(42));
    assert_eq!(settings.sampling.temperature, 0.0);
    assert_eq!(settings.max_attempts, 1);
    assert_eq!(settings.timeout, Duration::from_secs(5));
    assert_eq!(settings.tone.audience.as_deref(), Some("developers"));
}

#[test]
fn test_buildPrompt_withGlossaryMatches_shouldListRenderings() {
    let glossary = Glossary::from_entries([("pipeline", "Pipeline-DE")]);
    let applier = GlossaryApplier::new(Some(&glossary));
    let protected = applier.protect("The pipeline runs __PH0__");
    let editor = PostEditor::new(Arc::new(MockProvider::working()), PostEditSettings::default());

    let prompt = editor.build_prompt(&protected.text, "Die __GL0__ läuft __PH0__", &protected, false);

    assert!(prompt.contains("- pipeline -> Pipeline-DE (written as __GL0__)"));
    assert!(prompt.contains("__GL0__, __PH0__"));
    assert!(prompt.contains("register=neutral"));
    assert_eq!(extract_draft(&prompt).as_deref(), Some("Die __GL0__ läuft __PH0__"));
}

#[tokio::test]
async fn test_postedit_withReorderedAnswer_shouldRejectAsMismatch() {
    let provider = MockProvider::working().with_custom_response(swap_first_markers);
    let settings = PostEditSettings {
        max_attempts: 1,
        ..PostEditSettings::default()
    };
    let editor = PostEditor::new(Arc::new(provider), settings);

    let outcome = editor
        .postedit(
            "a __PH0__ b __PH1__",
            "A __PH0__ B __PH1__",
            &GlossaryProtected::passthrough("a __PH0__ b __PH1__"),
            &CancellationToken::new(),
        )
        .await;

    assert!(!outcome.succeeded());
    assert!(matches!(outcome.errors[0], PostEditError::MarkerMismatch(_)));
}

#[tokio::test]
async fn test_postedit_withQuotedAnswer_shouldStripQuotes() {
    let provider = MockProvider::working().with_custom_response(quoted_draft);
    let editor = PostEditor::new(Arc::new(provider), PostEditSettings::default());

    let outcome = editor
        .postedit(
            "Hello __PH0__",
            "Hallo __PH0__",
            &GlossaryProtected::passthrough("Hello __PH0__"),
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(outcome.text.as_deref(), Some("Hallo __PH0__"));
    assert_eq!(outcome.attempts, 1);
}

#[tokio::test]
async fn test_postedit_withFailingProvider_shouldUseEveryAttempt() {
    let provider = MockProvider::failing();
    let settings = PostEditSettings {
        max_attempts: 3,
        timeout: Duration::from_secs(1),
        ..PostEditSettings::default()
    };
    let editor = PostEditor::new(Arc::new(provider.clone()), settings);

    let outcome = editor
        .postedit("Hi", "Hallo", &GlossaryProtected::passthrough("Hi"), &CancellationToken::new())
        .await;

    assert_eq!(outcome.attempts, 3);
    assert_eq!(provider.request_count(), 3);
    assert!(outcome.errors.iter().all(|e| matches!(e, PostEditError::Provider(_))));
}

#[tokio::test]
async fn test_checkConnection_withOfflineProvider_shouldFail() {
    let editor = PostEditor::new(Arc::new(MockProvider::failing()), PostEditSettings::default());
    assert!(editor.check_connection().await.is_err());
    let editor = PostEditor::new(Arc::new(MockProvider::working()), PostEditSettings::default());
    assert!(editor.check_connection().await.is_ok());
}
