/*!
 * Tests for language pair resolution
 */

use mdtrans::errors::TranslationError;
use mdtrans::language_utils::LanguagePair;
use mdtrans::translation::registry::{ModelRegistry, ModelSpec, TranslationStrategy};

fn pair(source: &str, target: &str) -> LanguagePair {
    LanguagePair::new(source, target).unwrap()
}

/// Resolution order over a table of pairs
#[test]
fn test_resolve_withDefaultTable_shouldFollowResolutionOrder() {
    let registry = ModelRegistry::new();
    let cases = [
        ("en", "de", "direct"),
        ("de", "fr", "direct"),
        ("fr", "de", "pivot"),
        ("ja", "pt", "fallback"),
        ("en", "ja", "fallback"),
        ("deu_Latn", "en", "direct"),
    ];

    for (source, target, expected) in cases {
        let strategy = registry.resolve(&pair(source, target), true).unwrap();
        assert_eq!(strategy.name(), expected, "{} -> {}", source, target);
    }
}

#[test]
fn test_resolve_withPivotDisabled_shouldSkipToFallback() {
    let strategy = ModelRegistry::new().resolve(&pair("fr", "de"), false).unwrap();
    assert_eq!(
        strategy,
        TranslationStrategy::Fallback {
            model_id: "facebook/nllb-200-distilled-600M".to_string(),
            source_code: "fra_Latn".to_string(),
            target_code: "deu_Latn".to_string(),
        }
    );
}

#[test]
fn test_resolve_withDisabledDirectModel_shouldPivotOrFallBack() {
    let registry = ModelRegistry::with_specs(vec![
        ModelSpec::marian("es", "de").disabled(),
        ModelSpec::marian("es", "en"),
        ModelSpec::marian("en", "de"),
    ]);

    let strategy = registry.resolve(&pair("es", "de"), true).unwrap();
    assert_eq!(strategy.name(), "pivot");
    assert_eq!(
        strategy.model_ids(),
        vec!["Helsinki-NLP/opus-mt-es-en", "Helsinki-NLP/opus-mt-en-de"]
    );
}

#[test]
fn test_resolve_withCustomFallbackModel_shouldUseIt() {
    let registry = ModelRegistry::new().with_fallback_model("facebook/nllb-200-3.3B");
    let strategy = registry.resolve(&pair("ko", "pt"), true).unwrap();
    assert_eq!(strategy.model_ids(), vec!["facebook/nllb-200-3.3B"]);
    assert!(strategy.is_fallback());
}

#[test]
fn test_resolve_withLanguageOutsideFallbackModel_shouldFail() {
    let err = ModelRegistry::new().resolve(&pair("en", "la"), true).unwrap_err();
    assert!(matches!(err, TranslationError::UnsupportedLanguage { .. }));
}

#[test]
fn test_resolve_withSameLanguageInDifferentForms_shouldFail() {
    let err = ModelRegistry::new().resolve(&pair("de", "ger"), true).unwrap_err();
    assert!(matches!(err, TranslationError::UnsupportedLanguage { .. }));
}

#[test]
fn test_resolve_shouldBeDeterministic() {
    let registry = ModelRegistry::new();
    let first = registry.resolve(&pair("it", "fr"), true).unwrap();
    let second = registry.resolve(&pair("it", "fr"), true).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_supportedPairs_shouldSkipDisabledSpecs() {
    let registry = ModelRegistry::with_specs(vec![ModelSpec::marian("en", "de"), ModelSpec::marian("en", "fr").disabled()]);
    let pairs = registry.supported_pairs();
    assert!(pairs.contains(&("en".to_string(), "de".to_string())));
    assert!(!pairs.contains(&("en".to_string(), "fr".to_string())));
}
