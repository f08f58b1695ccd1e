/*!
 * Tests for application configuration functionality
 */

use mdtrans::app_config::{Config, LogLevel, TranslationProvider};

use crate::common::create_temp_dir;

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.source_language, "en");
    assert_eq!(config.target_language, "de");
    assert!(config.translation.allow_pivot);
    assert!(config.translation.translate_link_labels);
    assert_eq!(config.translation.max_concurrent_segments, 4);
    assert_eq!(config.translation.tone.register, "neutral");
    assert_eq!(config.mt.fallback_model, "facebook/nllb-200-distilled-600M");
    assert!(config.postedit.enabled);
    assert_eq!(config.postedit.provider, TranslationProvider::Ollama);
    assert_eq!(config.postedit.max_attempts, 2);
    assert_eq!(config.log_level, LogLevel::Info);
}

/// Test configuration validation
#[test]
fn test_config_validation_withVariousConfigs_shouldValidateCorrectly() {
    let mut config = Config::default();
    assert!(config.validate().is_ok());

    config.source_language = "q1z".to_string();
    assert!(config.validate().is_err());
    config.source_language = "jpn_Jpan".to_string();
    assert!(config.validate().is_ok());

    config.translation.protected_patterns = vec!["(unclosed".to_string()];
    assert!(config.validate().is_err());
    config.translation.protected_patterns = vec!["ACME-\\d+".to_string()];
    assert!(config.validate().is_ok());

    config.mt.endpoint = "not a url".to_string();
    assert!(config.validate().is_err());
    config.mt.endpoint = "http://127.0.0.1:9000".to_string();

    // OpenAI needs an API key, but only while post-editing is on
    config.postedit.provider = TranslationProvider::OpenAI;
    assert!(config.validate().is_err());
    config.postedit.enabled = false;
    assert!(config.validate().is_ok());
    config.postedit.enabled = true;
    config.postedit.api_key = "sk-test".to_string();
    assert!(config.validate().is_ok());

    config.postedit.temperature = 3.5;
    assert!(config.validate().is_err());
}

#[test]
fn test_postedit_config_withEmptyModel_shouldUseProviderDefaults() {
    let mut config = Config::default();
    config.postedit.provider = TranslationProvider::LMStudio;
    assert_eq!(config.postedit.get_endpoint(), "http://localhost:1234/v1");
    assert_eq!(config.postedit.get_model(), "local-model");

    config.postedit.model = "qwen2.5".to_string();
    assert_eq!(config.postedit.get_model(), "qwen2.5");
}

#[test]
fn test_provider_fromStr_shouldParseCaseInsensitively() {
    assert_eq!("OpenAI".parse::<TranslationProvider>().unwrap(), TranslationProvider::OpenAI);
    assert_eq!("lmstudio".parse::<TranslationProvider>().unwrap(), TranslationProvider::LMStudio);
    assert!("anthropic".parse::<TranslationProvider>().is_err());
    assert_eq!(TranslationProvider::LMStudio.display_name(), "LM Studio");
}

#[test]
fn test_loadOrCreate_withMissingFile_shouldWriteDefaults() {
    let dir = create_temp_dir().unwrap();
    let path = dir.path().join("mdtrans.json");

    let created = Config::load_or_create(&path).unwrap();
    assert!(path.exists());

    let loaded = Config::load_or_create(&path).unwrap();
    assert_eq!(loaded.target_language, created.target_language);
    assert_eq!(loaded.postedit.max_chars, created.postedit.max_chars);
}

#[test]
fn test_deserialize_withPartialJson_shouldFillDefaults() {
    let config: Config = serde_json::from_str(
        r#"{
            "source_language": "ja",
            "target_language": "pt",
            "postedit": { "enabled": false, "seed": 7 },
            "translation": { "tone": { "register": "formal" } },
            "log_level": "debug"
        }"#,
    )
    .unwrap();

    assert!(!config.postedit.enabled);
    assert_eq!(config.postedit.seed, Some(7));
    assert_eq!(config.postedit.max_attempts, 2);
    assert_eq!(config.translation.tone.register, "formal");
    assert_eq!(config.translation.max_concurrent_segments, 4);
    assert_eq!(config.log_level, LogLevel::Debug);
    assert!(config.validate().is_ok());
}
