use anyhow::{Context, Result, anyhow};
use log::warn;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

use crate::language_utils::LanguageCode;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language code (ISO or fallback-model native code)
    pub source_language: String,

    /// Target language code (ISO or fallback-model native code)
    pub target_language: String,

    /// Segment translation settings
    #[serde(default)]
    pub translation: TranslationConfig,

    /// MT inference server settings
    #[serde(default)]
    pub mt: MtConfig,

    /// LLM post-edit settings
    #[serde(default)]
    pub postedit: PostEditConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// LLM provider used for post-editing
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    #[default]
    Ollama,
    OpenAI,
    /// LM Studio (OpenAI-compatible local server)
    LMStudio,
}

impl TranslationProvider {
    pub fn display_name(&self) -> &str {
        match self {
            Self::Ollama => "Ollama",
            Self::OpenAI => "OpenAI",
            Self::LMStudio => "LM Studio",
        }
    }

    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Ollama => "ollama".to_string(),
            Self::OpenAI => "openai".to_string(),
            Self::LMStudio => "lmstudio".to_string(),
        }
    }

    fn default_endpoint(&self) -> String {
        match self {
            Self::Ollama => "http://localhost:11434".to_string(),
            Self::OpenAI => "https://api.openai.com/v1".to_string(),
            Self::LMStudio => "http://localhost:1234/v1".to_string(),
        }
    }

    fn default_model(&self) -> String {
        match self {
            Self::Ollama => "llama3.1:8b".to_string(),
            Self::OpenAI => "gpt-4o-mini".to_string(),
            Self::LMStudio => "local-model".to_string(),
        }
    }
}

impl std::fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for TranslationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            "lmstudio" => Ok(Self::LMStudio),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Tone profile handed to the post-editor
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ToneProfile {
    /// Formality, e.g. "neutral", "formal", "casual"
    #[serde(default = "default_register")]
    pub register: String,

    /// Narrative voice, e.g. "first person"
    #[serde(default)]
    pub voice: Option<String>,

    /// Intended readers
    #[serde(default)]
    pub audience: Option<String>,

    /// Humor level, e.g. "none", "light"
    #[serde(default)]
    pub humor: Option<String>,
}

impl Default for ToneProfile {
    fn default() -> Self {
        Self {
            register: default_register(),
            voice: None,
            audience: None,
            humor: None,
        }
    }
}

/// Segment translation settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Route through English when no direct model exists
    #[serde(default = "default_true")]
    pub allow_pivot: bool,

    /// Number of segments translated at once
    #[serde(default = "default_max_concurrent_segments")]
    pub max_concurrent_segments: usize,

    /// Translate the visible text of links and images
    #[serde(default = "default_true")]
    pub translate_link_labels: bool,

    /// Extra regex patterns whose matches are never translated
    #[serde(default)]
    pub protected_patterns: Vec<String>,

    /// Tone of the translated text
    #[serde(default)]
    pub tone: ToneProfile,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            allow_pivot: true,
            max_concurrent_segments: default_max_concurrent_segments(),
            translate_link_labels: true,
            protected_patterns: Vec::new(),
            tone: ToneProfile::default(),
        }
    }
}

/// MT inference server settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MtConfig {
    /// Inference server base URL
    #[serde(default = "default_mt_endpoint")]
    pub endpoint: String,

    /// Device hint passed to the server ("cpu", "cuda", "auto")
    #[serde(default = "default_device")]
    pub device: String,

    /// Broad-coverage multilingual model used when no direct model exists
    #[serde(default = "default_fallback_model")]
    pub fallback_model: String,

    /// Request timeout in seconds
    #[serde(default = "default_mt_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for MtConfig {
    fn default() -> Self {
        Self {
            endpoint: default_mt_endpoint(),
            device: default_device(),
            fallback_model: default_fallback_model(),
            timeout_secs: default_mt_timeout_secs(),
        }
    }
}

/// LLM post-edit settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PostEditConfig {
    /// Run the post-edit pass
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// LLM provider
    #[serde(default)]
    pub provider: TranslationProvider,

    /// Model name; empty means the provider default
    #[serde(default = "String::new")]
    pub model: String,

    /// Service URL; empty means the provider default
    #[serde(default = "String::new")]
    pub endpoint: String,

    /// API key (OpenAI only)
    #[serde(default = "String::new")]
    pub api_key: String,

    /// Per-attempt timeout in seconds
    #[serde(default = "default_postedit_timeout_secs")]
    pub timeout_secs: u64,

    /// Attempts per segment, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base backoff between provider-level retries
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Sampling seed for reproducible runs
    #[serde(default)]
    pub seed: Option<u64>,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Prompts longer than this are not sent
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

impl Default for PostEditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: TranslationProvider::default(),
            model: String::new(),
            endpoint: String::new(),
            api_key: String::new(),
            timeout_secs: default_postedit_timeout_secs(),
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            seed: None,
            max_tokens: default_max_tokens(),
            max_chars: default_max_chars(),
        }
    }
}

impl PostEditConfig {
    /// Configured model or the provider default
    pub fn get_model(&self) -> String {
        if self.model.is_empty() {
            self.provider.default_model()
        } else {
            self.model.clone()
        }
    }

    /// Configured endpoint or the provider default
    pub fn get_endpoint(&self) -> String {
        if self.endpoint.is_empty() {
            self.provider.default_endpoint()
        } else {
            self.endpoint.clone()
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_register() -> String {
    "neutral".to_string()
}

fn default_max_concurrent_segments() -> usize {
    4
}

fn default_mt_endpoint() -> String {
    "http://localhost:8765".to_string()
}

fn default_device() -> String {
    "auto".to_string()
}

fn default_fallback_model() -> String {
    "facebook/nllb-200-distilled-600M".to_string()
}

fn default_mt_timeout_secs() -> u64 {
    120
}

fn default_postedit_timeout_secs() -> u64 {
    60
}

fn default_max_attempts() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

fn default_temperature() -> f32 {
    0.2
}

fn default_top_p() -> f32 {
    0.9
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_max_chars() -> usize {
    12_000
}

impl Config {
    /// Load the configuration from a JSON file, writing a default one when the file is missing
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to open config file: {}", path.display()))?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            return Ok(config);
        }

        warn!("Config file not found at '{}', creating default config.", path.display());
        let config = Config::default();
        config.save(path)?;
        Ok(config)
    }

    /// Save the configuration as pretty-printed JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        LanguageCode::parse(&self.source_language)
            .map_err(|e| anyhow!("Invalid source language: {}", e))?;
        LanguageCode::parse(&self.target_language)
            .map_err(|e| anyhow!("Invalid target language: {}", e))?;

        if self.translation.max_concurrent_segments == 0 {
            return Err(anyhow!("translation.max_concurrent_segments must be at least 1"));
        }

        for pattern in &self.translation.protected_patterns {
            Regex::new(pattern)
                .with_context(|| format!("Invalid protected pattern: {}", pattern))?;
        }

        Url::parse(&self.mt.endpoint)
            .with_context(|| format!("Invalid mt.endpoint: {}", self.mt.endpoint))?;
        if self.mt.timeout_secs == 0 {
            return Err(anyhow!("mt.timeout_secs must be positive"));
        }

        let postedit = &self.postedit;
        if postedit.enabled {
            if postedit.provider == TranslationProvider::OpenAI && postedit.api_key.is_empty() {
                return Err(anyhow!("Post-edit API key is required for OpenAI provider"));
            }
            if postedit.max_attempts == 0 {
                return Err(anyhow!("postedit.max_attempts must be at least 1"));
            }
            if postedit.timeout_secs == 0 {
                return Err(anyhow!("postedit.timeout_secs must be positive"));
            }
            if !(0.0..=2.0).contains(&postedit.temperature) {
                return Err(anyhow!("postedit.temperature must be within 0.0..=2.0"));
            }
            if !(postedit.top_p > 0.0 && postedit.top_p <= 1.0) {
                return Err(anyhow!("postedit.top_p must be within (0.0, 1.0]"));
            }
            if postedit.max_chars == 0 {
                return Err(anyhow!("postedit.max_chars must be positive"));
            }
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: "en".to_string(),
            target_language: "de".to_string(),
            translation: TranslationConfig::default(),
            mt: MtConfig::default(),
            postedit: PostEditConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
