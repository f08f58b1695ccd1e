/*!
 * Model registry: maps a language pair to a translation strategy.
 *
 * Resolution order is fixed: a direct model for the ordered pair, then a
 * pivot through English (when allowed and both legs exist), then the
 * broad-coverage fallback model with both codes mapped into its namespace.
 */

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::errors::TranslationError;
use crate::language_utils::{LanguageCode, LanguagePair};

/// Pivot language for two-step translation
pub const PIVOT_LANGUAGE: &str = "en";

/// Default broad-coverage model
pub const DEFAULT_FALLBACK_MODEL: &str = "facebook/nllb-200-distilled-600M";

/// Model family; decides whether language codes are sent with a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelBackend {
    /// Bilingual model, one per ordered pair
    Marian,
    /// Multilingual model addressed with FLORES-200 codes
    Nllb,
}

/// A model covering one ordered language pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub model_id: String,
    pub source: String,
    pub target: String,
    pub backend: ModelBackend,
    #[serde(default)]
    pub disabled: bool,
}

impl ModelSpec {
    pub fn marian(source: &str, target: &str) -> Self {
        Self {
            model_id: format!("Helsinki-NLP/opus-mt-{}-{}", source, target),
            source: source.to_string(),
            target: target.to_string(),
            backend: ModelBackend::Marian,
            disabled: false,
        }
    }

    /// Mark the model as unavailable
    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }
}

/// How a document is translated, resolved once per run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TranslationStrategy {
    Direct {
        model_id: String,
    },
    Pivot {
        first_model_id: String,
        second_model_id: String,
        pivot_language: String,
    },
    Fallback {
        model_id: String,
        source_code: String,
        target_code: String,
    },
}

impl TranslationStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Direct { .. } => "direct",
            Self::Pivot { .. } => "pivot",
            Self::Fallback { .. } => "fallback",
        }
    }

    /// Every model the strategy invokes, in call order
    pub fn model_ids(&self) -> Vec<&str> {
        match self {
            Self::Direct { model_id } | Self::Fallback { model_id, .. } => vec![model_id.as_str()],
            Self::Pivot {
                first_model_id,
                second_model_id,
                ..
            } => vec![first_model_id.as_str(), second_model_id.as_str()],
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

impl std::fmt::Display for TranslationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct { model_id } => write!(f, "direct ({})", model_id),
            Self::Pivot {
                first_model_id,
                second_model_id,
                pivot_language,
            } => write!(f, "pivot via {} ({} then {})", pivot_language, first_model_id, second_model_id),
            Self::Fallback {
                model_id,
                source_code,
                target_code,
            } => write!(f, "fallback ({}, {} -> {})", model_id, source_code, target_code),
        }
    }
}

/// Static coverage table plus the fallback model
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    specs: Vec<ModelSpec>,
    fallback_model_id: String,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelRegistry {
    /// Registry with the default OPUS-MT coverage
    pub fn new() -> Self {
        Self {
            specs: default_specs(),
            fallback_model_id: DEFAULT_FALLBACK_MODEL.to_string(),
        }
    }

    /// Registry with a custom coverage table
    pub fn with_specs(specs: Vec<ModelSpec>) -> Self {
        Self {
            specs,
            fallback_model_id: DEFAULT_FALLBACK_MODEL.to_string(),
        }
    }

    pub fn with_fallback_model(mut self, model_id: impl Into<String>) -> Self {
        self.fallback_model_id = model_id.into();
        self
    }

    pub fn fallback_model_id(&self) -> &str {
        &self.fallback_model_id
    }

    /// First enabled model for the ordered pair
    pub fn find_direct(&self, source: &str, target: &str) -> Option<&ModelSpec> {
        self.specs.iter().find(|spec| {
            !spec.disabled
                && spec.source.eq_ignore_ascii_case(source)
                && spec.target.eq_ignore_ascii_case(target)
        })
    }

    /// Enabled ordered pairs
    pub fn supported_pairs(&self) -> BTreeSet<(String, String)> {
        self.specs
            .iter()
            .filter(|spec| !spec.disabled)
            .map(|spec| (spec.source.to_lowercase(), spec.target.to_lowercase()))
            .collect()
    }

    /// Resolve the strategy for a pair. Pure function of the table and the flag.
    pub fn resolve(&self, pair: &LanguagePair, allow_pivot: bool) -> Result<TranslationStrategy, TranslationError> {
        if pair.source == pair.target {
            return Err(TranslationError::UnsupportedLanguage {
                code: pair.target.to_string(),
                reason: "source and target languages are the same".to_string(),
            });
        }

        let source = pair.source.as_str();
        let target = pair.target.as_str();

        if let Some(spec) = self.find_direct(source, target) {
            return Ok(TranslationStrategy::Direct {
                model_id: spec.model_id.clone(),
            });
        }

        if allow_pivot && !pair.source.is_english() && !pair.target.is_english() {
            let first = self.find_direct(source, PIVOT_LANGUAGE);
            let second = self.find_direct(PIVOT_LANGUAGE, target);
            if let (Some(first), Some(second)) = (first, second) {
                return Ok(TranslationStrategy::Pivot {
                    first_model_id: first.model_id.clone(),
                    second_model_id: second.model_id.clone(),
                    pivot_language: PIVOT_LANGUAGE.to_string(),
                });
            }
        }

        self.fallback_strategy(pair)
    }

    /// The fallback-model strategy, independent of the direct table
    pub fn fallback_strategy(&self, pair: &LanguagePair) -> Result<TranslationStrategy, TranslationError> {
        Ok(TranslationStrategy::Fallback {
            model_id: self.fallback_model_id.clone(),
            source_code: fallback_code(&pair.source)?,
            target_code: fallback_code(&pair.target)?,
        })
    }
}

fn fallback_code(code: &LanguageCode) -> Result<String, TranslationError> {
    code.fallback_code()
        .map(str::to_string)
        .ok_or_else(|| TranslationError::UnsupportedLanguage {
            code: code.to_string(),
            reason: "no equivalent in the fallback model".to_string(),
        })
}

fn default_specs() -> Vec<ModelSpec> {
    let mut specs = Vec::new();
    for other in ["de", "es", "fr", "it", "pt"] {
        specs.push(ModelSpec::marian("en", other));
        specs.push(ModelSpec::marian(other, "en"));
    }
    for target in ["es", "fr", "it", "pt"] {
        specs.push(ModelSpec::marian("de", target));
    }
    specs
}
