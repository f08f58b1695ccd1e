/*!
 * LLM post-edit pass.
 *
 * Polishes an MT draft for fluency and tone. The answer is only accepted
 * when it carries exactly the marker sequence of the draft; anything else
 * is discarded and the MT draft stays in place.
 */

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::app_config::{PostEditConfig, ToneProfile};
use crate::errors::PostEditError;
use crate::providers::{SamplingParams, TextGenerator};
use crate::translation::glossary::GlossaryProtected;
use crate::validation::markers::{MarkerValidator, extract_markers};

/// Opening tag around the MT draft in the prompt
pub const DRAFT_OPEN: &str = "<draft>";

/// Closing tag around the MT draft in the prompt
pub const DRAFT_CLOSE: &str = "</draft>";

/// Structural line prefix: indentation, blockquote chain, list marker
static LINE_PREFIX_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[ \t]*(?:>[ \t]?)*(?:[ \t]*(?:[-*+]|\d{1,9}[.)])[ \t]+)?").expect("Invalid line prefix regex")
});

/// Text between the draft tags of a prompt
pub fn extract_draft(prompt: &str) -> Option<String> {
    let start = prompt.find(DRAFT_OPEN)? + DRAFT_OPEN.len();
    let end = start + prompt[start..].find(DRAFT_CLOSE)?;
    Some(prompt[start..end].trim_matches(|c| c == '\n' || c == '\r').to_string())
}

/// Put back blockquote and list prefixes the model stripped from the draft.
///
/// Lines are paired by position, so nothing is restored when the line counts
/// differ by more than a third.
pub fn restore_markdown_structure(mt_draft: &str, edited: &str) -> String {
    if mt_draft.is_empty() {
        return edited.to_string();
    }

    let mt_lines: Vec<&str> = mt_draft.lines().collect();
    let edited_lines: Vec<&str> = edited.lines().collect();
    if mt_lines.len().abs_diff(edited_lines.len()) * 3 > mt_lines.len() {
        return edited.to_string();
    }

    let restored: Vec<String> = edited_lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let Some(mt_line) = mt_lines.get(i) else {
                return line.to_string();
            };
            let prefix = line_prefix(mt_line);
            if prefix.trim().is_empty() || line.starts_with(prefix) || line.trim().is_empty() {
                return line.to_string();
            }
            let body = &line[line_prefix(line).len()..];
            format!("{}{}", prefix, body)
        })
        .collect();

    restored.join("\n")
}

fn line_prefix(line: &str) -> &str {
    LINE_PREFIX_REGEX.find(line).map(|m| m.as_str()).unwrap_or("")
}

/// Remove wrappers the model put around its answer
fn clean_response(response: &str, mt_draft: &str) -> String {
    let mut text = match extract_draft(response) {
        Some(inner) => inner,
        None => response.trim().to_string(),
    };

    if text.starts_with("```") && text.ends_with("```") && text.len() > 6 {
        let inner = &text[3..text.len() - 3];
        // drop the info string line
        let inner = match inner.find('\n') {
            Some(pos) => &inner[pos + 1..],
            None => inner,
        };
        text = inner.trim().to_string();
    }

    for (open, close) in [('"', '"'), ('\u{201C}', '\u{201D}'), ('\'', '\'')] {
        let wrapped = text.chars().count() >= 2 && text.starts_with(open) && text.ends_with(close);
        if wrapped && !mt_draft.trim_start().starts_with(open) {
            text = text[open.len_utf8()..text.len() - close.len_utf8()].trim().to_string();
            break;
        }
    }

    restore_markdown_structure(mt_draft, &text)
}

/// Post-edit behavior knobs
#[derive(Debug, Clone)]
pub struct PostEditSettings {
    /// Bound on a single LLM call
    pub timeout: Duration,
    /// Attempts per segment, including the first
    pub max_attempts: u32,
    /// Prompts longer than this (in chars) are not sent
    pub max_chars: usize,
    pub sampling: SamplingParams,
    pub tone: ToneProfile,
}

impl Default for PostEditSettings {
    fn default() -> Self {
        Self::from_config(&PostEditConfig::default(), &ToneProfile::default())
    }
}

impl PostEditSettings {
    pub fn from_config(config: &PostEditConfig, tone: &ToneProfile) -> Self {
        Self {
            timeout: Duration::from_secs(config.timeout_secs),
            max_attempts: config.max_attempts.max(1),
            max_chars: config.max_chars,
            sampling: SamplingParams {
                temperature: config.temperature,
                top_p: config.top_p,
                seed: config.seed,
                max_tokens: config.max_tokens,
            },
            tone: tone.clone(),
        }
    }
}

/// Result of post-editing one segment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostEditOutcome {
    /// Accepted output, `None` when the MT draft must be kept
    pub text: Option<String>,
    /// LLM calls made
    pub attempts: u32,
    /// Failure of every rejected attempt, in order
    pub errors: Vec<PostEditError>,
}

impl PostEditOutcome {
    pub fn succeeded(&self) -> bool {
        self.text.is_some()
    }
}

/// LLM post-editor
pub struct PostEditor {
    generator: Arc<dyn TextGenerator>,
    settings: PostEditSettings,
}

impl std::fmt::Debug for PostEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostEditor")
            .field("generator", &self.generator.name())
            .field("settings", &self.settings)
            .finish()
    }
}

impl PostEditor {
    pub fn new(generator: Arc<dyn TextGenerator>, settings: PostEditSettings) -> Self {
        Self { generator, settings }
    }

    pub fn settings(&self) -> &PostEditSettings {
        &self.settings
    }

    pub fn generator_name(&self) -> String {
        self.generator.name()
    }

    /// Verify the LLM service answers
    pub async fn check_connection(&self) -> Result<(), PostEditError> {
        self.generator
            .check_connection()
            .await
            .map_err(|e| PostEditError::Provider(e.to_string()))
    }

    /// Build the post-edit prompt for one segment
    pub fn build_prompt(&self, source_text: &str, mt_text: &str, glossary: &GlossaryProtected, strict: bool) -> String {
        let tone = &self.settings.tone;
        let markers = extract_markers(mt_text);
        let protected_tokens = if markers.is_empty() {
            "none".to_string()
        } else {
            markers.join(", ")
        };

        let mut constraints = vec![
            "Preserve meaning exactly; do not add or remove claims.".to_string(),
            "Keep Markdown structure, spacing, and list markers unchanged.".to_string(),
            format!(
                "Do not alter protected tokens, keep each exactly once and in the same order: {}",
                protected_tokens
            ),
            "Preserve URLs, IDs, file names, and numeric values.".to_string(),
            "Replace idioms with natural equivalents; otherwise paraphrase lightly.".to_string(),
        ];
        if strict {
            constraints.push("If uncertain, return the MT draft verbatim.".to_string());
        }

        let glossary_section = if glossary.matches.is_empty() {
            "none".to_string()
        } else {
            glossary
                .matches
                .iter()
                .map(|m| format!("- {} -> {} (written as {})", m.matched, m.rendering, m.marker))
                .collect::<Vec<_>>()
                .join("\n")
        };

        let optional = |value: &Option<String>| value.clone().unwrap_or_else(|| "unspecified".to_string());
        format!(
            "You are a post-editor improving a machine translation.\n\
             Tone: register={}, voice={}, audience={}, humor={}.\n\
             Constraints:\n{}\n\
             Glossary:\n{}\n\
             SOURCE TEXT:\n{}\n\n\
             MT DRAFT:\n{}\n{}\n{}\n\n\
             Return only the corrected translation.",
            tone.register,
            optional(&tone.voice),
            optional(&tone.audience),
            optional(&tone.humor),
            constraints
                .iter()
                .map(|line| format!("- {}", line))
                .collect::<Vec<_>>()
                .join("\n"),
            glossary_section,
            source_text,
            DRAFT_OPEN,
            mt_text,
            DRAFT_CLOSE,
        )
    }

    /// Post-edit with the configured sampling controls
    pub async fn postedit(
        &self,
        source_text: &str,
        mt_text: &str,
        glossary: &GlossaryProtected,
        cancel: &CancellationToken,
    ) -> PostEditOutcome {
        let sampling = self.settings.sampling.clone();
        self.postedit_with_sampling(source_text, mt_text, glossary, &sampling, cancel)
            .await
    }

    /// Post-edit one MT draft.
    ///
    /// Transient failures are retried with the same input up to `max_attempts`;
    /// after a marker violation the strict prompt is used.
    pub async fn postedit_with_sampling(
        &self,
        source_text: &str,
        mt_text: &str,
        glossary: &GlossaryProtected,
        sampling: &SamplingParams,
        cancel: &CancellationToken,
    ) -> PostEditOutcome {
        let expected = extract_markers(mt_text);
        let mut outcome = PostEditOutcome::default();
        let mut strict = false;

        for attempt in 1..=self.settings.max_attempts {
            if cancel.is_cancelled() {
                outcome.errors.push(PostEditError::Cancelled);
                break;
            }

            let prompt = self.build_prompt(source_text, mt_text, glossary, strict);
            let prompt_chars = prompt.chars().count();
            if prompt_chars > self.settings.max_chars {
                warn!(
                    "Post-edit prompt has {} chars (limit {}), keeping MT output",
                    prompt_chars, self.settings.max_chars
                );
                outcome.errors.push(PostEditError::Aborted(format!(
                    "prompt of {} chars exceeds the limit of {}",
                    prompt_chars, self.settings.max_chars
                )));
                break;
            }

            outcome.attempts = attempt;
            match self.attempt(&prompt, mt_text, &expected, sampling, cancel).await {
                Ok(text) => {
                    debug!("Post-edit accepted on attempt {}", attempt);
                    outcome.text = Some(text);
                    return outcome;
                }
                Err(e) => {
                    warn!(
                        "Post-edit attempt {}/{} rejected: {}",
                        attempt, self.settings.max_attempts, e
                    );
                    let retryable = e.is_retryable();
                    strict |= e.violates_constraints();
                    outcome.errors.push(e);
                    if !retryable {
                        break;
                    }
                }
            }
        }

        outcome
    }

    async fn attempt(
        &self,
        prompt: &str,
        mt_text: &str,
        expected: &[String],
        sampling: &SamplingParams,
        cancel: &CancellationToken,
    ) -> Result<String, PostEditError> {
        let call = tokio::time::timeout(self.settings.timeout, self.generator.generate(prompt, sampling));
        let result = tokio::select! {
            _ = cancel.cancelled() => return Err(PostEditError::Cancelled),
            result = call => result,
        };

        let response = match result {
            Err(_) => return Err(PostEditError::Timeout(self.settings.timeout)),
            Ok(Err(e)) => return Err(PostEditError::Provider(e.to_string())),
            Ok(Ok(response)) => response,
        };

        let cleaned = clean_response(&response, mt_text);
        if cleaned.trim().is_empty() {
            return Err(PostEditError::EmptyResponse);
        }

        let validation = MarkerValidator::validate(expected, &cleaned);
        if !validation.passed() {
            if !validation.missing.is_empty() {
                return Err(PostEditError::MissingMarkers(validation.missing));
            }
            return Err(PostEditError::MarkerMismatch(
                validation
                    .error_message
                    .unwrap_or_else(|| "marker order changed".to_string()),
            ));
        }

        Ok(cleaned)
    }
}
