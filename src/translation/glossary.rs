/*!
 * Glossary enforcement.
 *
 * Glossary terms in marker-substituted text are replaced by `__GL<n>__`
 * markers before MT, so the model cannot alter them, and the markers are
 * replaced by the declared target rendering afterwards.
 */

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

use crate::translation::document::PLACEHOLDER_MARKER_REGEX;

/// Glossary markers, `__GL<n>__`
pub static GLOSSARY_MARKER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"__GL(\d+)__").expect("Invalid glossary marker regex"));

/// Target value meaning "leave the source term as it is"
pub const KEEP: &str = "KEEP";

/// A source term and its required rendering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlossaryEntry {
    pub source: String,
    pub target: String,
}

impl GlossaryEntry {
    pub fn keeps_source(&self) -> bool {
        self.target == KEEP
    }
}

/// Source term (case-insensitive) to target rendering
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Glossary {
    entries: Vec<GlossaryEntry>,
}

impl Glossary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(source, target)` pairs; blank source terms are skipped,
    /// a later duplicate (ignoring case) replaces an earlier one
    pub fn from_entries<I, S, T>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: Into<String>,
    {
        let mut glossary = Self::new();
        for (source, target) in entries {
            glossary.insert(source, target);
        }
        glossary
    }

    pub fn insert(&mut self, source: impl Into<String>, target: impl Into<String>) {
        let source = source.into().trim().to_string();
        if source.is_empty() {
            return;
        }
        let target = target.into();
        match self
            .entries
            .iter_mut()
            .find(|e| e.source.to_lowercase() == source.to_lowercase())
        {
            Some(existing) => existing.target = target,
            None => self.entries.push(GlossaryEntry { source, target }),
        }
    }

    pub fn entries(&self) -> &[GlossaryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One replaced occurrence
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlossaryMatch {
    pub marker: String,
    /// Source text as it appeared
    pub matched: String,
    /// Text the marker is restored to
    pub rendering: String,
}

/// Text with glossary terms replaced by markers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GlossaryProtected {
    pub text: String,
    pub matches: Vec<GlossaryMatch>,
}

impl GlossaryProtected {
    /// Text passed through unchanged
    pub fn passthrough(text: &str) -> Self {
        Self {
            text: text.to_string(),
            matches: Vec::new(),
        }
    }

    pub fn markers(&self) -> Vec<String> {
        self.matches.iter().map(|m| m.marker.clone()).collect()
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Applies a glossary around MT and post-edit
#[derive(Debug, Clone)]
pub struct GlossaryApplier {
    /// Entries with their matcher, longest source term first
    terms: Vec<(GlossaryEntry, Regex)>,
}

impl GlossaryApplier {
    pub fn new(glossary: Option<&Glossary>) -> Self {
        let mut terms: Vec<(GlossaryEntry, Regex)> = glossary
            .map(|g| g.entries())
            .unwrap_or_default()
            .iter()
            .filter_map(|entry| {
                Regex::new(&format!("(?i){}", regex::escape(&entry.source)))
                    .ok()
                    .map(|re| (entry.clone(), re))
            })
            .collect();
        terms.sort_by_key(|(entry, _)| Reverse(entry.source.chars().count()));
        Self { terms }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Replace glossary terms with markers, one per occurrence.
    ///
    /// Matches are case-insensitive, on word boundaries and never inside an
    /// existing marker; longer terms win over overlapping shorter ones.
    pub fn protect(&self, text: &str) -> GlossaryProtected {
        if self.terms.is_empty() {
            return GlossaryProtected::passthrough(text);
        }

        let blocked: Vec<(usize, usize)> = PLACEHOLDER_MARKER_REGEX
            .find_iter(text)
            .chain(GLOSSARY_MARKER_REGEX.find_iter(text))
            .map(|m| (m.start(), m.end()))
            .collect();
        let overlaps = |(s, e): (usize, usize), ranges: &[(usize, usize)]| {
            ranges.iter().any(|&(rs, re)| s < re && rs < e)
        };

        let mut chosen: Vec<(usize, usize, usize)> = Vec::new();
        let mut taken: Vec<(usize, usize)> = Vec::new();
        for (index, (entry, re)) in self.terms.iter().enumerate() {
            let starts_word = entry.source.chars().next().is_some_and(is_word_char);
            let ends_word = entry.source.chars().next_back().is_some_and(is_word_char);
            for m in re.find_iter(text) {
                let range = (m.start(), m.end());
                let before_ok = !starts_word || !text[..m.start()].chars().next_back().is_some_and(is_word_char);
                let after_ok = !ends_word || !text[m.end()..].chars().next().is_some_and(is_word_char);
                if before_ok && after_ok && !overlaps(range, &blocked) && !overlaps(range, &taken) {
                    taken.push(range);
                    chosen.push((m.start(), m.end(), index));
                }
            }
        }
        chosen.sort_by_key(|(start, _, _)| *start);

        let mut protected = String::with_capacity(text.len());
        let mut matches = Vec::with_capacity(chosen.len());
        let mut last = 0;
        for (n, (start, end, index)) in chosen.into_iter().enumerate() {
            let entry = &self.terms[index].0;
            let matched = &text[start..end];
            let marker = format!("__GL{}__", n);
            protected.push_str(&text[last..start]);
            protected.push_str(&marker);
            matches.push(GlossaryMatch {
                marker,
                matched: matched.to_string(),
                rendering: if entry.keeps_source() {
                    matched.to_string()
                } else {
                    entry.target.clone()
                },
            });
            last = end;
        }
        protected.push_str(&text[last..]);

        GlossaryProtected {
            text: protected,
            matches,
        }
    }

    /// Replace glossary markers by their rendering; unknown markers stay
    pub fn restore(&self, text: &str, protected: &GlossaryProtected) -> String {
        if protected.matches.is_empty() {
            return text.to_string();
        }
        GLOSSARY_MARKER_REGEX
            .replace_all(text, |caps: &Captures| {
                caps[1]
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| protected.matches.get(i))
                    .map_or_else(|| caps[0].to_string(), |m| m.rendering.clone())
            })
            .into_owned()
    }
}
