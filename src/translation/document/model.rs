/*!
 * Core document model types for markdown translation.
 *
 * A document is split into ordered segments. Translatable segments carry a
 * marker-substituted text plus the placeholder map that inverts the
 * substitution; everything else is opaque structure copied verbatim.
 */

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::language_utils::LanguageCode;

/// Structural placeholder markers, `__PH<n>__`
pub static PLACEHOLDER_MARKER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"__PH(\d+)__").expect("Invalid placeholder marker regex"));

/// Format the marker for a placeholder index
pub fn placeholder_marker(index: usize) -> String {
    format!("__PH{}__", index)
}

/// Raw input text with its declared source language. Immutable once read.
#[derive(Debug, Clone)]
pub struct Document {
    text: String,
    source_language: LanguageCode,
}

impl Document {
    pub fn new(text: impl Into<String>, source_language: LanguageCode) -> Self {
        Self {
            text: text.into(),
            source_language,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn source_language(&self) -> &LanguageCode {
        &self.source_language
    }
}

/// Kind of a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    Paragraph,
    Heading,
    ListItem,
    Blockquote,
    TableCell,
    /// Fenced or indented code block
    CodeBlock,
    HtmlBlock,
    Frontmatter,
    ThematicBreak,
    /// Run of blank lines
    Blank,
    /// Structural text around translatable content: line endings, list
    /// markers, `>` chains, heading hashes, table pipes, indentation
    Markup,
    /// Visible text of a link or image, translated apart from its target
    LinkLabel,
}

impl SegmentKind {
    /// Whether segments of this kind are sent to the MT model
    pub fn is_translatable(&self) -> bool {
        matches!(
            self,
            Self::Paragraph
                | Self::Heading
                | Self::ListItem
                | Self::Blockquote
                | Self::TableCell
                | Self::LinkLabel
        )
    }
}

/// What a placeholder stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderKind {
    Link,
    Image,
    InlineCode,
    Autolink,
    Url,
    Html,
    Number,
    /// `{name}`, `{{name}}`, `%s`
    Template,
    /// Match of a user-supplied protected pattern
    Protected,
    /// Source text that already looks like a marker
    Literal,
}

/// Pieces of a link or image so the label can be translated alone.
/// `prefix + label + suffix` is the original text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkParts {
    /// `[` or `![`
    pub prefix: String,
    pub label: String,
    /// `](target)` or `][ref]`
    pub suffix: String,
}

/// A single extracted span
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placeholder {
    pub marker: String,
    pub original: String,
    pub kind: PlaceholderKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<LinkParts>,
}

/// Ordered map from marker to the verbatim text it replaces.
///
/// The marker of entry `n` is always `__PH<n>__`, so entries are kept in a
/// vector and the marker doubles as the index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaceholderMap {
    entries: Vec<Placeholder>,
}

impl PlaceholderMap {
    /// Append a placeholder and return its marker
    pub fn push(&mut self, kind: PlaceholderKind, original: String, link: Option<LinkParts>) -> String {
        let marker = placeholder_marker(self.entries.len());
        self.entries.push(Placeholder {
            marker: marker.clone(),
            original,
            kind,
            link,
        });
        marker
    }

    pub fn get(&self, index: usize) -> Option<&Placeholder> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Placeholder> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Markers in left-to-right order of the source
    pub fn markers(&self) -> Vec<String> {
        self.entries.iter().map(|p| p.marker.clone()).collect()
    }

    /// Replace every known marker with its original text.
    /// Unknown markers are left untouched.
    pub fn restore(&self, text: &str) -> String {
        self.restore_with_labels(text, &HashMap::new())
    }

    /// Like [`restore`](Self::restore), but links whose index appears in
    /// `labels` get the given label between their original prefix and suffix.
    pub fn restore_with_labels(&self, text: &str, labels: &HashMap<usize, String>) -> String {
        PLACEHOLDER_MARKER_REGEX
            .replace_all(text, |caps: &Captures| {
                let entry = caps[1].parse::<usize>().ok().and_then(|i| self.entries.get(i).map(|p| (i, p)));
                match entry {
                    Some((index, placeholder)) => match (&placeholder.link, labels.get(&index)) {
                        (Some(parts), Some(label)) => format!("{}{}{}", parts.prefix, label, parts.suffix),
                        _ => placeholder.original.clone(),
                    },
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}

/// Text with placeholders substituted by markers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtectedText {
    pub text: String,
    pub placeholders: PlaceholderMap,
}

impl ProtectedText {
    /// Undo the substitution
    pub fn restore(&self) -> String {
        self.placeholders.restore(&self.text)
    }
}

/// Ordered translation unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub id: usize,
    pub kind: SegmentKind,
    pub raw_text: String,
    /// Marker-substituted text; equals `raw_text` for opaque segments
    pub protected_text: String,
    pub placeholders: PlaceholderMap,
}

impl Segment {
    /// Segment copied verbatim
    pub fn opaque(id: usize, kind: SegmentKind, raw_text: impl Into<String>) -> Self {
        let raw_text = raw_text.into();
        Self {
            id,
            kind,
            protected_text: raw_text.clone(),
            raw_text,
            placeholders: PlaceholderMap::default(),
        }
    }

    pub fn translatable(id: usize, kind: SegmentKind, raw_text: impl Into<String>, protected: ProtectedText) -> Self {
        Self {
            id,
            kind,
            raw_text: raw_text.into(),
            protected_text: protected.text,
            placeholders: protected.placeholders,
        }
    }

    pub fn is_translatable(&self) -> bool {
        self.kind.is_translatable()
    }

    /// Whether there is any text left for a model once markers are removed
    pub fn needs_translation(&self) -> bool {
        self.is_translatable() && has_translatable_text(&self.protected_text)
    }

    /// Protected text with placeholders restored
    pub fn restored(&self) -> String {
        self.placeholders.restore(&self.protected_text)
    }

    /// Placeholders whose label can be translated
    pub fn link_labels(&self) -> impl Iterator<Item = (usize, &LinkParts)> {
        self.placeholders
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.link.as_ref().map(|link| (i, link)))
            .filter(|(_, link)| has_translatable_text(&link.label))
    }
}

/// Whether `text` contains a letter outside of markers
pub fn has_translatable_text(text: &str) -> bool {
    PLACEHOLDER_MARKER_REGEX
        .split(text)
        .flat_map(|part| crate::translation::glossary::GLOSSARY_MARKER_REGEX.split(part))
        .any(|part| part.chars().any(char::is_alphabetic))
}
