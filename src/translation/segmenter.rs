/*!
 * Markdown segmentation.
 *
 * Splits a markdown document into ordered segments whose concatenation
 * reconstructs the input byte for byte. Block structure is recognized line
 * by line; within translatable blocks, spans that must survive translation
 * verbatim (code, links, URLs, numbers, HTML, templates) are replaced by
 * `__PH<n>__` markers.
 *
 * Anything that does not parse cleanly (an unterminated code span, a link
 * without its closing parenthesis, unbalanced brackets) stays literal text.
 */

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::TranslationError;
use crate::translation::document::{
    LinkParts, PlaceholderKind, PlaceholderMap, ProtectedText, Segment, SegmentKind,
};

static HEADING_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<prefix> {0,3}#{1,6}(?:[ \t]+|$))(?P<body>.*?)(?P<suffix>(?:[ \t]+#+)?[ \t]*)$")
        .expect("Invalid heading regex")
});

static LIST_ITEM_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<prefix>[ \t]*(?:[-*+]|\d{1,9}[.)])(?:[ \t]+(?:\[[ xX]\][ \t]+)?|$))(?P<body>.*)$")
        .expect("Invalid list item regex")
});

static BLOCKQUOTE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<prefix>(?: {0,3}>[ \t]?)+)(?P<body>.*)$").expect("Invalid blockquote regex")
});

static TABLE_DELIMITER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[ \t]*\|?[ \t]*:?-+:?[ \t]*(?:\|[ \t]*:?-+:?[ \t]*)*\|?[ \t]*$")
        .expect("Invalid table delimiter regex")
});

static HTML_BLOCK_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^ {0,3}(?:<!--|<\?|<![a-z]|</?(?:address|article|aside|audio|blockquote|br|center|details|dialog|div|dl|fieldset|figcaption|figure|footer|form|h[1-6]|header|hr|iframe|img|li|main|nav|ol|p|picture|pre|script|section|style|summary|table|tbody|td|tfoot|th|thead|tr|ul|video)(?:[\s/>]|$))",
    )
    .expect("Invalid HTML block regex")
});

static AUTOLINK_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^<(?:[A-Za-z][A-Za-z0-9+.\-]{1,31}:[^\s<>]*|[^\s@<>]+@[^\s@<>]+\.[^\s@<>]+)>")
        .expect("Invalid autolink regex")
});

static HTML_INLINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:<!--[\s\S]*?-->|</?[A-Za-z][A-Za-z0-9\-]*(?:\s+[^<>]*?)?\s*/?>)")
        .expect("Invalid inline HTML regex")
});

// Any marker-like prefix, complete or not: a bare `__PH1` glued to a real
// marker would otherwise be read back as part of it.
static LITERAL_MARKER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"__(?:PH|GL)\d*(?:__)?").expect("Invalid literal marker regex"));

static URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:https?://|ftp://|www\.)[^\s<>()\[\]"'`]+"#).expect("Invalid URL regex")
});

static TEMPLATE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{[^{}\n]+\}\}|\{[A-Za-z_][A-Za-z0-9_.]*\}|%[sd]").expect("Invalid template regex")
});

static NUMBER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[$€£¥]?\d+(?:[.,]\d+)*(?:%| ?[$€£¥])?").expect("Invalid number regex")
});

/// A line split from its terminator
#[derive(Debug, Clone, Copy)]
struct Line<'a> {
    content: &'a str,
    terminator: &'a str,
}

impl Line<'_> {
    fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }

    fn len(&self) -> usize {
        self.content.len() + self.terminator.len()
    }
}

fn split_lines(text: &str) -> Vec<Line<'_>> {
    text.split_inclusive('\n')
        .map(|piece| {
            if let Some(content) = piece.strip_suffix("\r\n") {
                Line { content, terminator: "\r\n" }
            } else if let Some(content) = piece.strip_suffix('\n') {
                Line { content, terminator: "\n" }
            } else {
                Line { content: piece, terminator: "" }
            }
        })
        .collect()
}

/// Opening fence of a fenced code block
#[derive(Debug, Clone, Copy)]
struct Fence {
    marker: u8,
    len: usize,
}

fn leading_spaces(content: &str) -> usize {
    content.bytes().take_while(|b| *b == b' ').count()
}

fn fence_open(content: &str) -> Option<Fence> {
    let indent = leading_spaces(content);
    if indent > 3 {
        return None;
    }
    let rest = &content[indent..];
    let marker = *rest.as_bytes().first()?;
    if marker != b'`' && marker != b'~' {
        return None;
    }
    let len = rest.bytes().take_while(|b| *b == marker).count();
    if len < 3 {
        return None;
    }
    // Backtick fences cannot carry backticks in their info string
    if marker == b'`' && rest[len..].contains('`') {
        return None;
    }
    Some(Fence { marker, len })
}

fn fence_closes(content: &str, fence: Fence) -> bool {
    let indent = leading_spaces(content);
    if indent > 3 {
        return false;
    }
    let rest = &content[indent..];
    let len = rest.bytes().take_while(|b| *b == fence.marker).count();
    len >= fence.len && rest[len..].trim().is_empty()
}

fn is_thematic_break(content: &str) -> bool {
    if leading_spaces(content) > 3 {
        return false;
    }
    let marks: Vec<char> = content.chars().filter(|c| !c.is_whitespace()).collect();
    let Some(&first) = marks.first() else {
        return false;
    };
    // `===` is a setext underline; it never carries text either
    let min = if first == '=' { 2 } else { 3 };
    matches!(first, '-' | '*' | '_' | '=') && marks.len() >= min && marks.iter().all(|c| *c == first)
}

fn is_table_row(content: &str) -> bool {
    content.contains('|')
}

fn is_table_start(lines: &[Line<'_>], index: usize) -> bool {
    is_table_row(lines[index].content)
        && lines
            .get(index + 1)
            .is_some_and(|next| next.content.contains('|') && TABLE_DELIMITER_REGEX.is_match(next.content))
}

fn is_indented_code(content: &str) -> bool {
    content.starts_with('\t') || content.starts_with("    ")
}

/// Whether the line at `index` opens a block other than a paragraph
fn starts_block(lines: &[Line<'_>], index: usize) -> bool {
    let content = lines[index].content;
    lines[index].is_blank()
        || fence_open(content).is_some()
        || HTML_BLOCK_REGEX.is_match(content)
        || is_thematic_break(content)
        || HEADING_REGEX.is_match(content)
        || BLOCKQUOTE_REGEX.is_match(content)
        || LIST_ITEM_REGEX.is_match(content)
        || is_table_start(lines, index)
}

/// Accumulates segments while walking the document
struct SegmentSink<'s> {
    segmenter: &'s MarkdownSegmenter,
    segments: Vec<Segment>,
}

impl<'s> SegmentSink<'s> {
    fn new(segmenter: &'s MarkdownSegmenter) -> Self {
        Self {
            segmenter,
            segments: Vec::new(),
        }
    }

    /// Structural text; adjacent markup is merged into one segment
    fn markup(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(last) = self.segments.last_mut() {
            if last.kind == SegmentKind::Markup {
                last.raw_text.push_str(text);
                last.protected_text.push_str(text);
                return;
            }
        }
        let id = self.segments.len();
        self.segments.push(Segment::opaque(id, SegmentKind::Markup, text));
    }

    fn opaque(&mut self, kind: SegmentKind, text: &str) {
        if text.is_empty() {
            return;
        }
        let id = self.segments.len();
        self.segments.push(Segment::opaque(id, kind, text));
    }

    /// Translatable content; surrounding whitespace becomes markup
    fn translatable(&mut self, kind: SegmentKind, text: &str) {
        let body = text.trim();
        if body.is_empty() {
            self.markup(text);
            return;
        }
        let lead = text.len() - text.trim_start().len();
        let body_end = lead + body.len();

        self.markup(&text[..lead]);
        let id = self.segments.len();
        let protected = self.segmenter.protect(body);
        self.segments.push(Segment::translatable(id, kind, body, protected));
        self.markup(&text[body_end..]);
    }

    /// A line whose structure is `prefix body`, e.g. a list item
    fn prefixed_line(&mut self, prefix: &str, kind: SegmentKind, body: &str, line: &Line<'_>) {
        self.markup(prefix);
        self.translatable(kind, body);
        self.markup(line.terminator);
    }

    fn table_row(&mut self, line: &Line<'_>) {
        let content = line.content;
        let bytes = content.as_bytes();
        let mut cell_start = 0;
        let mut in_code = false;
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\\' => {
                    i += 2;
                    continue;
                }
                b'`' => in_code = !in_code,
                b'|' if !in_code => {
                    self.translatable(SegmentKind::TableCell, &content[cell_start..i]);
                    self.markup("|");
                    cell_start = i + 1;
                }
                _ => {}
            }
            i += 1;
        }
        self.translatable(SegmentKind::TableCell, &content[cell_start.min(content.len())..]);
        self.markup(line.terminator);
    }
}

/// Concatenate the text of `lines[start..end]`, terminators included
fn join_lines(lines: &[Line<'_>], start: usize, end: usize) -> String {
    let mut text = String::with_capacity(lines[start..end].iter().map(Line::len).sum());
    for line in &lines[start..end] {
        text.push_str(line.content);
        text.push_str(line.terminator);
    }
    text
}

/// A structural span found by the first inline pass
#[derive(Debug, Clone)]
struct Span {
    start: usize,
    end: usize,
    kind: PlaceholderKind,
    link: Option<LinkParts>,
}

impl Span {
    fn plain(start: usize, end: usize, kind: PlaceholderKind) -> Self {
        Self { start, end, kind, link: None }
    }
}

/// Index just past the first backtick run of exactly `run` starting at or after `from`
fn closing_backticks(bytes: &[u8], from: usize, run: usize) -> Option<usize> {
    let mut j = from;
    while j < bytes.len() {
        if bytes[j] == b'`' {
            let len = bytes[j..].iter().take_while(|b| **b == b'`').count();
            if len == run {
                return Some(j + len);
            }
            j += len;
        } else {
            j += 1;
        }
    }
    None
}

/// Index of the `]` matching the `[` at `open`
fn matching_bracket(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut j = open;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => j += 1,
            b'`' => {
                let run = bytes[j..].iter().take_while(|b| **b == b'`').count();
                if let Some(end) = closing_backticks(bytes, j + run, run) {
                    j = end;
                    continue;
                }
                j += run - 1;
            }
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(j);
                }
            }
            _ => {}
        }
        j += 1;
    }
    None
}

/// Index just past the `)` closing the destination opened at `open`
fn closing_paren(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut j = open;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => j += 1,
            b'<' if j == open + 1 => {
                // `(<dest with spaces>)`
                let close = bytes[j..].iter().position(|b| *b == b'>')?;
                j += close;
            }
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(j + 1);
                }
            }
            b'\n' if j > 0 && bytes[j - 1] == b'\n' => return None,
            _ => {}
        }
        j += 1;
    }
    None
}

/// Parse `[label](dest)` or `[label][ref]` with the `[` at `open`
fn parse_link(text: &str, open: usize, image: bool) -> Option<Span> {
    let bytes = text.as_bytes();
    let close = matching_bracket(bytes, open)?;
    let after = close + 1;
    let end = match bytes.get(after)? {
        b'(' => closing_paren(bytes, after)?,
        b'[' => {
            let rel = bytes[after + 1..].iter().position(|b| *b == b']' || *b == b'[')?;
            if bytes[after + 1 + rel] != b']' {
                return None;
            }
            after + 1 + rel + 1
        }
        _ => return None,
    };

    let start = if image { open - 1 } else { open };
    Some(Span {
        start,
        end,
        kind: if image { PlaceholderKind::Image } else { PlaceholderKind::Link },
        link: Some(LinkParts {
            prefix: text[start..open + 1].to_string(),
            label: text[open + 1..close].to_string(),
            suffix: text[close..end].to_string(),
        }),
    })
}

fn parse_angle(text: &str, at: usize) -> Option<Span> {
    let rest = &text[at..];
    if let Some(m) = AUTOLINK_REGEX.find(rest) {
        return Some(Span::plain(at, at + m.end(), PlaceholderKind::Autolink));
    }
    HTML_INLINE_REGEX
        .find(rest)
        .map(|m| Span::plain(at, at + m.end(), PlaceholderKind::Html))
}

/// First pass: code spans, links, images, autolinks and inline HTML
fn structural_spans(text: &str) -> Vec<Span> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if bytes.get(i + 1).is_some_and(u8::is_ascii_punctuation) => i += 2,
            b'`' => {
                let run = bytes[i..].iter().take_while(|b| **b == b'`').count();
                match closing_backticks(bytes, i + run, run) {
                    Some(end) => {
                        spans.push(Span::plain(i, end, PlaceholderKind::InlineCode));
                        i = end;
                    }
                    None => i += run,
                }
            }
            b'!' if bytes.get(i + 1) == Some(&b'[') => match parse_link(text, i + 1, true) {
                Some(span) => {
                    i = span.end;
                    spans.push(span);
                }
                None => i += 1,
            },
            b'[' => match parse_link(text, i, false) {
                Some(span) => {
                    i = span.end;
                    spans.push(span);
                }
                None => i += 1,
            },
            b'<' => match parse_angle(text, i) {
                Some(span) => {
                    i = span.end;
                    spans.push(span);
                }
                None => i += 1,
            },
            _ => i += 1,
        }
    }
    spans
}

fn char_before(text: &str, at: usize) -> Option<char> {
    text[..at].chars().next_back()
}

fn char_after(text: &str, at: usize) -> Option<char> {
    text[at..].chars().next()
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Drop trailing punctuation that belongs to the sentence, not the URL
fn trim_url(text: &str, start: usize, end: usize) -> usize {
    let trimmed = text[start..end].trim_end_matches(['.', ',', ';', ':', '!', '?', '*', '_', '~']);
    start + trimmed.len()
}

/// Markdown segmenter
#[derive(Debug, Clone)]
pub struct MarkdownSegmenter {
    /// Second-pass patterns in priority order
    patterns: Vec<(PlaceholderKind, Regex)>,
}

impl Default for MarkdownSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownSegmenter {
    pub fn new() -> Self {
        Self {
            patterns: Self::build_patterns(Vec::new()),
        }
    }

    /// Add user patterns whose matches are never translated
    pub fn with_protected_patterns(patterns: &[String]) -> Result<Self, TranslationError> {
        let compiled = patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| {
                    TranslationError::Segmentation(format!("invalid protected pattern '{}': {}", p, e))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            patterns: Self::build_patterns(compiled),
        })
    }

    fn build_patterns(protected: Vec<Regex>) -> Vec<(PlaceholderKind, Regex)> {
        let mut patterns = vec![(PlaceholderKind::Literal, LITERAL_MARKER_REGEX.clone())];
        patterns.extend(protected.into_iter().map(|re| (PlaceholderKind::Protected, re)));
        patterns.push((PlaceholderKind::Url, URL_REGEX.clone()));
        patterns.push((PlaceholderKind::Template, TEMPLATE_REGEX.clone()));
        patterns.push((PlaceholderKind::Number, NUMBER_REGEX.clone()));
        patterns
    }

    /// Split `text` into segments.
    ///
    /// Fails only on a NUL byte or if the segments do not reconstruct the input.
    pub fn segment(&self, text: &str) -> Result<Vec<Segment>, TranslationError> {
        if let Some(pos) = text.find('\0') {
            return Err(TranslationError::Segmentation(format!("NUL byte at offset {}", pos)));
        }

        let lines = split_lines(text);
        let mut sink = SegmentSink::new(self);
        let mut i = 0;

        if let Some(end) = frontmatter_end(&lines) {
            sink.opaque(SegmentKind::Frontmatter, &join_lines(&lines, 0, end + 1));
            i = end + 1;
        }

        while i < lines.len() {
            let line = lines[i];
            let content = line.content;

            if line.is_blank() {
                let end = (i..lines.len()).find(|&j| !lines[j].is_blank()).unwrap_or(lines.len());
                sink.opaque(SegmentKind::Blank, &join_lines(&lines, i, end));
                i = end;
            } else if let Some(fence) = fence_open(content) {
                // An unterminated fence runs to the end of the document
                let end = (i + 1..lines.len())
                    .find(|&j| fence_closes(lines[j].content, fence))
                    .map_or(lines.len(), |j| j + 1);
                sink.opaque(SegmentKind::CodeBlock, &join_lines(&lines, i, end));
                i = end;
            } else if HTML_BLOCK_REGEX.is_match(content) {
                let end = html_block_end(&lines, i);
                sink.opaque(SegmentKind::HtmlBlock, &join_lines(&lines, i, end));
                i = end;
            } else if is_thematic_break(content) {
                sink.opaque(SegmentKind::ThematicBreak, &join_lines(&lines, i, i + 1));
                i += 1;
            } else if let Some(caps) = HEADING_REGEX.captures(content) {
                sink.markup(&caps["prefix"]);
                sink.translatable(SegmentKind::Heading, &caps["body"]);
                sink.markup(&caps["suffix"]);
                sink.markup(line.terminator);
                i += 1;
            } else if is_table_start(&lines, i) {
                sink.table_row(&line);
                sink.markup(&join_lines(&lines, i + 1, i + 2));
                i += 2;
                while i < lines.len() && !lines[i].is_blank() && is_table_row(lines[i].content) {
                    sink.table_row(&lines[i]);
                    i += 1;
                }
            } else if BLOCKQUOTE_REGEX.is_match(content) {
                i = self.blockquote(&mut sink, &lines, i);
            } else if let Some(caps) = LIST_ITEM_REGEX.captures(content) {
                sink.prefixed_line(&caps["prefix"], SegmentKind::ListItem, &caps["body"], &line);
                i += 1;
            } else if is_indented_code(content) && (i == 0 || lines[i - 1].is_blank()) {
                let end = (i..lines.len())
                    .find(|&j| lines[j].is_blank() || !is_indented_code(lines[j].content))
                    .unwrap_or(lines.len());
                sink.opaque(SegmentKind::CodeBlock, &join_lines(&lines, i, end));
                i = end;
            } else {
                let end = (i + 1..lines.len())
                    .find(|&j| starts_block(&lines, j))
                    .unwrap_or(lines.len());
                let mut body = join_lines(&lines, i, end);
                let terminator = lines[end - 1].terminator;
                body.truncate(body.len() - terminator.len());
                sink.translatable(SegmentKind::Paragraph, &body);
                sink.markup(terminator);
                i = end;
            }
        }

        let segments = sink.segments;
        let rebuilt = Self::reconstruct(&segments);
        if rebuilt != text {
            return Err(TranslationError::Segmentation(
                "segments do not reconstruct the input".to_string(),
            ));
        }
        Ok(segments)
    }

    /// Consecutive blockquote lines starting at `start`; returns the next line index.
    /// A fence opened inside the quote keeps its lines opaque until it closes.
    fn blockquote(&self, sink: &mut SegmentSink<'_>, lines: &[Line<'_>], start: usize) -> usize {
        let mut open_fence: Option<Fence> = None;
        let mut i = start;
        while i < lines.len() {
            let line = lines[i];
            let Some(caps) = BLOCKQUOTE_REGEX.captures(line.content) else {
                break;
            };
            let prefix = caps.name("prefix").map_or("", |m| m.as_str());
            let body = caps.name("body").map_or("", |m| m.as_str());

            if let Some(fence) = open_fence {
                if fence_closes(body, fence) {
                    open_fence = None;
                }
                sink.markup(&join_lines(lines, i, i + 1));
            } else if let Some(fence) = fence_open(body) {
                open_fence = Some(fence);
                sink.markup(&join_lines(lines, i, i + 1));
            } else if let Some(item) = LIST_ITEM_REGEX.captures(body) {
                let full_prefix = &line.content[..prefix.len() + item["prefix"].len()];
                sink.prefixed_line(full_prefix, SegmentKind::Blockquote, &item["body"], &line);
            } else if let Some(heading) = HEADING_REGEX.captures(body) {
                let full_prefix = &line.content[..prefix.len() + heading["prefix"].len()];
                sink.markup(full_prefix);
                sink.translatable(SegmentKind::Blockquote, &heading["body"]);
                sink.markup(&heading["suffix"]);
                sink.markup(line.terminator);
            } else {
                sink.prefixed_line(prefix, SegmentKind::Blockquote, body, &line);
            }
            i += 1;
        }
        i
    }

    /// Concatenate the restored text of every segment
    pub fn reconstruct(segments: &[Segment]) -> String {
        segments.iter().map(Segment::restored).collect()
    }

    /// Replace spans that must survive translation by markers
    pub fn protect(&self, text: &str) -> ProtectedText {
        let mut spans = structural_spans(text);

        let mut gaps = Vec::with_capacity(spans.len() + 1);
        let mut last = 0;
        for span in &spans {
            gaps.push((last, span.start));
            last = span.end;
        }
        gaps.push((last, text.len()));

        for (start, end) in gaps {
            if start < end {
                self.scan_gap(text, start, end, &mut spans);
            }
        }
        spans.sort_by_key(|span| span.start);

        let mut placeholders = PlaceholderMap::default();
        let mut protected = String::with_capacity(text.len());
        let mut last = 0;
        for span in spans {
            protected.push_str(&text[last..span.start]);
            let marker = placeholders.push(span.kind, text[span.start..span.end].to_string(), span.link);
            protected.push_str(&marker);
            last = span.end;
        }
        protected.push_str(&text[last..]);

        ProtectedText {
            text: protected,
            placeholders,
        }
    }

    /// Second pass over text between structural spans
    fn scan_gap(&self, text: &str, start: usize, end: usize, spans: &mut Vec<Span>) {
        let gap = &text[start..end];
        let mut pos = 0;
        while pos < gap.len() {
            let next = self
                .patterns
                .iter()
                .filter_map(|(kind, re)| next_valid_match(*kind, re, gap, pos).map(|(s, e)| (s, e, *kind)))
                .min_by_key(|(s, _, _)| *s);
            match next {
                Some((s, e, kind)) => {
                    spans.push(Span::plain(start + s, start + e, kind));
                    pos = e;
                }
                None => break,
            }
        }
    }
}

/// Next match of `re` in `gap` at or after `pos` that is valid for its kind
fn next_valid_match(kind: PlaceholderKind, re: &Regex, gap: &str, pos: usize) -> Option<(usize, usize)> {
    let mut from = pos;
    while from <= gap.len() {
        let m = re.find_at(gap, from)?;
        let (s, mut e) = (m.start(), m.end());
        if kind == PlaceholderKind::Url {
            e = trim_url(gap, s, e);
        }
        let valid = e > s
            && match kind {
                // Not glued to letters: `mp3`, `5th` stay text
                PlaceholderKind::Number => {
                    !char_before(gap, s).is_some_and(is_word_char) && !char_after(gap, e).is_some_and(is_word_char)
                }
                _ => true,
            };
        if valid {
            return Some((s, e));
        }
        from = s + char_after(gap, s).map_or(1, char::len_utf8);
    }
    None
}

/// Index of the closing frontmatter line, if the document starts with one
fn frontmatter_end(lines: &[Line<'_>]) -> Option<usize> {
    if lines.first()?.content != "---" {
        return None;
    }
    (1..lines.len()).find(|&j| matches!(lines[j].content.trim_end(), "---" | "..."))
}

/// End (exclusive) of an HTML block starting at `start`
fn html_block_end(lines: &[Line<'_>], start: usize) -> usize {
    if lines[start].content.trim_start().starts_with("<!--") {
        if let Some(j) = (start..lines.len()).find(|&j| lines[j].content.contains("-->")) {
            return j + 1;
        }
        return lines.len();
    }
    (start..lines.len()).find(|&j| lines[j].is_blank()).unwrap_or(lines.len())
}
