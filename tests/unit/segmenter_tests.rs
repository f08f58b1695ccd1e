/*!
 * Tests for markdown segmentation and span protection
 */

use mdtrans::translation::document::{PlaceholderKind, SegmentKind};
use mdtrans::translation::MarkdownSegmenter;

use crate::common::sample_markdown;

const DOCUMENTS: &[&str] = &[
    "",
    "\n\n",
    "Plain text without newline",
    "# Title\n\nBody with **bold** and _emphasis_.\n",
    "* a\n* b\n  continued\n\n1) one\n2) two\n",
    "| a | b |\n|---|---|\n| `x` | [y](z) |\n",
    "<div align=\"center\">\n  <img src=\"logo.png\">\n</div>\n\nAfter html\n",
    "    indented code\n    more code\n\nText\n",
    "Setext title\n============\n\n***\n",
    "> quote with `code`\n>\n> second paragraph\n",
    "```\nnever closed\n# not a heading\n",
    "Trailing spaces  \nhard break\r\n",
    "x__PH1`y`",
    "Use __PH1`code` here\n",
    "Keep __GL`a` and __PH7__ and __PH`b`__\n",
];

/// Concatenating every segment gives back the input byte for byte
#[test]
fn test_segment_reconstruct_withVariedDocuments_shouldRoundTrip() {
    let segmenter = MarkdownSegmenter::new();
    for document in DOCUMENTS.iter().chain(std::iter::once(&sample_markdown())) {
        let segments = segmenter.segment(document).unwrap();
        assert_eq!(MarkdownSegmenter::reconstruct(&segments), *document, "{:?}", document);
        for segment in &segments {
            assert_eq!(segment.restored(), segment.raw_text, "{:?}", segment);
        }
    }
}

#[test]
fn test_segment_ids_shouldFollowSourceOrder() {
    let segments = MarkdownSegmenter::new().segment(sample_markdown()).unwrap();
    let ids: Vec<usize> = segments.iter().map(|s| s.id).collect();
    assert_eq!(ids, (0..segments.len()).collect::<Vec<_>>());
}

#[test]
fn test_segment_withSampleDocument_shouldOnlyTranslateProse() {
    let segments = MarkdownSegmenter::new().segment(sample_markdown()).unwrap();
    let kinds: Vec<SegmentKind> = segments.iter().filter(|s| s.is_translatable()).map(|s| s.kind).collect();

    assert_eq!(
        kinds,
        vec![
            SegmentKind::Heading,
            SegmentKind::Paragraph,
            SegmentKind::ListItem,
            SegmentKind::ListItem,
            SegmentKind::Blockquote,
        ]
    );
    assert!(segments.iter().any(|s| s.kind == SegmentKind::Frontmatter));
    assert!(segments.iter().any(|s| s.kind == SegmentKind::CodeBlock && s.raw_text.contains("make build")));
}

#[test]
fn test_protect_withEveryInlineKind_shouldRestoreVerbatim() {
    let text = "See <https://a.io>, ![img](p.png), `x < y`, {user} at 3.5% and www.example.org/path?q=1";
    let protected = MarkdownSegmenter::new().protect(text);

    assert_eq!(protected.restore(), text);
    let kinds: Vec<PlaceholderKind> = protected.placeholders.iter().map(|p| p.kind).collect();
    assert!(kinds.contains(&PlaceholderKind::Autolink));
    assert!(kinds.contains(&PlaceholderKind::Image));
    assert!(kinds.contains(&PlaceholderKind::InlineCode));
    assert!(kinds.contains(&PlaceholderKind::Template));
    assert!(kinds.contains(&PlaceholderKind::Number));
}

#[test]
fn test_protect_markers_shouldBeNumberedLeftToRight() {
    let protected = MarkdownSegmenter::new().protect("`a` then `b` then `c`");
    assert_eq!(protected.placeholders.markers(), vec!["__PH0__", "__PH1__", "__PH2__"]);
    assert_eq!(protected.text, "__PH0__ then __PH1__ then __PH2__");
}

#[test]
fn test_withProtectedPatterns_withInvalidRegex_shouldFail() {
    assert!(MarkdownSegmenter::with_protected_patterns(&["[".to_string()]).is_err());
}
