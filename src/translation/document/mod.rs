/*!
 * Document modeling for markdown translation.
 *
 * This module provides the segment model shared by every pipeline stage:
 * - Segments tagged by block kind
 * - Placeholder maps that make marker substitution reversible
 * - Link parts so labels can be translated without touching targets
 */

pub mod model;

pub use model::{
    Document, LinkParts, PLACEHOLDER_MARKER_REGEX, Placeholder, PlaceholderKind, PlaceholderMap,
    ProtectedText, Segment, SegmentKind, has_translatable_text, placeholder_marker,
};
