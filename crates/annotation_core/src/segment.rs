//! crates/annotation_core/src/segment.rs
//!
//! Partitions document text into renderable segments given a set of
//! possibly-overlapping highlights.
//!
//! The output covers `[0, content_len)` exactly once, in document order,
//! with no gaps and no overlaps, even though the input highlights may
//! overlap or reach past the end of the content. When two highlights
//! contest a region, the one with the smaller `start` owns it entirely;
//! the later one is truncated, or dropped if fully consumed.

use crate::domain::Highlight;
use serde::Serialize;

/// A contiguous slice of document text, optionally bound to one highlight.
/// `start`/`end` are `char` offsets into the content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight: Option<Highlight>,
    pub start: usize,
    pub end: usize,
}

/// Byte offsets of every char boundary in `content`, plus the total length.
/// Index by char offset to slice without ever splitting a codepoint.
pub(crate) fn char_boundaries(content: &str) -> Vec<usize> {
    let mut bounds: Vec<usize> = content.char_indices().map(|(i, _)| i).collect();
    bounds.push(content.len());
    bounds
}

/// Splits `content` into an ordered, disjoint, covering sequence of
/// segments.
pub fn segment(content: &str, highlights: &[Highlight]) -> Vec<Segment> {
    let bounds = char_boundaries(content);
    let content_len = bounds.len() - 1;
    let slice = |start: usize, end: usize| content[bounds[start]..bounds[end]].to_string();

    if highlights.is_empty() {
        return vec![Segment {
            text: content.to_string(),
            highlight: None,
            start: 0,
            end: content_len,
        }];
    }

    // Stable sort: equal starts keep their insertion order.
    let mut sorted: Vec<&Highlight> = highlights.iter().collect();
    sorted.sort_by_key(|h| h.start);

    let mut segments = Vec::with_capacity(sorted.len() * 2 + 1);
    let mut cursor = 0usize;

    for highlight in sorted {
        let end = highlight.end.min(content_len);
        if end <= cursor {
            // Empty after clamping, or entirely consumed by an earlier highlight.
            continue;
        }
        let start = highlight.start.max(cursor);
        if start >= end {
            continue;
        }
        if start > cursor {
            segments.push(Segment {
                text: slice(cursor, start),
                highlight: None,
                start: cursor,
                end: start,
            });
        }
        segments.push(Segment {
            text: slice(start, end),
            highlight: Some(highlight.clone()),
            start,
            end,
        });
        cursor = end;
    }

    if cursor < content_len {
        segments.push(Segment {
            text: slice(cursor, content_len),
            highlight: None,
            start: cursor,
            end: content_len,
        });
    }

    segments
}
