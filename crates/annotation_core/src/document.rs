//! crates/annotation_core/src/document.rs
//!
//! The two tool-like query contracts the engine exposes to the language
//! model collaborator: find the ranges where a snippet occurs, and return
//! the exact text for a range with optional surrounding context. Both
//! operate over the current document text only.

use crate::domain::Citation;
use crate::segment::char_boundaries;
use serde::Serialize;

/// The exact text of a clamped document range, with up to `padding` chars
/// of context on either side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RangeExcerpt {
    /// Clamped char offsets actually excerpted.
    pub start: usize,
    pub end: usize,
    /// The text of exactly `[start, end)`.
    pub text: String,
    /// The text widened by the padding, for quoting in context.
    pub context: String,
}

/// All non-overlapping occurrences of `snippet` in `content`, in document
/// order, as char ranges. An empty snippet matches nothing.
pub fn find_ranges(content: &str, snippet: &str) -> Vec<Citation> {
    if snippet.is_empty() {
        return Vec::new();
    }
    let snippet_chars = snippet.chars().count();
    let mut ranges = Vec::new();
    let mut byte_pos = 0usize;
    let mut char_pos = 0usize;
    while let Some(found) = content[byte_pos..].find(snippet) {
        char_pos += content[byte_pos..byte_pos + found].chars().count();
        ranges.push(Citation {
            start: char_pos,
            end: char_pos + snippet_chars,
        });
        char_pos += snippet_chars;
        byte_pos += found + snippet.len();
    }
    ranges
}

/// The exact document text for `[start, end)`, clamped to the content,
/// plus a context window of up to `padding` chars either side. Returns
/// `None` when the clamped range is empty.
pub fn range_text(content: &str, start: usize, end: usize, padding: usize) -> Option<RangeExcerpt> {
    let bounds = char_boundaries(content);
    let content_len = bounds.len() - 1;
    let end = end.min(content_len);
    let start = start.min(end);
    if start == end {
        return None;
    }
    let context_start = start.saturating_sub(padding);
    let context_end = (end + padding).min(content_len);
    Some(RangeExcerpt {
        start,
        end,
        text: content[bounds[start]..bounds[end]].to_string(),
        context: content[bounds[context_start]..bounds[context_end]].to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::{find_ranges, range_text};
    use crate::domain::Citation;

    const CONTENT: &str = "the cat sat on the mat; the cat left";

    #[test]
    fn finds_all_occurrences_in_order() {
        assert_eq!(
            find_ranges(CONTENT, "the cat"),
            vec![Citation { start: 0, end: 7 }, Citation { start: 24, end: 31 }]
        );
    }

    #[test]
    fn occurrences_do_not_overlap() {
        assert_eq!(
            find_ranges("aaaa", "aa"),
            vec![Citation { start: 0, end: 2 }, Citation { start: 2, end: 4 }]
        );
    }

    #[test]
    fn empty_or_absent_snippets_match_nothing() {
        assert!(find_ranges(CONTENT, "").is_empty());
        assert!(find_ranges(CONTENT, "dog").is_empty());
    }

    #[test]
    fn snippet_offsets_are_char_offsets() {
        let content = "héllo wörld, wörld";
        assert_eq!(
            find_ranges(content, "wörld"),
            vec![Citation { start: 6, end: 11 }, Citation { start: 13, end: 18 }]
        );
    }

    #[test]
    fn range_text_returns_exact_range_and_context() {
        let excerpt = range_text(CONTENT, 4, 7, 4).expect("non-empty range");
        assert_eq!(excerpt.text, "cat");
        assert_eq!(excerpt.context, "the cat sat");
        assert_eq!((excerpt.start, excerpt.end), (4, 7));
    }

    #[test]
    fn range_text_clamps_and_degrades_silently() {
        let excerpt = range_text(CONTENT, 32, 400, 2).expect("clamped range is non-empty");
        assert_eq!(excerpt.text, "left");
        assert_eq!(excerpt.end, CONTENT.len());

        assert!(range_text(CONTENT, 400, 500, 2).is_none());
        assert!(range_text(CONTENT, 7, 7, 2).is_none());
        assert!(range_text("", 0, 10, 2).is_none());
    }

    #[test]
    fn padding_never_escapes_the_document() {
        let excerpt = range_text(CONTENT, 0, 3, 50).expect("non-empty range");
        assert_eq!(excerpt.context, CONTENT);
    }
}
