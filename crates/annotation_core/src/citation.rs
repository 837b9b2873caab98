//! crates/annotation_core/src/citation.rs
//!
//! Extracts `[start:end]` citation markers from assistant output and
//! derives the display text shown to the user.
//!
//! The extractor is a pure function over whatever prefix of the reply has
//! arrived so far. Streaming callers simply re-run it on the growing
//! prefix: a half-written marker at the tail yields nothing for that
//! marker yet, and every citation emitted for a shorter prefix is emitted
//! again, in the same order, for a longer one.

use crate::domain::{Citation, Highlight, HighlightColor};
use crate::store::StoreState;
use regex::Regex;
use std::sync::OnceLock;
use uuid::Uuid;

/// The literal marker grammar. Half-open document char range, both bounds
/// base-10 digits.
const MARKER_PATTERN: &str = r"\[(\d+):(\d+)\]";

fn marker_regex() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| Regex::new(MARKER_PATTERN).expect("marker pattern compiles"))
}

/// The result of one extraction pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Accepted citations in left-to-right order of appearance. This order
    /// is the canonical "Source 1, Source 2, ..." numbering.
    pub citations: Vec<Citation>,
    /// The raw text with every bracket marker removed, whitespace runs
    /// collapsed, and the ends trimmed.
    pub display_text: String,
}

/// Scans `text` for citation markers.
///
/// A marker is accepted only if both integers parse and `end > start`;
/// inverted or degenerate ranges are silently discarded, never reported.
/// Rejected markers are still removed from the display text.
pub fn extract(text: &str) -> Extraction {
    let mut citations = Vec::new();
    for caps in marker_regex().captures_iter(text) {
        let start = caps[1].parse::<usize>();
        let end = caps[2].parse::<usize>();
        if let (Ok(start), Ok(end)) = (start, end) {
            if end > start {
                citations.push(Citation { start, end });
            }
        }
    }
    Extraction {
        citations,
        display_text: display_text(text),
    }
}

/// Removes every occurrence of the bracket pattern (accepted or not),
/// collapses runs of two or more whitespace characters into one space, and
/// trims. Deterministic regardless of how many citations were accepted.
fn display_text(text: &str) -> String {
    let stripped = marker_regex().replace_all(text, "");
    let mut out = String::with_capacity(stripped.len());
    let mut run_len = 0usize;
    let mut run_first = ' ';
    for c in stripped.chars() {
        if c.is_whitespace() {
            if run_len == 0 {
                run_first = c;
            }
            run_len += 1;
        } else {
            match run_len {
                0 => {}
                1 => out.push(run_first),
                _ => out.push(' '),
            }
            run_len = 0;
            out.push(c);
        }
    }
    out.trim().to_string()
}

//=========================================================================================
// Citation-to-Highlight Resolution
//=========================================================================================

/// What activating a citation should do to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CitationTarget {
    /// A highlight with this exact range already exists; reuse its id.
    Existing { highlight_id: Uuid },
    /// No highlight matches; the caller should add this freshly built one
    /// (then scroll to and focus its id).
    Create { highlight: Highlight },
}

impl CitationTarget {
    /// The highlight id the scroll and focus cursors should point at.
    pub fn highlight_id(&self) -> Uuid {
        match self {
            CitationTarget::Existing { highlight_id } => *highlight_id,
            CitationTarget::Create { highlight } => highlight.id,
        }
    }
}

/// Resolves an activated citation against a snapshot.
///
/// Looks up a highlight whose range exactly equals the citation's; if one
/// exists its id is reused, making activation idempotent. Otherwise a new
/// highlight with a fresh id and the default color is prepared. A citation
/// with no visible text in the current document (its clamped range is
/// empty) resolves to `None` and the activation is a no-op.
pub fn resolve_citation(state: &StoreState, citation: Citation) -> Option<CitationTarget> {
    let content_len = state.content.chars().count();
    if citation.start >= content_len.min(citation.end) {
        return None;
    }
    match state.highlight_with_range(citation.start, citation.end) {
        Some(existing) => Some(CitationTarget::Existing {
            highlight_id: existing.id,
        }),
        None => Some(CitationTarget::Create {
            highlight: Highlight::new(
                citation.start,
                citation.end,
                Some(HighlightColor::default()),
            ),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::{extract, resolve_citation, CitationTarget};
    use crate::domain::{Citation, Highlight};
    use crate::store::{apply, Action, StoreState};

    #[test]
    fn extracts_citations_in_order_of_appearance() {
        let extraction = extract("First [10:20], then [0:4] again.");
        assert_eq!(
            extraction.citations,
            vec![Citation { start: 10, end: 20 }, Citation { start: 0, end: 4 }]
        );
        assert_eq!(extraction.display_text, "First , then again.");
    }

    #[test]
    fn inverted_range_is_discarded_but_still_stripped() {
        let extraction = extract("See [10:20] and [5:2].");
        assert_eq!(extraction.citations, vec![Citation { start: 10, end: 20 }]);
        assert_eq!(extraction.display_text, "See and .");
    }

    #[test]
    fn degenerate_and_overflowing_ranges_are_discarded() {
        let huge = "9".repeat(40);
        let text = format!("a [7:7] b [{huge}:{huge}] c");
        let extraction = extract(&text);
        assert!(extraction.citations.is_empty());
        assert_eq!(extraction.display_text, "a b c");
    }

    #[test]
    fn display_text_collapses_whitespace_and_trims() {
        let extraction = extract("  spaced [1:2]   out\n\ntext [3:1]  ");
        assert!(extraction.display_text.starts_with("spaced"));
        assert_eq!(extraction.display_text, "spaced out text");
    }

    #[test]
    fn single_whitespace_characters_survive_unchanged() {
        let extraction = extract("line one\nline two");
        assert_eq!(extraction.display_text, "line one\nline two");
    }

    #[test]
    fn truncated_trailing_marker_never_yields_or_throws() {
        for prefix_len in 0.."Answer [120:145] done".len() {
            let prefix = &"Answer [120:145] done"[..prefix_len];
            let extraction = extract(prefix);
            assert!(extraction.citations.len() <= 1);
        }
        let half_open = extract("Answer [120:1");
        assert!(half_open.citations.is_empty());
        // the unfinished marker is not a full bracket pattern, so it stays
        assert_eq!(half_open.display_text, "Answer [120:1");
    }

    #[test]
    fn successive_prefixes_yield_monotonic_citation_lists() {
        let full = "One [3:9] two [12:40] three [40:2] four [41:44].";
        let mut previous = Vec::new();
        for (idx, _) in full.char_indices() {
            let citations = extract(&full[..idx]).citations;
            assert!(citations.starts_with(&previous) || citations == previous);
            if citations.len() >= previous.len() {
                previous = citations;
            }
        }
        assert_eq!(
            extract(full).citations,
            vec![
                Citation { start: 3, end: 9 },
                Citation { start: 12, end: 40 },
                Citation { start: 41, end: 44 },
            ]
        );
    }

    #[test]
    fn resolution_reuses_an_exact_range_highlight() {
        let existing = Highlight::new(10, 20, None);
        let mut state = StoreState::with_content("x".repeat(50));
        state = apply(
            &state,
            Action::AddHighlight {
                highlight: existing.clone(),
            },
        );

        let target = resolve_citation(&state, Citation { start: 10, end: 20 })
            .expect("in-bounds citation resolves");
        assert_eq!(
            target,
            CitationTarget::Existing {
                highlight_id: existing.id
            }
        );
    }

    #[test]
    fn resolution_creates_once_then_reuses() {
        let mut state = StoreState::with_content("x".repeat(50));
        let citation = Citation { start: 5, end: 15 };

        let first = resolve_citation(&state, citation).expect("resolves");
        let CitationTarget::Create { highlight } = first else {
            panic!("first activation must create");
        };
        state = apply(
            &state,
            Action::AddHighlight {
                highlight: highlight.clone(),
            },
        );

        // second activation of the same range must not create a second one
        let second = resolve_citation(&state, citation).expect("resolves");
        assert_eq!(
            second,
            CitationTarget::Existing {
                highlight_id: highlight.id
            }
        );
        assert_eq!(
            state.highlights.iter().filter(|h| h.start == 5 && h.end == 15).count(),
            1
        );
    }

    #[test]
    fn citation_outside_the_document_resolves_to_nothing() {
        let state = StoreState::with_content("short");
        assert!(resolve_citation(&state, Citation { start: 10, end: 20 }).is_none());
        // partially out of bounds still resolves; the segmenter clamps it
        assert!(resolve_citation(&state, Citation { start: 2, end: 20 }).is_some());
    }
}
