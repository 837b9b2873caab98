//! crates/annotation_core/src/store.rs
//!
//! The canonical in-memory state of the annotation engine (the RangeStore)
//! and the single synchronous transition function that changes it.
//!
//! Every mutation anywhere in the system funnels through `apply`. The
//! function is pure and total: it never performs I/O, it is defined for
//! every action, and it returns a new snapshot instead of mutating in
//! place, so consumers can rely on identity-based change detection.

use crate::domain::{Comment, Highlight, Message};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

//=========================================================================================
// StoreState (One Immutable Snapshot)
//=========================================================================================

/// A snapshot of everything the engine knows: the document text, the
/// highlight and comment sets, the conversation transcript, the two
/// transient cursors, and the advisory busy flag.
///
/// The cursors may reference highlights that no longer exist; consumers
/// treat a dangling cursor as "render nothing", never as a fault.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreState {
    pub content: String,
    pub highlights: Vec<Highlight>,
    pub comments: Vec<Comment>,
    pub messages: Vec<Message>,
    // The cursors and busy flag are transient; snapshots missing them
    // deserialize to the idle defaults.
    #[serde(default)]
    pub scroll_to_highlight_id: Option<Uuid>,
    #[serde(default)]
    pub focused_highlight_id: Option<Uuid>,
    #[serde(default)]
    pub loading: bool,
}

impl StoreState {
    /// Creates a snapshot holding only document content.
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    /// Looks up a highlight by id. First match wins if ids collide.
    pub fn highlight(&self, id: Uuid) -> Option<&Highlight> {
        self.highlights.iter().find(|h| h.id == id)
    }

    /// Looks up a highlight whose range exactly equals `[start, end)`.
    pub fn highlight_with_range(&self, start: usize, end: usize) -> Option<&Highlight> {
        self.highlights
            .iter()
            .find(|h| h.start == start && h.end == end)
    }

    /// The comments attached to one highlight, in insertion order.
    pub fn comments_for(&self, highlight_id: Uuid) -> impl Iterator<Item = &Comment> {
        self.comments
            .iter()
            .filter(move |c| c.highlight_id == highlight_id)
    }
}

//=========================================================================================
// Action (The Closed Mutation Vocabulary)
//=========================================================================================

/// The complete set of mutations the store understands.
///
/// Each variant carries only the fields it needs; `apply` matches
/// exhaustively so an unhandled variant is a compile error rather than a
/// silent no-op.
#[derive(Debug, Clone)]
pub enum Action {
    /// Replaces the document content verbatim. Highlights and comments are
    /// left untouched; out-of-range highlights degrade through Segmenter
    /// clamping on the next run.
    SetContent { content: String },
    /// Appends a highlight. No dedup by id and no range validation.
    AddHighlight { highlight: Highlight },
    /// Removes the highlight and every comment that references it.
    RemoveHighlight { highlight_id: Uuid },
    /// Empties highlights and comments together.
    ClearHighlights,
    /// Appends a comment. The referenced highlight is not verified to exist.
    AddComment { comment: Comment },
    /// Removes a single comment.
    RemoveComment { comment_id: Uuid },
    /// Appends a transcript entry. The transcript is never reordered.
    AddMessage { message: Message },
    /// Empties the transcript.
    ClearMessages,
    /// Sets or clears the one-shot scroll cursor.
    SetScrollTarget { highlight_id: Option<Uuid> },
    /// Sets or clears the sticky focus cursor.
    SetFocus { highlight_id: Option<Uuid> },
    /// Sets the advisory busy flag consumers use to disable input.
    SetLoading { loading: bool },
    /// Returns to the initial empty state. Loses content.
    Reset,
}

//=========================================================================================
// The Transition Function
//=========================================================================================

/// Applies one action to a snapshot, producing the next snapshot.
///
/// No action can fail: referential dangling is tolerated by design and
/// removal of an absent id is a no-op that still yields a fresh snapshot.
pub fn apply(state: &StoreState, action: Action) -> StoreState {
    match action {
        Action::SetContent { content } => StoreState {
            content,
            ..state.clone()
        },
        Action::AddHighlight { highlight } => {
            let mut highlights = state.highlights.clone();
            highlights.push(highlight);
            StoreState {
                highlights,
                ..state.clone()
            }
        }
        Action::RemoveHighlight { highlight_id } => StoreState {
            highlights: state
                .highlights
                .iter()
                .filter(|h| h.id != highlight_id)
                .cloned()
                .collect(),
            comments: state
                .comments
                .iter()
                .filter(|c| c.highlight_id != highlight_id)
                .cloned()
                .collect(),
            ..state.clone()
        },
        Action::ClearHighlights => StoreState {
            highlights: Vec::new(),
            comments: Vec::new(),
            ..state.clone()
        },
        Action::AddComment { comment } => {
            let mut comments = state.comments.clone();
            comments.push(comment);
            StoreState {
                comments,
                ..state.clone()
            }
        }
        Action::RemoveComment { comment_id } => StoreState {
            comments: state
                .comments
                .iter()
                .filter(|c| c.id != comment_id)
                .cloned()
                .collect(),
            ..state.clone()
        },
        Action::AddMessage { message } => {
            let mut messages = state.messages.clone();
            messages.push(message);
            StoreState {
                messages,
                ..state.clone()
            }
        }
        Action::ClearMessages => StoreState {
            messages: Vec::new(),
            ..state.clone()
        },
        Action::SetScrollTarget { highlight_id } => StoreState {
            scroll_to_highlight_id: highlight_id,
            ..state.clone()
        },
        Action::SetFocus { highlight_id } => StoreState {
            focused_highlight_id: highlight_id,
            ..state.clone()
        },
        Action::SetLoading { loading } => StoreState {
            loading,
            ..state.clone()
        },
        Action::Reset => StoreState::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::{apply, Action, StoreState};
    use crate::domain::{Comment, Highlight, Message};

    fn state_with_highlights() -> (StoreState, Highlight, Highlight) {
        let a = Highlight::new(0, 5, None);
        let b = Highlight::new(10, 20, None);
        let mut state = StoreState::with_content("the quick brown fox jumps over");
        state = apply(
            &state,
            Action::AddHighlight {
                highlight: a.clone(),
            },
        );
        state = apply(
            &state,
            Action::AddHighlight {
                highlight: b.clone(),
            },
        );
        (state, a, b)
    }

    #[test]
    fn set_content_leaves_annotations_untouched() {
        let (state, a, _) = state_with_highlights();
        let state = apply(
            &state,
            Action::AddComment {
                comment: Comment::new(a.id, "note"),
            },
        );
        let next = apply(
            &state,
            Action::SetContent {
                content: "tiny".to_string(),
            },
        );
        assert_eq!(next.content, "tiny");
        assert_eq!(next.highlights, state.highlights);
        assert_eq!(next.comments, state.comments);
    }

    #[test]
    fn remove_highlight_cascades_to_its_comments_only() {
        let (state, a, b) = state_with_highlights();
        let on_a = Comment::new(a.id, "on a");
        let on_b = Comment::new(b.id, "on b");
        let state = apply(
            &state,
            Action::AddComment {
                comment: on_a.clone(),
            },
        );
        let state = apply(
            &state,
            Action::AddComment {
                comment: on_b.clone(),
            },
        );

        let next = apply(&state, Action::RemoveHighlight { highlight_id: a.id });
        assert!(next.highlight(a.id).is_none());
        assert!(next.highlight(b.id).is_some());
        assert_eq!(next.comments, vec![on_b]);
    }

    #[test]
    fn clear_highlights_empties_comments_too() {
        let (state, a, _) = state_with_highlights();
        let state = apply(
            &state,
            Action::AddComment {
                comment: Comment::new(a.id, "note"),
            },
        );
        let next = apply(&state, Action::ClearHighlights);
        assert!(next.highlights.is_empty());
        assert!(next.comments.is_empty());
    }

    #[test]
    fn remove_comment_removes_exactly_one() {
        let (state, a, _) = state_with_highlights();
        let first = Comment::new(a.id, "first");
        let second = Comment::new(a.id, "second");
        let state = apply(
            &state,
            Action::AddComment {
                comment: first.clone(),
            },
        );
        let state = apply(
            &state,
            Action::AddComment {
                comment: second.clone(),
            },
        );
        let next = apply(&state, Action::RemoveComment { comment_id: first.id });
        assert_eq!(next.comments, vec![second]);
    }

    #[test]
    fn dangling_removals_are_noops() {
        let (state, _, _) = state_with_highlights();
        let next = apply(
            &state,
            Action::RemoveHighlight {
                highlight_id: uuid::Uuid::new_v4(),
            },
        );
        assert_eq!(next.highlights, state.highlights);
        let next = apply(
            &next,
            Action::RemoveComment {
                comment_id: uuid::Uuid::new_v4(),
            },
        );
        assert!(next.comments.is_empty());
    }

    #[test]
    fn add_highlight_does_not_dedup_by_id() {
        let (state, a, _) = state_with_highlights();
        let next = apply(
            &state,
            Action::AddHighlight {
                highlight: a.clone(),
            },
        );
        assert_eq!(next.highlights.len(), 3);
        // lookup still resolves to the first occurrence
        assert_eq!(next.highlight(a.id), Some(&a));
    }

    #[test]
    fn transcript_is_append_only_in_order() {
        let mut state = StoreState::default();
        let first = Message::user("hello");
        let second = Message::assistant("hi", Vec::new());
        state = apply(
            &state,
            Action::AddMessage {
                message: first.clone(),
            },
        );
        state = apply(
            &state,
            Action::AddMessage {
                message: second.clone(),
            },
        );
        assert_eq!(state.messages, vec![first, second]);

        let cleared = apply(&state, Action::ClearMessages);
        assert!(cleared.messages.is_empty());
    }

    #[test]
    fn cursors_and_loading_flag_round_trip() {
        let (state, a, _) = state_with_highlights();
        let state = apply(
            &state,
            Action::SetScrollTarget {
                highlight_id: Some(a.id),
            },
        );
        let state = apply(
            &state,
            Action::SetFocus {
                highlight_id: Some(a.id),
            },
        );
        let state = apply(&state, Action::SetLoading { loading: true });
        assert_eq!(state.scroll_to_highlight_id, Some(a.id));
        assert_eq!(state.focused_highlight_id, Some(a.id));
        assert!(state.loading);

        // cursors may outlive their highlight
        let state = apply(&state, Action::RemoveHighlight { highlight_id: a.id });
        assert_eq!(state.focused_highlight_id, Some(a.id));
        assert!(state.highlight(a.id).is_none());
    }

    #[test]
    fn reset_returns_to_the_initial_state() {
        let (state, _, _) = state_with_highlights();
        let next = apply(&state, Action::Reset);
        assert_eq!(next, StoreState::default());
    }

    #[test]
    fn snapshot_round_trips_through_serde() {
        let (state, a, _) = state_with_highlights();
        let state = apply(
            &state,
            Action::AddComment {
                comment: Comment::new(a.id, "note"),
            },
        );
        let json = serde_json::to_string(&state).expect("serialize snapshot");
        let back: StoreState = serde_json::from_str(&json).expect("deserialize snapshot");
        assert_eq!(back, state);
    }
}
