//! crates/annotation_core/src/focus.rs
//!
//! The small state machine over the scroll and focus cursors.
//!
//! The cursors themselves live in the store; this module supplies the
//! transition decisions and the derived booleans the rendering collaborator
//! consumes. "Focus mode" has no storage of its own: it is exactly
//! `focused_highlight_id != None`.
//!
//! Sequencing contract for scrolling: the consumer dispatches
//! `SetScrollTarget(Some(id))`, and once it has located and scrolled to the
//! element it sets focus to `id`, then after `SCROLL_CLEAR_DELAY_MS` clears
//! the scroll target back to idle. A scroll target naming a highlight that
//! cannot be located simply stays pending with no observable effect until
//! it is changed or cleared.

use crate::store::StoreState;
use uuid::Uuid;

/// How long the consumer waits after a scroll lands before clearing the
/// scroll cursor, purely to let the visual transition complete.
pub const SCROLL_CLEAR_DELAY_MS: u64 = 300;

/// The scroll axis of the machine: idle, or one pending one-shot scroll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollState {
    Idle,
    Pending(Uuid),
}

/// Click-to-toggle contract for clicking a highlight directly in the
/// document: clicking the focused highlight clears focus, clicking any
/// other highlight moves focus to it.
pub fn toggle_target(current: Option<Uuid>, clicked: Uuid) -> Option<Uuid> {
    if current == Some(clicked) {
        None
    } else {
        Some(clicked)
    }
}

/// Read-only focus/scroll view over one store snapshot.
#[derive(Debug, Clone, Copy)]
pub struct FocusView<'a> {
    state: &'a StoreState,
}

impl<'a> FocusView<'a> {
    pub fn new(state: &'a StoreState) -> Self {
        Self { state }
    }

    pub fn scroll_state(&self) -> ScrollState {
        match self.state.scroll_to_highlight_id {
            Some(id) => ScrollState::Pending(id),
            None => ScrollState::Idle,
        }
    }

    /// Whether a one-shot scroll to `id` is still pending.
    pub fn is_scroll_pending(&self, id: Uuid) -> bool {
        self.state.scroll_to_highlight_id == Some(id)
    }

    /// Whether `id` is the focused highlight.
    pub fn is_focused(&self, id: Uuid) -> bool {
        self.state.focused_highlight_id == Some(id)
    }

    /// Whether anything is focused; consumers dim all content not belonging
    /// to the focused highlight while this holds.
    pub fn is_focus_mode(&self) -> bool {
        self.state.focused_highlight_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::{toggle_target, FocusView, ScrollState};
    use crate::domain::Highlight;
    use crate::store::{apply, Action, StoreState};
    use uuid::Uuid;

    #[test]
    fn toggle_focuses_then_clears_then_switches() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(toggle_target(None, a), Some(a));
        assert_eq!(toggle_target(Some(a), a), None);
        assert_eq!(toggle_target(Some(a), b), Some(b));
    }

    #[test]
    fn focus_mode_is_derived_from_the_focus_cursor() {
        let state = StoreState::default();
        assert!(!FocusView::new(&state).is_focus_mode());

        let id = Uuid::new_v4();
        let state = apply(
            &state,
            Action::SetFocus {
                highlight_id: Some(id),
            },
        );
        let view = FocusView::new(&state);
        assert!(view.is_focus_mode());
        assert!(view.is_focused(id));
        assert!(!view.is_focused(Uuid::new_v4()));
    }

    #[test]
    fn scroll_request_moves_to_pending_and_clear_returns_to_idle() {
        let state = StoreState::default();
        let id = Uuid::new_v4();
        let state = apply(
            &state,
            Action::SetScrollTarget {
                highlight_id: Some(id),
            },
        );
        assert_eq!(FocusView::new(&state).scroll_state(), ScrollState::Pending(id));
        assert!(FocusView::new(&state).is_scroll_pending(id));

        let state = apply(&state, Action::SetScrollTarget { highlight_id: None });
        assert_eq!(FocusView::new(&state).scroll_state(), ScrollState::Idle);
    }

    #[test]
    fn dangling_scroll_target_has_no_effect_on_focus() {
        // requestScroll(id) for an id that is not among the highlights:
        // the cursor stays pending and focus is untouched.
        let mut state = StoreState::with_content("some document text");
        let live = Highlight::new(0, 4, None);
        state = apply(
            &state,
            Action::AddHighlight {
                highlight: live.clone(),
            },
        );
        state = apply(
            &state,
            Action::SetFocus {
                highlight_id: Some(live.id),
            },
        );

        let dangling = Uuid::new_v4();
        let state = apply(
            &state,
            Action::SetScrollTarget {
                highlight_id: Some(dangling),
            },
        );
        let view = FocusView::new(&state);
        assert!(view.is_scroll_pending(dangling));
        assert_eq!(state.focused_highlight_id, Some(live.id));
    }

    #[test]
    fn both_cursors_may_be_set_during_a_transition() {
        let id = Uuid::new_v4();
        let state = apply(
            &StoreState::default(),
            Action::SetScrollTarget {
                highlight_id: Some(id),
            },
        );
        let state = apply(
            &state,
            Action::SetFocus {
                highlight_id: Some(id),
            },
        );
        let view = FocusView::new(&state);
        assert!(view.is_scroll_pending(id));
        assert!(view.is_focused(id));
    }
}
