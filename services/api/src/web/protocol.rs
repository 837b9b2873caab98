//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser client and the
//! API server for the annotated-document chat application.

use annotation_core::domain::{Citation, HighlightColor};
use annotation_core::store::StoreState;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
///
/// Every variant except `Init` maps onto store actions dispatched through
/// the core Mutator; none of them can fail, and a message referencing an id
/// that no longer exists is a no-op.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Initializes a session. This must be the first message sent on the connection.
    Init { session_id: Uuid },

    /// A chat message typed by the user. Ignored while a reply is streaming.
    UserMessage { text: String },

    /// Replaces the document content after a user edit. Highlights and
    /// comments are left as they are; ranges past the new end clamp at
    /// render time.
    UpdateDocument { content: String },

    /// Cancels the in-flight assistant reply. Whatever text and citations
    /// already streamed stay in the transcript.
    AbortResponse,

    /// Adds a highlight over a document char range selected by the user.
    AddHighlight {
        start: usize,
        end: usize,
        color: Option<HighlightColor>,
    },

    /// Removes a highlight and, with it, every comment attached to it.
    RemoveHighlight { highlight_id: Uuid },

    /// Removes all highlights and all comments.
    ClearHighlights,

    /// Attaches a comment to a highlight.
    AddComment { highlight_id: Uuid, text: String },

    /// Removes a single comment.
    RemoveComment { comment_id: Uuid },

    /// Click on a highlight in the document: focus it, or unfocus if it was
    /// already focused.
    ToggleFocus { highlight_id: Uuid },

    /// Click outside any highlight, or an escape/cancel signal.
    ClearFocus,

    /// Click on "Source N" in an assistant reply. Reuses or creates the
    /// highlight for that exact range, then scrolls to and focuses it.
    ActivateCitation { start: usize, end: usize },

    /// The viewer finished scrolling to the pending scroll target. The
    /// server focuses the highlight and clears the scroll cursor after a
    /// short delay.
    ScrollSettled { highlight_id: Uuid },
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirms successful session initialization.
    SessionInitialized { session_id: Uuid },

    /// Reports an error to the client, which should display an error message.
    Error { message: String },

    /// The full store snapshot after a mutation. Consumers re-render from
    /// this alone; the viewer recomputes segments from `content` and
    /// `highlights`.
    State { snapshot: StoreState },

    /// A streaming update for the in-flight assistant reply: the display
    /// text of the whole prefix received so far, with the citations
    /// extracted from it. Citations only ever grow across deltas.
    AssistantDelta {
        message_id: Uuid,
        display_text: String,
        citations: Vec<Citation>,
    },

    /// The in-flight reply finished (completed, failed, or aborted) and has
    /// been committed to the transcript.
    AssistantDone { message_id: Uuid },
}

#[cfg(test)]
mod tests {
    use super::ClientMessage;

    #[test]
    fn client_messages_deserialize_from_tagged_json() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"activate_citation","start":10,"end":20}"#)
                .expect("valid message");
        match msg {
            ClientMessage::ActivateCitation { start, end } => {
                assert_eq!((start, end), (10, 20));
            }
            other => panic!("unexpected variant: {:?}", other),
        }

        let msg: ClientMessage = serde_json::from_str(
            r#"{"type":"add_highlight","start":0,"end":4,"color":"pink"}"#,
        )
        .expect("valid message");
        match msg {
            ClientMessage::AddHighlight { color, .. } => {
                assert_eq!(color, Some(annotation_core::HighlightColor::Pink));
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn unknown_message_types_fail_to_parse() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"reboot"}"#).is_err());
    }
}
