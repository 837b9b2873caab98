//! services/api/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a WebSocket connection.
//! It maps client messages onto store actions, broadcasts the resulting
//! snapshots, and delegates streaming replies to the chat task.

use crate::web::{
    chat_task::chat_process,
    protocol::{ClientMessage, ServerMessage},
    state::{AppState, SessionState},
};
use annotation_core::citation::{resolve_citation, CitationTarget};
use annotation_core::domain::{Citation, Comment, Highlight, Message as TranscriptEntry};
use annotation_core::focus::{toggle_target, SCROLL_CLEAR_DELAY_MS};
use annotation_core::store::Action;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{
    stream::{SplitSink, StreamExt},
    SinkExt,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::{sync::Mutex, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Serializes one server message and sends it as a text frame. Returns
/// whether the client is still reachable.
pub(crate) async fn send_server_message(
    ws_sender: &Arc<Mutex<SplitSink<WebSocket, Message>>>,
    message: &ServerMessage,
) -> bool {
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize server message: {}", e);
            return false;
        }
    };
    ws_sender
        .lock()
        .await
        .send(Message::Text(json.into()))
        .await
        .is_ok()
}

/// Applies a batch of actions under the session lock, then broadcasts the
/// new snapshot. Consumers re-render entirely from that snapshot.
async fn dispatch_and_broadcast(
    session_state_lock: &Arc<Mutex<SessionState>>,
    ws_sender: &Arc<Mutex<SplitSink<WebSocket, Message>>>,
    actions: Vec<Action>,
) {
    let snapshot = {
        let mut session = session_state_lock.lock().await;
        for action in actions {
            session.dispatch(action);
        }
        session.store.clone()
    };
    send_server_message(ws_sender, &ServerMessage::State { snapshot }).await;
}

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(ws: WebSocketUpgrade, State(app_state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    info!("New WebSocket connection established.");

    // The sender is wrapped in an Arc<Mutex<>> to allow for shared mutable
    // access across tasks.
    let (sender, mut receiver) = socket.split();
    let ws_sender = Arc::new(Mutex::new(sender));

    let session_state_lock: Arc<Mutex<SessionState>>;

    // --- 1. Initialization Phase ---
    if let Some(Ok(Message::Text(init_json))) = receiver.next().await {
        match serde_json::from_str::<ClientMessage>(&init_json) {
            Ok(ClientMessage::Init { session_id }) => {
                info!("Initializing session with ID: {}", session_id);
                match app_state.session(session_id).await {
                    Some(lock) => {
                        session_state_lock = lock;
                        let init_msg = ServerMessage::SessionInitialized { session_id };
                        if !send_server_message(&ws_sender, &init_msg).await {
                            error!("Failed to send session initialized message.");
                            return;
                        }
                        // Bring the client up to date immediately.
                        let snapshot = session_state_lock.lock().await.store.clone();
                        if !send_server_message(&ws_sender, &ServerMessage::State { snapshot })
                            .await
                        {
                            error!("Failed to send the initial state snapshot.");
                            return;
                        }
                    }
                    None => {
                        error!("Unknown session id: {}", session_id);
                        let err_msg = ServerMessage::Error {
                            message: "Unknown session id.".to_string(),
                        };
                        send_server_message(&ws_sender, &err_msg).await;
                        return;
                    }
                }
            }
            _ => {
                error!("First message was not a valid Init message.");
                return;
            }
        }
    } else {
        error!("Client disconnected before sending Init message.");
        return;
    }

    // --- 2. Main Message Loop ---
    let mut chat_task_handle: Option<JoinHandle<()>> = None;

    loop {
        if let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    handle_text_message(
                        text.to_string(),
                        &app_state,
                        &session_state_lock,
                        &ws_sender,
                        &mut chat_task_handle,
                    )
                    .await;
                }
                Message::Close(_) => {
                    info!("Client sent close message.");
                    break;
                }
                _ => {}
            }
        } else {
            info!("Client disconnected.");
            break;
        }
    }

    // --- 3. Cleanup ---
    // Cancel rather than abort: the chat task commits its partial reply and
    // clears the loading flag before exiting.
    {
        let session = session_state_lock.lock().await;
        session.cancellation_token.cancel();
    }
    drop(chat_task_handle);
    info!("WebSocket connection closed.");
}

/// Helper function to handle the logic for different `ClientMessage` variants.
async fn handle_text_message(
    text: String,
    app_state: &Arc<AppState>,
    session_state_lock: &Arc<Mutex<SessionState>>,
    ws_sender: &Arc<Mutex<SplitSink<WebSocket, Message>>>,
    chat_task_handle: &mut Option<JoinHandle<()>>,
) {
    match serde_json::from_str::<ClientMessage>(&text) {
        Ok(client_msg) => match client_msg {
            ClientMessage::Init { .. } => {
                warn!("Received subsequent Init message, which is ignored.");
            }
            ClientMessage::UserMessage { text } => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    // Boundary precondition: the action is simply not issued.
                    return;
                }
                let (token, snapshot) = {
                    let mut session = session_state_lock.lock().await;
                    if session.store.loading {
                        warn!("UserMessage received while a reply is in flight; ignored.");
                        return;
                    }
                    session.dispatch(Action::AddMessage {
                        message: TranscriptEntry::user(trimmed),
                    });
                    session.dispatch(Action::SetLoading { loading: true });
                    session.cancellation_token = CancellationToken::new();
                    (session.cancellation_token.clone(), session.store.clone())
                };
                send_server_message(ws_sender, &ServerMessage::State { snapshot }).await;

                let task = {
                    let app_state = app_state.clone();
                    let session_state_lock = session_state_lock.clone();
                    let ws_sender = ws_sender.clone();
                    tokio::spawn(async move {
                        if let Err(e) =
                            chat_process(app_state, session_state_lock, ws_sender, token).await
                        {
                            error!("Chat process failed: {:?}", e);
                        }
                    })
                };
                *chat_task_handle = Some(task);
            }
            ClientMessage::UpdateDocument { content } => {
                dispatch_and_broadcast(
                    session_state_lock,
                    ws_sender,
                    vec![Action::SetContent { content }],
                )
                .await;
            }
            ClientMessage::AbortResponse => {
                info!("AbortResponse received. Cancelling the streaming reply.");
                let session = session_state_lock.lock().await;
                session.cancellation_token.cancel();
            }
            ClientMessage::AddHighlight { start, end, color } => {
                dispatch_and_broadcast(
                    session_state_lock,
                    ws_sender,
                    vec![Action::AddHighlight {
                        highlight: Highlight::new(start, end, color),
                    }],
                )
                .await;
            }
            ClientMessage::RemoveHighlight { highlight_id } => {
                dispatch_and_broadcast(
                    session_state_lock,
                    ws_sender,
                    vec![Action::RemoveHighlight { highlight_id }],
                )
                .await;
            }
            ClientMessage::ClearHighlights => {
                dispatch_and_broadcast(session_state_lock, ws_sender, vec![Action::ClearHighlights])
                    .await;
            }
            ClientMessage::AddComment { highlight_id, text } => {
                dispatch_and_broadcast(
                    session_state_lock,
                    ws_sender,
                    vec![Action::AddComment {
                        comment: Comment::new(highlight_id, text),
                    }],
                )
                .await;
            }
            ClientMessage::RemoveComment { comment_id } => {
                dispatch_and_broadcast(
                    session_state_lock,
                    ws_sender,
                    vec![Action::RemoveComment { comment_id }],
                )
                .await;
            }
            ClientMessage::ToggleFocus { highlight_id } => {
                let snapshot = {
                    let mut session = session_state_lock.lock().await;
                    let next = toggle_target(session.store.focused_highlight_id, highlight_id);
                    session.dispatch(Action::SetFocus { highlight_id: next });
                    session.store.clone()
                };
                send_server_message(ws_sender, &ServerMessage::State { snapshot }).await;
            }
            ClientMessage::ClearFocus => {
                dispatch_and_broadcast(
                    session_state_lock,
                    ws_sender,
                    vec![Action::SetFocus { highlight_id: None }],
                )
                .await;
            }
            ClientMessage::ActivateCitation { start, end } => {
                activate_citation(session_state_lock, ws_sender, Citation { start, end }).await;
            }
            ClientMessage::ScrollSettled { highlight_id } => {
                scroll_settled(session_state_lock, ws_sender, highlight_id).await;
            }
        },
        Err(e) => {
            warn!("Failed to deserialize client message: {}", e);
        }
    }
}

/// Reuses or creates the highlight for an activated citation, then points
/// both cursors at it. Activating the same range twice never creates a
/// second highlight.
async fn activate_citation(
    session_state_lock: &Arc<Mutex<SessionState>>,
    ws_sender: &Arc<Mutex<SplitSink<WebSocket, Message>>>,
    citation: Citation,
) {
    let snapshot = {
        let mut session = session_state_lock.lock().await;
        let Some(target) = resolve_citation(&session.store, citation) else {
            // No visible text for this range in the current document.
            info!(
                "Citation [{}:{}] is outside the document; ignoring activation.",
                citation.start, citation.end
            );
            return;
        };
        let highlight_id = target.highlight_id();
        if let CitationTarget::Create { highlight } = target {
            session.dispatch(Action::AddHighlight { highlight });
        }
        session.dispatch(Action::SetScrollTarget {
            highlight_id: Some(highlight_id),
        });
        session.dispatch(Action::SetFocus {
            highlight_id: Some(highlight_id),
        });
        session.store.clone()
    };
    send_server_message(ws_sender, &ServerMessage::State { snapshot }).await;
}

/// The viewer located and scrolled to the pending target: focus it now and
/// clear the one-shot scroll cursor once the visual transition has had time
/// to complete.
async fn scroll_settled(
    session_state_lock: &Arc<Mutex<SessionState>>,
    ws_sender: &Arc<Mutex<SplitSink<WebSocket, Message>>>,
    highlight_id: Uuid,
) {
    dispatch_and_broadcast(
        session_state_lock,
        ws_sender,
        vec![Action::SetFocus {
            highlight_id: Some(highlight_id),
        }],
    )
    .await;

    let session_state_lock = session_state_lock.clone();
    let ws_sender = ws_sender.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(SCROLL_CLEAR_DELAY_MS)).await;
        let snapshot = {
            let mut session = session_state_lock.lock().await;
            // The target may have moved on while we slept; leave it alone then.
            if session.store.scroll_to_highlight_id != Some(highlight_id) {
                return;
            }
            session.dispatch(Action::SetScrollTarget { highlight_id: None });
            session.store.clone()
        };
        send_server_message(&ws_sender, &ServerMessage::State { snapshot }).await;
    });
}
