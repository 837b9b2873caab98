//! services/api/src/web/chat_task.rs
//!
//! This module contains the asynchronous "worker" function responsible for
//! one streaming assistant reply.
//!
//! The worker snapshots the document and transcript, opens the reply stream,
//! and re-runs citation extraction over the whole accumulated prefix on
//! every fragment. When the stream ends -- completed, failed, or cancelled --
//! whatever prefix was reached is committed to the transcript as a single
//! message. Nothing is ever rolled back.

use crate::web::{
    protocol::ServerMessage,
    state::{AppState, SessionState},
    ws_handler::send_server_message,
};
use annotation_core::citation::extract;
use annotation_core::domain::{Message as TranscriptEntry, Role};
use annotation_core::ports::{PortError, PortResult};
use annotation_core::store::Action;
use axum::extract::ws::{Message, WebSocket};
use futures::{stream::SplitSink, StreamExt};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

/// The main asynchronous task for streaming one assistant reply.
///
/// Designed to be gracefully cancelled via a `CancellationToken`; the
/// `loading` flag is cleared on every exit path so the session can accept
/// the next user message.
pub async fn chat_process(
    app_state: Arc<AppState>,
    session_state_lock: Arc<Mutex<SessionState>>,
    ws_sender: Arc<Mutex<SplitSink<WebSocket, Message>>>,
    cancellation_token: CancellationToken,
) -> PortResult<()> {
    info!("Chat process started.");

    let (document, transcript) = {
        let session = session_state_lock.lock().await;
        (
            session.store.content.clone(),
            session.store.messages.clone(),
        )
    };

    // The id is fixed up front so every delta and the final transcript
    // entry refer to the same message.
    let message_id = Uuid::new_v4();

    let mut raw = String::new();
    let mut aborted = false;
    let mut failure: Option<PortError> = None;

    match app_state
        .chat_adapter
        .stream_reply(&document, &transcript)
        .await
    {
        Ok(mut stream) => loop {
            tokio::select! {
                _ = cancellation_token.cancelled() => {
                    info!("Chat process cancelled. Keeping the partial reply.");
                    aborted = true;
                    break;
                }
                next = stream.next() => match next {
                    Some(Ok(fragment)) => {
                        raw.push_str(&fragment);
                        // Re-derive from the whole prefix rather than keeping
                        // incremental parse state; markers split across
                        // fragments resolve once their tail arrives.
                        let extraction = extract(&raw);
                        let delta = ServerMessage::AssistantDelta {
                            message_id,
                            display_text: extraction.display_text,
                            citations: extraction.citations,
                        };
                        if !send_server_message(&ws_sender, &delta).await {
                            warn!("Client went away mid-reply; the reply will still be committed.");
                        }
                    }
                    Some(Err(e)) => {
                        error!("Reply stream failed: {:?}", e);
                        failure = Some(e);
                        break;
                    }
                    None => break,
                }
            }
        },
        Err(e) => {
            error!("Failed to open the reply stream: {:?}", e);
            failure = Some(e);
        }
    }

    // Commit whatever prefix the stream reached. A failure with no text at
    // all still becomes a transcript entry so the user sees what happened.
    let extraction = extract(&raw);
    let content = if extraction.display_text.is_empty() {
        match (&failure, aborted) {
            (Some(e), _) => format!("(The assistant could not reply: {})", e),
            (None, true) => "(Response cancelled.)".to_string(),
            (None, false) => String::new(),
        }
    } else {
        extraction.display_text
    };

    let entry = TranscriptEntry {
        id: message_id,
        role: Role::Assistant,
        content,
        citations: extraction.citations,
        created_at: chrono::Utc::now(),
    };

    let snapshot = {
        let mut session = session_state_lock.lock().await;
        session.dispatch(Action::AddMessage { message: entry });
        session.dispatch(Action::SetLoading { loading: false });
        session.store.clone()
    };
    send_server_message(&ws_sender, &ServerMessage::State { snapshot }).await;

    if let Some(e) = &failure {
        let err_msg = ServerMessage::Error {
            message: format!("The assistant response failed: {}", e),
        };
        send_server_message(&ws_sender, &err_msg).await;
    }
    send_server_message(&ws_sender, &ServerMessage::AssistantDone { message_id }).await;
    info!("Chat process finished.");

    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
