//! services/api/src/web/state.rs
//!
//! Defines the application's shared and session-specific states.

use crate::config::Config;
use annotation_core::ports::ChatService;
use annotation_core::store::{apply, Action, StoreState};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
///
/// Sessions live in memory; persistence of a session is a collaborator
/// concern served by the serializable store snapshot.
pub struct AppState {
    pub config: Arc<Config>,
    pub chat_adapter: Arc<dyn ChatService>,
    sessions: Mutex<HashMap<Uuid, Arc<Mutex<SessionState>>>>,
}

impl AppState {
    pub fn new(config: Arc<Config>, chat_adapter: Arc<dyn ChatService>) -> Self {
        Self {
            config,
            chat_adapter,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a new session seeded with the uploaded document content.
    pub async fn create_session(&self, content: String) -> Uuid {
        let session_id = Uuid::new_v4();
        let session = SessionState::new(session_id, content);
        self.sessions
            .lock()
            .await
            .insert(session_id, Arc::new(Mutex::new(session)));
        session_id
    }

    /// Looks up a live session by id.
    pub async fn session(&self, session_id: Uuid) -> Option<Arc<Mutex<SessionState>>> {
        self.sessions.lock().await.get(&session_id).cloned()
    }
}

//=========================================================================================
// SessionState (Specific to One Document + Conversation)
//=========================================================================================

/// The state for a single session: the current store snapshot and the
/// cancellation token guarding the in-flight assistant reply, if any.
pub struct SessionState {
    pub session_id: Uuid,
    pub store: StoreState,
    /// A token to gracefully cancel the current streaming reply task.
    pub cancellation_token: CancellationToken,
}

impl SessionState {
    pub fn new(session_id: Uuid, content: String) -> Self {
        Self {
            session_id,
            store: StoreState::with_content(content),
            cancellation_token: CancellationToken::new(),
        }
    }

    /// The single mutation funnel: applies one action to the current
    /// snapshot and replaces it. Callers hold the session lock, so
    /// transitions never interleave.
    pub fn dispatch(&mut self, action: Action) {
        self.store = apply(&self.store, action);
    }
}
