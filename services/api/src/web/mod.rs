pub mod chat_task;
pub mod protocol;
pub mod rest;
pub mod state;
pub mod ws_handler;

// Re-export the main handlers to make them easily accessible
// to the binary that will build the web server router.
pub use rest::{
    create_session_handler, get_range_handler, get_snapshot_handler, search_document_handler,
};
pub use ws_handler::ws_handler;
