//! crates/annotation_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the engine's external
//! collaborators. These traits form the boundary of the hexagonal
//! architecture, keeping the core independent of any specific language
//! model provider or transport.

use crate::domain::Message;
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// A pinned, boxed stream of assistant reply fragments.
pub type ReplyStream = Pin<Box<dyn Stream<Item = Result<String, PortError>> + Send>>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait ChatService: Send + Sync {
    /// Streams the assistant's reply to the latest user message.
    ///
    /// The caller supplies the full current document text and the full prior
    /// transcript; fragments may contain `[start:end]` citation markers at
    /// any position, including split across fragment boundaries.
    async fn stream_reply(
        &self,
        document: &str,
        transcript: &[Message],
    ) -> PortResult<ReplyStream>;
}
