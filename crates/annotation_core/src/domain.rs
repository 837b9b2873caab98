//! crates/annotation_core/src/domain.rs
//!
//! Defines the pure, core data structures for the annotation engine.
//! These structs are independent of any transport or rendering layer; they
//! all serialize with serde so a whole store snapshot round-trips as one
//! document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The palette a highlight can be rendered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightColor {
    Yellow,
    Blue,
    Green,
    Pink,
}

impl Default for HighlightColor {
    fn default() -> Self {
        HighlightColor::Yellow
    }
}

/// A half-open character range `[start, end)` over the document text,
/// keyed by id and optionally colored.
///
/// Offsets are `char` offsets into the current document content. A range
/// reaching past the end of the content is clamped at render time, not
/// rejected here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Highlight {
    pub id: Uuid,
    pub start: usize,
    pub end: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<HighlightColor>,
}

impl Highlight {
    /// Creates a highlight over `[start, end)` with a freshly generated id.
    pub fn new(start: usize, end: usize, color: Option<HighlightColor>) -> Self {
        Self {
            id: Uuid::new_v4(),
            start,
            end,
            color,
        }
    }
}

/// A note attached to a highlight.
///
/// `highlight_id` is a reference, not ownership: a comment is meaningless
/// without its highlight, and removing the highlight removes the comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub highlight_id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<bool>,
}

impl Comment {
    /// Creates a comment on `highlight_id` with a freshly generated id.
    pub fn new(highlight_id: Uuid, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            highlight_id,
            text: text.into(),
            created_at: Utc::now(),
            resolved: None,
        }
    }
}

/// Who authored a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// A validated `[start:end]` reference into the document text, extracted
/// from assistant output. Offsets are document `char` offsets, half-open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub start: usize,
    pub end: usize,
}

/// A single entry in the conversation transcript.
///
/// `content` is display text (citation markers already stripped for
/// assistant replies); `citations` holds the raw cited ranges in order of
/// appearance, which is the "Source 1, Source 2, ..." numbering shown to
/// the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<Citation>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Creates a user message with a freshly generated id.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::User,
            content: content.into(),
            citations: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Creates an assistant message carrying its cited ranges.
    pub fn assistant(content: impl Into<String>, citations: Vec<Citation>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::Assistant,
            content: content.into(),
            citations,
            created_at: Utc::now(),
        }
    }
}
