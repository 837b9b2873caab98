pub mod citation;
pub mod document;
pub mod domain;
pub mod focus;
pub mod ports;
pub mod segment;
pub mod store;

pub use citation::{extract, resolve_citation, CitationTarget, Extraction};
pub use document::{find_ranges, range_text, RangeExcerpt};
pub use domain::{Citation, Comment, Highlight, HighlightColor, Message, Role};
pub use focus::{toggle_target, FocusView, ScrollState, SCROLL_CLEAR_DELAY_MS};
pub use ports::{ChatService, PortError, PortResult, ReplyStream};
pub use segment::{segment, Segment};
pub use store::{apply, Action, StoreState};
