//! Conversation records.
//!
//! Each business relationship (a creator, a campaign contact) owns an ordered
//! log of messages keyed by a context id. The core only appends outreach
//! entries and merges call artifacts; everything else is plain CRUD.

mod sqlite;
mod store;
mod types;

pub use sqlite::SqliteConversationStore;
pub use store::{ConversationError, ConversationStore};
pub use types::{ConversationMessage, MessageKind};
