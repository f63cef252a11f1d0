use thiserror::Error;

use super::ConversationMessage;

/// Error type for conversation storage.
#[derive(Debug, Error)]
pub enum ConversationError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Storage for conversation records, keyed by context id.
///
/// Messages keep their insertion order. A context with no messages reads as
/// an empty record rather than an error.
pub trait ConversationStore: Send + Sync {
    /// Append one message to the end of a record.
    fn append_message(
        &self,
        context_id: &str,
        message: &ConversationMessage,
    ) -> Result<(), ConversationError>;

    /// All messages of a record in order.
    fn list_messages(
        &self,
        context_id: &str,
    ) -> Result<Vec<ConversationMessage>, ConversationError>;

    /// Atomically replace the whole record.
    fn replace_messages(
        &self,
        context_id: &str,
        messages: &[ConversationMessage],
    ) -> Result<(), ConversationError>;

    /// Read, rewrite and store a record as one atomic step.
    ///
    /// No other write to `context_id` can land between the read and the write.
    fn modify_messages(
        &self,
        context_id: &str,
        modify: &mut dyn FnMut(Vec<ConversationMessage>) -> Vec<ConversationMessage>,
    ) -> Result<(), ConversationError>;

    /// Set the relationship status (e.g. "contacted", "call_completed").
    fn update_status(&self, context_id: &str, status: &str) -> Result<(), ConversationError>;

    fn status(&self, context_id: &str) -> Result<Option<String>, ConversationError>;
}
