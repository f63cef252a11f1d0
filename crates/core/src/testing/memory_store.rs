//! In-memory conversation store for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::conversation::{ConversationError, ConversationMessage, ConversationStore};

#[derive(Debug, Default)]
struct Records {
    messages: HashMap<String, Vec<ConversationMessage>>,
    statuses: HashMap<String, String>,
}

/// Conversation store kept in a map. Writes can be made to fail.
#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    records: Mutex<Records>,
    fail_writes: AtomicBool,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write fail with a database error until reset.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn records(&self) -> Result<std::sync::MutexGuard<'_, Records>, ConversationError> {
        self.records
            .lock()
            .map_err(|_| ConversationError::Database("store lock poisoned".to_string()))
    }

    fn check_writable(&self) -> Result<(), ConversationError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ConversationError::Database("write rejected".to_string()));
        }
        Ok(())
    }
}

impl ConversationStore for InMemoryConversationStore {
    fn append_message(
        &self,
        context_id: &str,
        message: &ConversationMessage,
    ) -> Result<(), ConversationError> {
        self.check_writable()?;
        self.records()?
            .messages
            .entry(context_id.to_string())
            .or_default()
            .push(message.clone());
        Ok(())
    }

    fn list_messages(
        &self,
        context_id: &str,
    ) -> Result<Vec<ConversationMessage>, ConversationError> {
        Ok(self
            .records()?
            .messages
            .get(context_id)
            .cloned()
            .unwrap_or_default())
    }

    fn replace_messages(
        &self,
        context_id: &str,
        messages: &[ConversationMessage],
    ) -> Result<(), ConversationError> {
        self.check_writable()?;
        self.records()?
            .messages
            .insert(context_id.to_string(), messages.to_vec());
        Ok(())
    }

    fn modify_messages(
        &self,
        context_id: &str,
        modify: &mut dyn FnMut(Vec<ConversationMessage>) -> Vec<ConversationMessage>,
    ) -> Result<(), ConversationError> {
        self.check_writable()?;
        let mut records = self.records()?;
        let existing = records.messages.remove(context_id).unwrap_or_default();
        let messages = modify(existing);
        records.messages.insert(context_id.to_string(), messages);
        Ok(())
    }

    fn update_status(&self, context_id: &str, status: &str) -> Result<(), ConversationError> {
        self.check_writable()?;
        self.records()?
            .statuses
            .insert(context_id.to_string(), status.to_string());
        Ok(())
    }

    fn status(&self, context_id: &str) -> Result<Option<String>, ConversationError> {
        Ok(self.records()?.statuses.get(context_id).cloned())
    }
}
