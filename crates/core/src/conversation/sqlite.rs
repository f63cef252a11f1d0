//! SQLite-backed conversation store.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::{ConversationError, ConversationMessage, ConversationStore, MessageKind};

/// SQLite-backed conversation store.
pub struct SqliteConversationStore {
    conn: Mutex<Connection>,
}

impl SqliteConversationStore {
    /// Open (or create) the database file and its tables.
    pub fn new(path: &Path) -> Result<Self, ConversationError> {
        let conn = Connection::open(path).map_err(|e| ConversationError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, ConversationError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| ConversationError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), ConversationError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS conversation_messages (
                context_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                id TEXT NOT NULL,
                sender TEXT NOT NULL,
                kind TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                content TEXT NOT NULL,
                metadata TEXT NOT NULL,
                PRIMARY KEY (context_id, position)
            );

            CREATE TABLE IF NOT EXISTS conversation_status (
                context_id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .map_err(|e| ConversationError::Database(e.to_string()))?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, ConversationError> {
        self.conn
            .lock()
            .map_err(|_| ConversationError::Database("connection lock poisoned".to_string()))
    }

    fn insert_message(
        conn: &Connection,
        context_id: &str,
        position: i64,
        message: &ConversationMessage,
    ) -> Result<(), ConversationError> {
        let metadata = serde_json::to_string(&message.metadata)
            .map_err(|e| ConversationError::Serialization(e.to_string()))?;

        conn.execute(
            "INSERT INTO conversation_messages (context_id, position, id, sender, kind, timestamp, content, metadata) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                context_id,
                position,
                message.id,
                message.sender,
                message.kind.as_str(),
                message.timestamp.to_rfc3339(),
                message.content,
                metadata,
            ],
        )
        .map_err(|e| ConversationError::Database(e.to_string()))?;

        Ok(())
    }

    fn load_messages(
        conn: &Connection,
        context_id: &str,
    ) -> Result<Vec<ConversationMessage>, ConversationError> {
        let mut stmt = conn
            .prepare(
                "SELECT id, sender, kind, timestamp, content, metadata FROM conversation_messages WHERE context_id = ? ORDER BY position ASC",
            )
            .map_err(|e| ConversationError::Database(e.to_string()))?;

        let messages = stmt
            .query_map(params![context_id], Self::row_to_message)
            .map_err(|e| ConversationError::Database(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ConversationError::Database(e.to_string()))?;

        Ok(messages)
    }

    fn rewrite_messages(
        conn: &Connection,
        context_id: &str,
        messages: &[ConversationMessage],
    ) -> Result<(), ConversationError> {
        conn.execute(
            "DELETE FROM conversation_messages WHERE context_id = ?",
            params![context_id],
        )
        .map_err(|e| ConversationError::Database(e.to_string()))?;

        for (position, message) in messages.iter().enumerate() {
            Self::insert_message(conn, context_id, position as i64, message)?;
        }
        Ok(())
    }

    fn row_to_message(row: &rusqlite::Row) -> rusqlite::Result<ConversationMessage> {
        let kind: String = row.get(2)?;
        let timestamp: String = row.get(3)?;
        let metadata: String = row.get(5)?;

        let kind = MessageKind::parse(&kind).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                rusqlite::types::Type::Text,
                format!("unknown message kind: {}", kind).into(),
            )
        })?;
        let timestamp = DateTime::parse_from_rfc3339(&timestamp)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    3,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;
        let metadata = serde_json::from_str(&metadata).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(ConversationMessage {
            id: row.get(0)?,
            sender: row.get(1)?,
            kind,
            timestamp,
            content: row.get(4)?,
            metadata,
        })
    }
}

impl ConversationStore for SqliteConversationStore {
    fn append_message(
        &self,
        context_id: &str,
        message: &ConversationMessage,
    ) -> Result<(), ConversationError> {
        let conn = self.conn()?;

        let next: i64 = conn
            .query_row(
                "SELECT COALESCE(MAX(position) + 1, 0) FROM conversation_messages WHERE context_id = ?",
                params![context_id],
                |row| row.get(0),
            )
            .map_err(|e| ConversationError::Database(e.to_string()))?;

        Self::insert_message(&conn, context_id, next, message)
    }

    fn list_messages(
        &self,
        context_id: &str,
    ) -> Result<Vec<ConversationMessage>, ConversationError> {
        let conn = self.conn()?;
        Self::load_messages(&conn, context_id)
    }

    fn replace_messages(
        &self,
        context_id: &str,
        messages: &[ConversationMessage],
    ) -> Result<(), ConversationError> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| ConversationError::Database(e.to_string()))?;

        Self::rewrite_messages(&tx, context_id, messages)?;

        tx.commit()
            .map_err(|e| ConversationError::Database(e.to_string()))?;
        Ok(())
    }

    fn modify_messages(
        &self,
        context_id: &str,
        modify: &mut dyn FnMut(Vec<ConversationMessage>) -> Vec<ConversationMessage>,
    ) -> Result<(), ConversationError> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| ConversationError::Database(e.to_string()))?;

        let existing = Self::load_messages(&tx, context_id)?;
        let messages = modify(existing);
        Self::rewrite_messages(&tx, context_id, &messages)?;

        tx.commit()
            .map_err(|e| ConversationError::Database(e.to_string()))?;
        Ok(())
    }

    fn update_status(&self, context_id: &str, status: &str) -> Result<(), ConversationError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO conversation_status (context_id, status, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(context_id) DO UPDATE SET status = excluded.status, updated_at = excluded.updated_at",
            params![context_id, status, Utc::now().to_rfc3339()],
        )
        .map_err(|e| ConversationError::Database(e.to_string()))?;
        Ok(())
    }

    fn status(&self, context_id: &str) -> Result<Option<String>, ConversationError> {
        let conn = self.conn()?;
        let result = conn.query_row(
            "SELECT status FROM conversation_status WHERE context_id = ?",
            params![context_id],
            |row| row.get(0),
        );

        match result {
            Ok(status) => Ok(Some(status)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(ConversationError::Database(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_store() -> SqliteConversationStore {
        SqliteConversationStore::in_memory().unwrap()
    }

    fn outreach(content: &str) -> ConversationMessage {
        ConversationMessage::new("brand", MessageKind::Outreach, content)
            .with_metadata("subject", "Partnership Opportunity")
    }

    #[test]
    fn test_append_and_list_preserves_order() {
        let store = create_test_store();
        store.append_message("creator-1", &outreach("first")).unwrap();
        store.append_message("creator-1", &outreach("second")).unwrap();
        store.append_message("creator-2", &outreach("other")).unwrap();

        let messages = store.list_messages("creator-1").unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "first");
        assert_eq!(messages[1].content, "second");
        assert_eq!(
            messages[0].metadata.get("subject").and_then(|v| v.as_str()),
            Some("Partnership Opportunity")
        );
    }

    #[test]
    fn test_list_unknown_context_is_empty() {
        let store = create_test_store();
        assert!(store.list_messages("nobody").unwrap().is_empty());
    }

    #[test]
    fn test_replace_messages() {
        let store = create_test_store();
        store.append_message("c", &outreach("old-1")).unwrap();
        store.append_message("c", &outreach("old-2")).unwrap();

        let replacement = vec![
            ConversationMessage::new("system", MessageKind::CallSummary, "summary")
                .with_metadata("call_sid", "CA1"),
        ];
        store.replace_messages("c", &replacement).unwrap();

        let messages = store.list_messages("c").unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].kind, MessageKind::CallSummary);
        assert_eq!(messages[0].call_sid(), Some("CA1"));

        // Appends continue after the replaced record.
        store.append_message("c", &outreach("after")).unwrap();
        assert_eq!(store.list_messages("c").unwrap()[1].content, "after");
    }

    #[test]
    fn test_modify_messages_rewrites_in_place() {
        let store = create_test_store();
        store.append_message("c", &outreach("keep")).unwrap();
        store.append_message("c", &outreach("drop")).unwrap();

        store
            .modify_messages("c", &mut |mut messages| {
                messages.retain(|m| m.content != "drop");
                messages.push(outreach("added"));
                messages
            })
            .unwrap();

        let contents: Vec<_> = store
            .list_messages("c")
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["keep", "added"]);
    }

    #[test]
    fn test_modify_messages_is_atomic_with_appends() {
        let store = std::sync::Arc::new(create_test_store());

        let writer = {
            let store = store.clone();
            std::thread::spawn(move || {
                for i in 0..200 {
                    store.append_message("c", &outreach(&format!("m{}", i))).unwrap();
                }
            })
        };
        for _ in 0..200 {
            store
                .modify_messages("c", &mut |mut messages| {
                    messages.retain(|m| m.kind != MessageKind::CallSummary);
                    messages.push(ConversationMessage::new(
                        "system",
                        MessageKind::CallSummary,
                        "summary",
                    ));
                    messages
                })
                .unwrap();
        }
        writer.join().unwrap();

        let messages = store.list_messages("c").unwrap();
        let outreach_count = messages
            .iter()
            .filter(|m| m.kind == MessageKind::Outreach)
            .count();
        assert_eq!(outreach_count, 200);
        assert_eq!(messages.len(), 201);
    }

    #[test]
    fn test_status_upsert() {
        let store = create_test_store();
        assert_eq!(store.status("c").unwrap(), None);

        store.update_status("c", "contacted").unwrap();
        store.update_status("c", "call_completed").unwrap();
        assert_eq!(store.status("c").unwrap().as_deref(), Some("call_completed"));
    }

    #[test]
    fn test_file_based_store() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("conversations.db");

        {
            let store = SqliteConversationStore::new(&db_path).unwrap();
            store.append_message("c", &outreach("persisted")).unwrap();
        }

        assert!(db_path.exists());
        let reopened = SqliteConversationStore::new(&db_path).unwrap();
        assert_eq!(reopened.list_messages("c").unwrap()[0].content, "persisted");
    }
}
