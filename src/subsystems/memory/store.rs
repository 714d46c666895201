//! `SessionStore`: SQLite-backed chat log and latest-wins lead data.
//!
//! Two tables:
//! - `messages`: append-only turns, ordered by `id` within a session
//! - `extracted_data`: one JSON document per session, replaced on each write
//!
//! Every operation opens its own connection and closes it on return; the
//! handle itself only carries the database path and is cheap to clone.
//! Calls are blocking: async callers go through `spawn_blocking`.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use serde_json::Value;

use crate::error::AppError;
use super::types::{Message, MessageId, Role};

const SCHEMA_VERSION: i64 = 1;

#[derive(Debug, Clone)]
pub struct SessionStore {
    db_path: PathBuf,
}

impl SessionStore {
    /// Open (creating if needed) the database at `db_path` and ensure the schema.
    pub fn open(db_path: &Path) -> Result<Self, AppError> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                AppError::Memory(format!("session store: cannot create {}: {e}", parent.display()))
            })?;
        }

        let store = Self { db_path: db_path.to_path_buf() };
        store.init_db()?;
        Ok(store)
    }

    /// Append one turn to the session's log and return its id.
    pub fn append_message(
        &self,
        session_id: &str,
        role: Role,
        text: &str,
    ) -> Result<MessageId, AppError> {
        let conn = self.open_conn()?;
        Self::insert_message(&conn, session_id, role, text)
    }

    /// All turns of the session in creation order. Empty if the session is unknown.
    pub fn list_messages(&self, session_id: &str) -> Result<Vec<Message>, AppError> {
        let conn = self.open_conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, session_id, role, text, created_at FROM messages WHERE session_id = ?1 ORDER BY id ASC",
            )
            .map_err(|e| AppError::Memory(format!("session store: prepare list_messages: {e}")))?;

        let rows = stmt
            .query_map(params![session_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })
            .map_err(|e| AppError::Memory(format!("session store: query list_messages: {e}")))?;

        let mut messages = Vec::new();
        for row in rows {
            let (id, session_id, role, text, created_at) = row
                .map_err(|e| AppError::Memory(format!("session store: map list_messages row: {e}")))?;
            messages.push(Message { id, session_id, role: role.parse()?, text, created_at });
        }
        Ok(messages)
    }

    /// Insert a model turn with `text` only if the session has no messages yet.
    ///
    /// Returns the new id when a row was written, `None` when the session
    /// already had history. The check and the insert share one immediate
    /// transaction, so concurrent callers cannot seed twice.
    pub fn ensure_greeting(&self, session_id: &str, text: &str) -> Result<Option<MessageId>, AppError> {
        let mut conn = self.open_conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| AppError::Memory(format!("session store: begin tx: {e}")))?;

        let existing: i64 = tx
            .query_row(
                "SELECT COUNT(*) FROM messages WHERE session_id = ?1",
                params![session_id],
                |row| row.get(0),
            )
            .map_err(|e| AppError::Memory(format!("session store: count messages: {e}")))?;

        let inserted = if existing == 0 {
            Some(Self::insert_message(&tx, session_id, Role::Model, text)?)
        } else {
            None
        };

        tx.commit()
            .map_err(|e| AppError::Memory(format!("session store: commit ensure_greeting: {e}")))?;
        Ok(inserted)
    }

    /// Insert or fully replace the session's extracted data.
    pub fn put_extracted_data(&self, session_id: &str, data: &Value) -> Result<(), AppError> {
        let data_json = serde_json::to_string(data)
            .map_err(|e| AppError::Memory(format!("session store: serialize extracted data: {e}")))?;

        let conn = self.open_conn()?;
        conn.execute(
            "INSERT INTO extracted_data (session_id, data_json, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(session_id) DO UPDATE SET data_json = excluded.data_json, updated_at = excluded.updated_at",
            params![session_id, data_json, now_rfc3339()],
        )
        .map_err(|e| AppError::Memory(format!("session store: upsert extracted data: {e}")))?;
        Ok(())
    }

    /// The stored extracted data, or `None` if nothing was ever recorded.
    pub fn get_extracted_data(&self, session_id: &str) -> Result<Option<Value>, AppError> {
        let conn = self.open_conn()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT data_json FROM extracted_data WHERE session_id = ?1",
                params![session_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| AppError::Memory(format!("session store: get extracted data: {e}")))?;

        raw.map(|json| {
            serde_json::from_str(&json).map_err(|e| {
                AppError::Memory(format!("session store: malformed extracted data for {session_id}: {e}"))
            })
        })
        .transpose()
    }

    // ── internals ─────────────────────────────────────────────────────

    fn insert_message(
        conn: &Connection,
        session_id: &str,
        role: Role,
        text: &str,
    ) -> Result<MessageId, AppError> {
        conn.execute(
            "INSERT INTO messages (session_id, role, text, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![session_id, role.as_str(), text, now_rfc3339()],
        )
        .map_err(|e| AppError::Memory(format!("session store: insert message: {e}")))?;
        Ok(conn.last_insert_rowid())
    }

    fn init_db(&self) -> Result<(), AppError> {
        let conn = self.open_conn()?;
        let version: i64 = conn
            .query_row("PRAGMA user_version;", [], |row| row.get(0))
            .map_err(|e| AppError::Memory(format!("session store: read schema version: {e}")))?;

        if version == 0 {
            conn.execute_batch(
                "
                CREATE TABLE IF NOT EXISTS messages (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    session_id TEXT NOT NULL,
                    role TEXT NOT NULL,
                    text TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_messages_session ON messages(session_id, id);

                CREATE TABLE IF NOT EXISTS extracted_data (
                    session_id TEXT PRIMARY KEY,
                    data_json TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );
                ",
            )
            .map_err(|e| AppError::Memory(format!("session store: create schema: {e}")))?;

            conn.pragma_update(None, "user_version", SCHEMA_VERSION)
                .map_err(|e| AppError::Memory(format!("session store: set schema version: {e}")))?;
        } else if version > SCHEMA_VERSION {
            return Err(AppError::Memory(format!(
                "session store: database schema v{version} is newer than supported v{SCHEMA_VERSION}"
            )));
        }
        Ok(())
    }

    fn open_conn(&self) -> Result<Connection, AppError> {
        let conn = Connection::open(&self.db_path).map_err(|e| {
            AppError::Memory(format!("session store: open {}: {e}", self.db_path.display()))
        })?;

        conn.pragma_update(None, "busy_timeout", 5000)
            .map_err(|e| AppError::Memory(format!("session store: set busy_timeout: {e}")))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| AppError::Memory(format!("session store: set journal_mode WAL: {e}")))?;

        Ok(conn)
    }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn store() -> (TempDir, SessionStore) {
        let tmp = TempDir::new().unwrap();
        let store = SessionStore::open(&tmp.path().join("memory.db")).unwrap();
        (tmp, store)
    }

    #[test]
    fn open_creates_parent_dirs() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("dir").join("memory.db");
        SessionStore::open(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn reopen_keeps_data() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("memory.db");
        SessionStore::open(&path).unwrap().append_message("s1", Role::User, "hi").unwrap();
        let reopened = SessionStore::open(&path).unwrap();
        assert_eq!(reopened.list_messages("s1").unwrap().len(), 1);
    }

    #[test]
    fn ids_increase_and_order_is_stable() {
        let (_tmp, store) = store();
        let a = store.append_message("s1", Role::User, "one").unwrap();
        let b = store.append_message("s1", Role::Model, "two").unwrap();
        assert!(b > a);

        let msgs = store.list_messages("s1").unwrap();
        let texts: Vec<_> = msgs.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, ["one", "two"]);
        assert_eq!(msgs[0].role, Role::User);
        assert_eq!(msgs[1].role, Role::Model);
        assert!(!msgs[0].created_at.is_empty());
    }

    #[test]
    fn unknown_session_lists_empty() {
        let (_tmp, store) = store();
        assert!(store.list_messages("nobody").unwrap().is_empty());
    }

    #[test]
    fn ensure_greeting_only_seeds_empty_sessions() {
        let (_tmp, store) = store();
        assert!(store.ensure_greeting("s1", "hello").unwrap().is_some());
        assert!(store.ensure_greeting("s1", "hello").unwrap().is_none());
        assert_eq!(store.list_messages("s1").unwrap().len(), 1);

        store.append_message("s2", Role::User, "first").unwrap();
        assert!(store.ensure_greeting("s2", "hello").unwrap().is_none());
    }

    #[test]
    fn extracted_data_missing_is_none() {
        let (_tmp, store) = store();
        assert_eq!(store.get_extracted_data("s1").unwrap(), None);
    }

    #[test]
    fn extracted_data_empty_object_is_distinct_from_missing() {
        let (_tmp, store) = store();
        store.put_extracted_data("s1", &json!({})).unwrap();
        assert_eq!(store.get_extracted_data("s1").unwrap(), Some(json!({})));
    }

    #[test]
    fn extracted_data_is_replaced_not_merged() {
        let (_tmp, store) = store();
        store.put_extracted_data("s1", &json!({"industry": "fintech", "roles": []})).unwrap();
        let second = json!({"industry": "unknown", "roles": [{"role": "backend engineer", "count": 2}]});
        store.put_extracted_data("s1", &second).unwrap();
        assert_eq!(store.get_extracted_data("s1").unwrap(), Some(second));
    }
}
