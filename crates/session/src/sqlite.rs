//! SQLite session — durable conversation history.
//!
//! One database holds many sessions: a `sessions` table for metadata and a
//! `messages` table storing one JSON-serialized item per row. Items are
//! ordered by rowid, so append order is chronological order. All mutating
//! operations take an internal mutex; concurrent runs against the same
//! session id never interleave a partial append with a read.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use windlass_core::error::SessionError;
use windlass_core::item::ConversationItem;
use windlass_core::session::Session;

/// The default database path, using in-memory storage.
pub const DEFAULT_DB_PATH: &str = ":memory:";

/// Configuration for creating a new [`SqliteSession`].
#[derive(Debug, Clone)]
pub struct SqliteSessionConfig {
    /// The unique identifier for the session (required).
    pub session_id: String,

    /// Path to the SQLite database file; defaults to `:memory:`.
    pub db_path: String,
}

impl SqliteSessionConfig {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            db_path: DEFAULT_DB_PATH.to_string(),
        }
    }

    pub fn with_db_path(mut self, db_path: impl Into<String>) -> Self {
        self.db_path = db_path.into();
        self
    }

    fn validate(&self) -> Result<(), SessionError> {
        if self.session_id.is_empty() {
            return Err(SessionError::InvalidSessionId);
        }
        Ok(())
    }
}

/// A session backed by SQLite.
pub struct SqliteSession {
    session_id: String,
    pool: SqlitePool,
    // Serializes mutating operations; the session is a shared resource.
    write_lock: Mutex<()>,
}

impl SqliteSession {
    /// Open (or create) the database, run migrations, and ensure the
    /// session row exists.
    pub async fn new(config: SqliteSessionConfig) -> Result<Self, SessionError> {
        config.validate()?;

        let options = SqliteConnectOptions::from_str(&config.db_path)
            .map_err(|e| SessionError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("foreign_keys", "ON");

        // A single connection keeps `:memory:` databases coherent.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| SessionError::Storage(format!("Failed to open SQLite: {e}")))?;

        let session = Self {
            session_id: config.session_id,
            pool,
            write_lock: Mutex::new(()),
        };
        session.run_migrations().await?;
        session.ensure_session_exists().await?;

        info!(session_id = %session.session_id, path = %config.db_path, "SQLite session opened");
        Ok(session)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn run_migrations(&self) -> Result<(), SessionError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                session_id  TEXT PRIMARY KEY,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| SessionError::Storage(format!("sessions table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id   TEXT NOT NULL,
                message_data TEXT NOT NULL,
                created_at   TEXT NOT NULL,
                FOREIGN KEY (session_id) REFERENCES sessions (session_id) ON DELETE CASCADE
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| SessionError::Storage(format!("messages table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_messages_session_id ON messages (session_id, id)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| SessionError::Storage(format!("messages index: {e}")))?;

        debug!("SQLite session migrations complete");
        Ok(())
    }

    async fn ensure_session_exists(&self) -> Result<(), SessionError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT OR IGNORE INTO sessions (session_id, created_at, updated_at) VALUES (?1, ?2, ?2)",
        )
        .bind(&self.session_id)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| SessionError::Storage(format!("session row: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl Session for SqliteSession {
    async fn get_items(
        &self,
        limit: Option<usize>,
    ) -> std::result::Result<Vec<ConversationItem>, SessionError> {
        let rows = match limit {
            Some(n) => {
                sqlx::query(
                    "SELECT message_data FROM messages WHERE session_id = ?1 ORDER BY id DESC LIMIT ?2",
                )
                .bind(&self.session_id)
                .bind(n as i64)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    "SELECT message_data FROM messages WHERE session_id = ?1 ORDER BY id ASC",
                )
                .bind(&self.session_id)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| SessionError::Storage(format!("SELECT failed: {e}")))?;

        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            let data: String = row
                .try_get("message_data")
                .map_err(|e| SessionError::Storage(format!("message_data column: {e}")))?;
            match serde_json::from_str::<ConversationItem>(&data) {
                Ok(item) => items.push(item),
                Err(e) => {
                    warn!(session_id = %self.session_id, error = %e, "Skipping unparseable item");
                }
            }
        }

        // A limited read fetched newest-first; restore chronological order.
        if limit.is_some() {
            items.reverse();
        }

        Ok(items)
    }

    async fn add_items(
        &self,
        items: Vec<ConversationItem>,
    ) -> std::result::Result<(), SessionError> {
        if items.is_empty() {
            return Ok(());
        }

        let _guard = self.write_lock.lock().await;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| SessionError::TransactionFailed(e.to_string()))?;

        let now = Utc::now().to_rfc3339();
        for item in &items {
            let data = serde_json::to_string(item)
                .map_err(|e| SessionError::InvalidItemData(e.to_string()))?;
            sqlx::query(
                "INSERT INTO messages (session_id, message_data, created_at) VALUES (?1, ?2, ?3)",
            )
            .bind(&self.session_id)
            .bind(&data)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(|e| SessionError::Storage(format!("INSERT failed: {e}")))?;
        }

        sqlx::query("UPDATE sessions SET updated_at = ?1 WHERE session_id = ?2")
            .bind(&now)
            .bind(&self.session_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| SessionError::Storage(format!("UPDATE failed: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| SessionError::TransactionFailed(e.to_string()))?;

        debug!(session_id = %self.session_id, count = items.len(), "Appended items");
        Ok(())
    }

    async fn pop_item(&self) -> std::result::Result<Option<ConversationItem>, SessionError> {
        let _guard = self.write_lock.lock().await;

        let row = sqlx::query(
            r#"
            DELETE FROM messages
            WHERE id = (
                SELECT id FROM messages
                WHERE session_id = ?1
                ORDER BY id DESC
                LIMIT 1
            )
            RETURNING message_data
            "#,
        )
        .bind(&self.session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| SessionError::Storage(format!("DELETE failed: {e}")))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let data: String = row
            .try_get("message_data")
            .map_err(|e| SessionError::Storage(format!("message_data column: {e}")))?;
        match serde_json::from_str::<ConversationItem>(&data) {
            Ok(item) => Ok(Some(item)),
            Err(e) => {
                // Corrupted data; the row is already gone.
                warn!(session_id = %self.session_id, error = %e, "Popped unparseable item");
                Ok(None)
            }
        }
    }

    async fn clear(&self) -> std::result::Result<(), SessionError> {
        let _guard = self.write_lock.lock().await;

        sqlx::query("DELETE FROM messages WHERE session_id = ?1")
            .bind(&self.session_id)
            .execute(&self.pool)
            .await
            .map_err(|e| SessionError::Storage(format!("DELETE failed: {e}")))?;

        debug!(session_id = %self.session_id, "Cleared session");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_session(id: &str) -> SqliteSession {
        SqliteSession::new(SqliteSessionConfig::new(id)).await.unwrap()
    }

    #[tokio::test]
    async fn empty_session_id_is_rejected() {
        let err = SqliteSession::new(SqliteSessionConfig::new("")).await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidSessionId));
    }

    #[tokio::test]
    async fn append_then_read_preserves_order() {
        let session = memory_session("s1").await;
        session
            .add_items(vec![
                ConversationItem::user("Message 1"),
                ConversationItem::tool_call("call_1", "add", "{}"),
                ConversationItem::tool_result("call_1", "3"),
            ])
            .await
            .unwrap();

        let all = session.get_items(None).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].message_content(), Some("Message 1"));
        assert_eq!(all[1].call_id(), Some("call_1"));
        assert!(all[2].is_tool_result());
    }

    #[tokio::test]
    async fn limited_read_is_latest_n_chronological() {
        let session = memory_session("s2").await;
        for i in 1..=5 {
            session
                .add_items(vec![ConversationItem::user(format!("m{i}"))])
                .await
                .unwrap();
        }

        let recent = session.get_items(Some(2)).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].message_content(), Some("m4"));
        assert_eq!(recent[1].message_content(), Some("m5"));
    }

    #[tokio::test]
    async fn pop_item_removes_newest() {
        let session = memory_session("s3").await;
        session
            .add_items(vec![
                ConversationItem::user("keep"),
                ConversationItem::user("pop me"),
            ])
            .await
            .unwrap();

        let popped = session.pop_item().await.unwrap().unwrap();
        assert_eq!(popped.message_content(), Some("pop me"));

        let remaining = session.get_items(None).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].message_content(), Some("keep"));
    }

    #[tokio::test]
    async fn pop_on_empty_returns_none() {
        let session = memory_session("s4").await;
        assert!(session.pop_item().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn clear_then_append_still_works() {
        let session = memory_session("s5").await;
        session
            .add_items(vec![ConversationItem::user("old")])
            .await
            .unwrap();
        session.clear().await.unwrap();
        assert!(session.get_items(None).await.unwrap().is_empty());

        session
            .add_items(vec![ConversationItem::user("new")])
            .await
            .unwrap();
        assert_eq!(session.get_items(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn sessions_in_one_file_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.db");
        let path = path.to_str().unwrap();

        let a = SqliteSession::new(SqliteSessionConfig::new("alpha").with_db_path(path))
            .await
            .unwrap();
        let b = SqliteSession::new(SqliteSessionConfig::new("beta").with_db_path(path))
            .await
            .unwrap();

        a.add_items(vec![ConversationItem::user("for alpha")])
            .await
            .unwrap();
        b.add_items(vec![ConversationItem::user("for beta")])
            .await
            .unwrap();

        let alpha_items = a.get_items(None).await.unwrap();
        assert_eq!(alpha_items.len(), 1);
        assert_eq!(alpha_items[0].message_content(), Some("for alpha"));

        let beta_items = b.get_items(None).await.unwrap();
        assert_eq!(beta_items.len(), 1);
        assert_eq!(beta_items[0].message_content(), Some("for beta"));
    }

    #[tokio::test]
    async fn history_survives_reopening_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("durable.db");
        let path = path.to_str().unwrap();

        {
            let session =
                SqliteSession::new(SqliteSessionConfig::new("durable").with_db_path(path))
                    .await
                    .unwrap();
            session
                .add_items(vec![ConversationItem::user("remember me")])
                .await
                .unwrap();
        }

        let reopened = SqliteSession::new(SqliteSessionConfig::new("durable").with_db_path(path))
            .await
            .unwrap();
        let items = reopened.get_items(None).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].message_content(), Some("remember me"));
    }
}
