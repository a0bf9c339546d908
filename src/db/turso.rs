use crate::db::traits::HistoryStore;
use crate::types::{AppError, HistoryEntry, MessageRole, Result};
use async_trait::async_trait;
use chrono::Utc;
use libsql::{Builder, Connection, Database, TransactionBehavior};
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn};

/// How long a file-backed connection waits on a locked database before failing.
const BUSY_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Memory,
    Local,
    #[cfg(feature = "turso")]
    Remote,
}

/// libsql-backed history store (in-memory, local file or remote Turso).
pub struct TursoClient {
    db: Database,
    mode: Mode,
    // `:memory:` databases are private to the connection that opened them,
    // so every operation must go through this one.
    shared: Option<Arc<Mutex<Connection>>>,
}

/// A connection borrowed for the duration of one store operation.
pub enum ConnectionHandle {
    Dedicated(Connection),
    Shared(OwnedMutexGuard<Connection>),
}

impl Deref for ConnectionHandle {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        match self {
            ConnectionHandle::Dedicated(conn) => conn,
            ConnectionHandle::Shared(guard) => guard,
        }
    }
}

fn storage_error(context: &str, e: impl std::fmt::Display) -> AppError {
    error!(target: "aria::storage", error = %e, "{}", context);
    AppError::StorageUnavailable(format!("{}: {}", context, e))
}

async fn run_pragma(conn: &Connection, pragma: &str) -> std::result::Result<(), libsql::Error> {
    let mut rows = conn.query(pragma, ()).await?;
    while rows.next().await?.is_some() {}
    Ok(())
}

impl TursoClient {
    /// Open an ephemeral in-memory database (tests, `--database :memory:`).
    pub async fn new_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| storage_error("Failed to open in-memory database", e))?;
        let conn = db
            .connect()
            .map_err(|e| storage_error("Failed to get connection", e))?;

        let client = Self {
            db,
            mode: Mode::Memory,
            shared: Some(Arc::new(Mutex::new(conn))),
        };
        client.initialize_schema().await?;

        Ok(client)
    }

    /// Open (or create) a file-backed database at `path`.
    pub async fn new_local(path: &str) -> Result<Self> {
        if path == ":memory:" {
            return Self::new_memory().await;
        }

        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                storage_error(
                    &format!("Failed to create database directory {}", parent.display()),
                    e,
                )
            })?;
        }

        let db = Builder::new_local(path)
            .build()
            .await
            .map_err(|e| storage_error(&format!("Failed to open database at {}", path), e))?;

        let client = Self {
            db,
            mode: Mode::Local,
            shared: None,
        };

        {
            let conn = client.connection().await?;
            run_pragma(&conn, "PRAGMA journal_mode = WAL")
                .await
                .map_err(|e| storage_error("Failed to enable WAL journal", e))?;
        }
        client.initialize_schema().await?;

        info!(path = %path, "Conversation database initialised");
        Ok(client)
    }

    /// Connect to a remote Turso database.
    #[cfg(feature = "turso")]
    pub async fn new_remote(url: String, auth_token: String) -> Result<Self> {
        let db = Builder::new_remote(url, auth_token)
            .build()
            .await
            .map_err(|e| storage_error("Failed to connect to Turso", e))?;

        let client = Self {
            db,
            mode: Mode::Remote,
            shared: None,
        };
        client.initialize_schema().await?;

        Ok(client)
    }

    pub async fn connection(&self) -> Result<ConnectionHandle> {
        if let Some(shared) = &self.shared {
            return Ok(ConnectionHandle::Shared(Arc::clone(shared).lock_owned().await));
        }

        let conn = self
            .db
            .connect()
            .map_err(|e| storage_error("Failed to get connection", e))?;

        if self.mode == Mode::Local {
            run_pragma(&conn, &format!("PRAGMA busy_timeout = {}", BUSY_TIMEOUT_MS))
                .await
                .map_err(|e| storage_error("Failed to set busy timeout", e))?;
        }

        Ok(ConnectionHandle::Dedicated(conn))
    }

    async fn initialize_schema(&self) -> Result<()> {
        let conn = self.connection().await?;

        // Messages table
        conn.execute(
            "CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                role TEXT NOT NULL CHECK (role IN ('user', 'assistant')),
                content TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )",
            (),
        )
        .await
        .map_err(|e| storage_error("Failed to create messages table", e))?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_messages_user ON messages (user_id, id)",
            (),
        )
        .await
        .map_err(|e| storage_error("Failed to create messages index", e))?;

        Ok(())
    }
}

#[async_trait]
impl HistoryStore for TursoClient {
    async fn append_entries(
        &self,
        user_id: &str,
        entries: &[(MessageRole, &str)],
        max_history: usize,
    ) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let conn = self.connection().await?;
        let now = Utc::now().timestamp();
        let keep = i64::try_from(max_history).unwrap_or(i64::MAX);

        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .await
            .map_err(|e| storage_error("Failed to begin transaction", e))?;

        let outcome = async {
            for (role, content) in entries {
                tx.execute(
                    "INSERT INTO messages (user_id, role, content, created_at)
                     VALUES (?, ?, ?, ?)",
                    (user_id, role.as_str(), *content, now),
                )
                .await?;
            }

            // Keep only the newest `keep` rows for this user
            tx.execute(
                "DELETE FROM messages
                 WHERE user_id = ?
                   AND id NOT IN (
                       SELECT id FROM messages
                       WHERE user_id = ?
                       ORDER BY id DESC
                       LIMIT ?
                   )",
                (user_id, user_id, keep),
            )
            .await
        }
        .await;

        match outcome {
            Ok(pruned) => {
                tx.commit()
                    .await
                    .map_err(|e| storage_error("Failed to commit history entries", e))?;
                debug!(user_id = %user_id, appended = entries.len(), pruned, "History entries appended");
                Ok(())
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!(error = %rollback, "Rollback after failed append also failed");
                }
                Err(storage_error("Failed to append history entries", e))
            }
        }
    }

    async fn recent_entries(&self, user_id: &str, limit: usize) -> Result<Vec<HistoryEntry>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let conn = self.connection().await?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let mut rows = conn
            .query(
                "SELECT id, role, content, created_at FROM messages
                 WHERE user_id = ?
                 ORDER BY id DESC
                 LIMIT ?",
                (user_id, limit),
            )
            .await
            .map_err(|e| storage_error("Failed to query history", e))?;

        let mut entries = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| storage_error("Failed to read history row", e))?
        {
            let role: String = row
                .get(1)
                .map_err(|e| storage_error("Failed to decode role", e))?;
            let role = role
                .parse::<MessageRole>()
                .map_err(|e| storage_error("Corrupt history row", e))?;

            entries.push(HistoryEntry {
                id: row
                    .get(0)
                    .map_err(|e| storage_error("Failed to decode id", e))?,
                role,
                content: row
                    .get(2)
                    .map_err(|e| storage_error("Failed to decode content", e))?,
                created_at: chrono::DateTime::from_timestamp(
                    row.get::<i64>(3)
                        .map_err(|e| storage_error("Failed to decode timestamp", e))?,
                    0,
                )
                .unwrap_or_default(),
            });
        }

        // Rows come newest-first
        entries.reverse();
        Ok(entries)
    }

    async fn clear_entries(&self, user_id: &str) -> Result<u64> {
        let conn = self.connection().await?;

        let removed = conn
            .execute("DELETE FROM messages WHERE user_id = ?", [user_id])
            .await
            .map_err(|e| storage_error("Failed to clear history", e))?;

        info!(user_id = %user_id, removed, "Cleared history");
        Ok(removed)
    }

    async fn count_entries(&self, user_id: &str) -> Result<u64> {
        let conn = self.connection().await?;

        let mut rows = conn
            .query("SELECT COUNT(*) FROM messages WHERE user_id = ?", [user_id])
            .await
            .map_err(|e| storage_error("Failed to count history", e))?;

        let count = match rows
            .next()
            .await
            .map_err(|e| storage_error("Failed to read count", e))?
        {
            Some(row) => row
                .get::<i64>(0)
                .map_err(|e| storage_error("Failed to decode count", e))?,
            None => 0,
        };

        Ok(u64::try_from(count).unwrap_or(0))
    }
}
