//! Database abstraction traits
//!
//! This module provides the `HistoryStore` trait that abstracts over different
//! database backends (in-memory SQLite, file-based SQLite, remote Turso).
//!
//! # Example
//!
//! ```rust,ignore
//! use aria::db::DatabaseProvider;
//!
//! // Use in-memory database (ephemeral, for development/testing)
//! let db = DatabaseProvider::Memory.create_client().await?;
//!
//! // Use file-based SQLite
//! let db = DatabaseProvider::SQLite { path: "memory.db".into() }.create_client().await?;
//! ```

use crate::types::{AppError, HistoryEntry, MessageRole, Result};
use async_trait::async_trait;

/// Database provider configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DatabaseProvider {
    /// In-memory SQLite database (ephemeral, lost on restart)
    #[default]
    Memory,
    /// File-based SQLite database
    SQLite {
        /// Path to the SQLite database file
        path: String,
    },
    /// Remote Turso database (requires network access)
    #[cfg(feature = "turso")]
    Turso {
        /// The Turso database URL (e.g., `libsql://your-db.turso.io`)
        url: String,
        /// Authentication token for the Turso database
        auth_token: String,
    },
}

impl DatabaseProvider {
    /// Create a history store from this provider configuration
    pub async fn create_client(&self) -> Result<Box<dyn HistoryStore>> {
        match self {
            DatabaseProvider::Memory => {
                let client = super::turso::TursoClient::new_memory().await?;
                Ok(Box::new(client))
            }
            DatabaseProvider::SQLite { path } => {
                let client = super::turso::TursoClient::new_local(path).await?;
                Ok(Box::new(client))
            }
            #[cfg(feature = "turso")]
            DatabaseProvider::Turso { url, auth_token } => {
                let client =
                    super::turso::TursoClient::new_remote(url.clone(), auth_token.clone()).await?;
                Ok(Box::new(client))
            }
        }
    }

    /// Pick a provider from a configured database path.
    ///
    /// `:memory:` (or an empty path) selects the ephemeral backend. A
    /// `libsql://` URL selects Turso and needs both the `turso` feature and
    /// a non-empty `auth_token`; anything else is a local SQLite file.
    pub fn from_path(path: &str, auth_token: Option<&str>) -> Result<Self> {
        let path = path.trim();

        if path.starts_with("libsql://") {
            return Self::remote(path, auth_token);
        }

        if path.is_empty() || path == ":memory:" {
            Ok(DatabaseProvider::Memory)
        } else {
            Ok(DatabaseProvider::SQLite {
                path: path.to_string(),
            })
        }
    }

    #[cfg(feature = "turso")]
    fn remote(url: &str, auth_token: Option<&str>) -> Result<Self> {
        match auth_token.map(str::trim) {
            Some(token) if !token.is_empty() => Ok(DatabaseProvider::Turso {
                url: url.to_string(),
                auth_token: token.to_string(),
            }),
            _ => Err(AppError::Config(format!(
                "{} needs a Turso auth token (TURSO_AUTH_TOKEN)",
                url
            ))),
        }
    }

    #[cfg(not(feature = "turso"))]
    fn remote(url: &str, _auth_token: Option<&str>) -> Result<Self> {
        Err(AppError::Config(format!(
            "{} is a remote database; rebuild with the `turso` feature",
            url
        )))
    }

    /// Whether entries survive a process restart.
    pub fn is_durable(&self) -> bool {
        !matches!(self, DatabaseProvider::Memory)
    }
}

/// Persistence operations behind the conversation memory.
///
/// Implementations must make `append_entries` atomic: the insert and the
/// prune either both commit or neither does.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Insert `entries` in order at the end of the user's sequence, then
    /// delete the oldest entries of that user until at most `max_history`
    /// remain. All inserts and the prune commit together or not at all.
    async fn append_entries(
        &self,
        user_id: &str,
        entries: &[(MessageRole, &str)],
        max_history: usize,
    ) -> Result<()>;

    /// Single-entry form of [`HistoryStore::append_entries`].
    async fn append_entry(
        &self,
        user_id: &str,
        role: MessageRole,
        content: &str,
        max_history: usize,
    ) -> Result<()> {
        self.append_entries(user_id, &[(role, content)], max_history)
            .await
    }

    /// The newest `limit` entries of the user, oldest first.
    async fn recent_entries(&self, user_id: &str, limit: usize) -> Result<Vec<HistoryEntry>>;

    /// Delete every entry of the user, returning how many were removed.
    async fn clear_entries(&self, user_id: &str) -> Result<u64>;

    /// Number of entries currently stored for the user.
    async fn count_entries(&self, user_id: &str) -> Result<u64>;
}
