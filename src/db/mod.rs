//! Conversation persistence.
//!
//! This module provides the relational store behind the conversation memory:
//! - **Local SQLite** (default): durable file database opened through libsql
//! - **In-memory SQLite**: ephemeral, for tests and throwaway runs
//! - **Turso** (`turso` feature): remote libsql database
//!
//! Schema: one `messages` table keyed by `(user_id, id)`, where `id` is the
//! insertion sequence that defines conversation order.

#![allow(missing_docs)]

pub mod traits;
pub mod turso;

// Re-exports
pub use traits::{DatabaseProvider, HistoryStore};
pub use turso::TursoClient;
