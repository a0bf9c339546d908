//! Conversation memory: a bounded, per-user rolling history.
//!
//! This module provides:
//! - [`ConversationMemory`], the store the bot reads before every model call
//!   and writes after every completed turn
//! - Helpers that turn stored history into the `(role, content)` pairs model
//!   clients consume
//!
//! Every user keeps at most `max_history` entries. Appends evict the oldest
//! entries first, and the insert plus eviction commit atomically. Writes for
//! the same user are serialized through [`UserLocks`]; writes for different
//! users proceed in parallel.

pub mod locks;

use crate::db::HistoryStore;
use crate::types::{AppError, HistoryEntry, MessageRole, Result};
use std::sync::Arc;
use tracing::debug;

pub use locks::UserLocks;

/// Default number of entries retained per user.
pub const DEFAULT_MAX_HISTORY: usize = 15;

/// Bounded per-user history over a [`HistoryStore`].
pub struct ConversationMemory {
    store: Arc<dyn HistoryStore>,
    max_history: usize,
    locks: UserLocks,
}

impl ConversationMemory {
    /// Wrap a store with a per-user cap.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when `max_history` is zero.
    pub fn new(store: Arc<dyn HistoryStore>, max_history: usize) -> Result<Self> {
        if max_history == 0 {
            return Err(AppError::InvalidInput(
                "max_history must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            store,
            max_history,
            locks: UserLocks::new(),
        })
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// Durably record one entry at the end of the user's history, evicting the
    /// oldest entries beyond the cap.
    pub async fn append(&self, user_id: &str, role: MessageRole, content: &str) -> Result<()> {
        validate(user_id, content)?;

        let _guard = self.locks.acquire(user_id).await;
        self.store
            .append_entry(user_id, role, content, self.max_history)
            .await
    }

    /// Record a completed turn: the user's message, then the assistant reply.
    ///
    /// Both entries commit in one transaction, so a turn is never stored
    /// without its reply.
    pub async fn append_turn(
        &self,
        user_id: &str,
        user_content: &str,
        assistant_content: &str,
    ) -> Result<()> {
        validate(user_id, user_content)?;
        validate(user_id, assistant_content)?;

        let _guard = self.locks.acquire(user_id).await;
        self.store
            .append_entries(
                user_id,
                &[
                    (MessageRole::User, user_content),
                    (MessageRole::Assistant, assistant_content),
                ],
                self.max_history,
            )
            .await?;

        debug!(user_id = %user_id, "Turn recorded");
        Ok(())
    }

    /// Up to `max_history` entries for the user, oldest first.
    ///
    /// The result is a snapshot; later appends do not affect it.
    pub async fn get_history(&self, user_id: &str) -> Result<Vec<HistoryEntry>> {
        self.store.recent_entries(user_id, self.max_history).await
    }

    /// Remove every entry for the user. Clearing an empty history succeeds.
    pub async fn clear(&self, user_id: &str) -> Result<u64> {
        let _guard = self.locks.acquire(user_id).await;
        self.store.clear_entries(user_id).await
    }

    /// Number of entries currently stored for the user.
    pub async fn count(&self, user_id: &str) -> Result<u64> {
        self.store.count_entries(user_id).await
    }

    /// History plus the new user message, as `(role, content)` pairs.
    ///
    /// Nothing is persisted; the caller records the turn once a reply exists.
    pub async fn model_context(
        &self,
        user_id: &str,
        new_user_message: &str,
    ) -> Result<Vec<(String, String)>> {
        let history = self.get_history(user_id).await?;
        Ok(build_model_messages(None, &history, Some(new_user_message)))
    }
}

fn validate(user_id: &str, content: &str) -> Result<()> {
    if user_id.trim().is_empty() {
        return Err(AppError::InvalidInput("user id must not be empty".to_string()));
    }
    if content.is_empty() {
        return Err(AppError::InvalidInput(
            "history content must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Assemble model input: optional system prompt, stored history, then the
/// pending user message.
pub fn build_model_messages(
    system_prompt: Option<&str>,
    history: &[HistoryEntry],
    new_user_message: Option<&str>,
) -> Vec<(String, String)> {
    let mut messages = Vec::with_capacity(history.len() + 2);

    if let Some(system) = system_prompt.filter(|s| !s.trim().is_empty()) {
        messages.push(("system".to_string(), system.to_string()));
    }

    messages.extend(history.iter().map(HistoryEntry::to_pair));

    if let Some(message) = new_user_message {
        messages.push((MessageRole::User.as_str().to_string(), message.to_string()));
    }

    messages
}
