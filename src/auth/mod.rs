//! Access control
//!
//! Aria is a personal assistant: only the Telegram users listed in
//! `[access] allowed_user_ids` (or `ALLOWED_USER_IDS`) may talk to it.
//!
//! # Open mode
//!
//! An empty allow-list admits everyone. The bot logs a warning at startup
//! when it runs in open mode.
//!
//! # Usage
//!
//! ```ignore
//! use aria::auth::AccessControl;
//!
//! let access = AccessControl::new(["1234", "5678"]);
//! access.check("1234")?;              // Ok(())
//! assert!(access.check("42").is_err()); // AppError::Unauthorized
//! ```

use crate::types::{AppError, Result};
use std::collections::HashSet;
use tracing::warn;

/// Allow-list of Telegram user ids.
#[derive(Debug, Clone, Default)]
pub struct AccessControl {
    allowed: HashSet<String>,
}

impl AccessControl {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed = ids
            .into_iter()
            .map(|id| id.as_ref().trim().to_string())
            .filter(|id| !id.is_empty())
            .collect();

        Self { allowed }
    }

    /// Everyone is admitted.
    pub fn open() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.allowed.is_empty()
    }

    pub fn is_allowed(&self, user_id: &str) -> bool {
        self.is_open() || self.allowed.contains(user_id)
    }

    /// Admit or reject a user.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` for users outside a non-empty allow-list.
    pub fn check(&self, user_id: &str) -> Result<()> {
        if self.is_allowed(user_id) {
            return Ok(());
        }

        warn!(user_id = %user_id, "Unauthorized access attempt");
        Err(AppError::Unauthorized(format!(
            "user {} is not on the allow-list",
            user_id
        )))
    }

    pub fn len(&self) -> usize {
        self.allowed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }
}
