use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============= History Types =============

/// Who produced a stored history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageRole {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(AppError::InvalidInput(format!(
                "Unknown message role '{}'",
                other
            ))),
        }
    }
}

/// One stored turn fragment, in insertion order within its user's partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Insertion sequence (monotonic per database)
    pub id: i64,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl HistoryEntry {
    /// The `(role, content)` pair handed to model clients.
    pub fn to_pair(&self) -> (String, String) {
        (self.role.as_str().to_string(), self.content.clone())
    }
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Model call timed out after {0}s")]
    ModelTimeout(u64),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Media error: {0}")]
    MediaDecode(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// The chat reply shown to a user when handling their update failed.
    ///
    /// Internal details never leak into the chat; they go to the logs.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::StorageUnavailable(_) => {
                "⚠️ My memory is temporarily unavailable. Please try again in a moment."
            }
            AppError::ModelUnavailable(_) => {
                "⚠️ Sorry, I ran into an issue reaching my AI backend. Please try again in a moment."
            }
            AppError::ModelTimeout(_) => {
                "⏳ Sorry, that took too long to answer. Please try again."
            }
            AppError::Unauthorized(_) => {
                "⛔ Access denied — you are not authorized to use this bot."
            }
            AppError::MediaDecode(_) => {
                "⚠️ Sorry, I couldn't process that file. Please try again or send it in another format."
            }
            AppError::InvalidInput(_) => {
                "🤔 I couldn't understand that request. Use /help to see what I can do."
            }
            AppError::Transport(_) | AppError::Config(_) | AppError::Internal(_) => {
                "⚠️ Something went wrong on my side. Please try again."
            }
        }
    }

    /// Whether this failure originates in the persistence layer.
    pub fn is_storage(&self) -> bool {
        matches!(self, AppError::StorageUnavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
