//! # Aria - personal Telegram assistant
//!
//! Aria relays Telegram messages (text, photos, voice notes and text
//! documents) to a language model and keeps a bounded, per-user conversation
//! memory so every reply is informed by the recent exchange.
//!
//! ## Overview
//!
//! Aria can be used in two ways:
//!
//! 1. **As a bot** - Run the `aria-bot` binary
//! 2. **As a library** - Reuse the memory store, model clients or transport
//!
//! ### Conversation memory
//!
//! ```rust,ignore
//! use aria::db::DatabaseProvider;
//! use aria::memory::ConversationMemory;
//! use std::sync::Arc;
//!
//! let store = DatabaseProvider::SQLite { path: "memory.db".into() }
//!     .create_client()
//!     .await?;
//! let memory = ConversationMemory::new(Arc::from(store), 15)?;
//!
//! memory.append_turn("42", "hi", "Hello! How can I help?").await?;
//! let history = memory.get_history("42").await?;
//! ```
//!
//! ### Talking to a model
//!
//! ```rust,ignore
//! use aria::{LLMClient, Provider};
//!
//! let provider = Provider::Ollama {
//!     base_url: "http://localhost:11434".to_string(),
//!     model: "llama3.2".to_string(),
//! };
//! let client = provider.create_client().await?;
//! let reply = client
//!     .generate_with_history(&[("user".into(), "Hello, world!".into())])
//!     .await?;
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `ollama` | Ollama local inference (default) |
//! | `turso` | Remote Turso database |
//!
//! ## Modules
//!
//! - [`auth`] - Allow-list access control
//! - [`bot`] - Command and message handlers, polling loop
//! - [`db`] - Database abstraction (SQLite, Turso)
//! - [`llm`] - Model client implementations
//! - [`memory`] - Bounded per-user conversation memory
//! - [`telegram`] - Telegram Bot API transport
//! - [`types`] - Common types and error handling
//! - [`utils`] - Configuration

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

/// Allow-list access control.
pub mod auth;
/// Telegram update handlers and the polling loop.
pub mod bot;
/// CLI output helpers.
pub mod cli;
/// Database clients and abstractions.
pub mod db;
/// LLM provider clients and abstractions.
pub mod llm;
/// Bounded per-user conversation memory.
pub mod memory;
/// Telegram Bot API transport.
pub mod telegram;
/// Core types (history entries, errors).
pub mod types;
/// Configuration utilities (TOML + environment).
pub mod utils;

// Re-export commonly used types
pub use auth::AccessControl;
pub use db::{DatabaseProvider, HistoryStore, TursoClient};
pub use llm::{LLMClient, Provider};
pub use memory::ConversationMemory;
pub use telegram::{ChatTransport, TelegramClient};
pub use types::{AppError, Result};
pub use utils::AriaConfig;

use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Immutable configuration built at startup
    pub config: Arc<AriaConfig>,
    /// Per-user conversation memory
    pub memory: Arc<ConversationMemory>,
    /// Model client for the configured provider
    pub llm: Arc<dyn LLMClient>,
    /// Allow-list checked before any other work
    pub access: Arc<AccessControl>,
    /// Outbound chat transport
    pub transport: Arc<dyn ChatTransport>,
}

impl AppState {
    /// The persona sent as the system prompt on every model call
    pub fn system_prompt(&self) -> &str {
        self.config
            .model
            .system_prompt
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(bot::prompts::SYSTEM_PROMPT)
    }
}
