//! Telegram transport
//!
//! Aria talks to Telegram through the Bot API over HTTPS:
//! - `getUpdates` long polling for inbound messages
//! - `sendMessage` / `sendChatAction` for replies and the typing indicator
//! - `getFile` plus the file endpoint for photos, voice notes and documents
//!
//! Handlers only see the [`ChatTransport`] trait, so they can be driven by a
//! mock in tests.

pub mod chunk;
pub mod client;
pub mod types;

use crate::types::Result;
use async_trait::async_trait;

pub use client::TelegramClient;
pub use types::{InboundMessage, MessageKind};

/// Outbound side of a chat platform.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Deliver a reply, split into as many messages as the platform needs.
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()>;

    /// Show the "typing..." indicator.
    async fn send_typing(&self, chat_id: i64) -> Result<()>;

    /// Fetch the bytes of an uploaded file.
    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>>;
}
