//! LLM Provider Clients and Abstractions
//!
//! This module provides a unified interface for the language models Aria can
//! answer with. Provider-specific details stay behind the [`LLMClient`] trait,
//! so the bot handlers work with any supported backend.
//!
//! # Supported Providers
//!
//! - `ollama` (Cargo feature, on by default): local Ollama server
//! - Gemini: Google Generative Language REST API, always available
//!
//! # Example
//!
//! ```ignore
//! use aria::llm::Provider;
//!
//! let provider = Provider::Ollama {
//!     base_url: "http://localhost:11434".into(),
//!     model: "llama3.2".into(),
//! };
//! let client = provider.create_client().await?;
//!
//! let messages = vec![("user".to_string(), "What is 2+2?".to_string())];
//! let reply = client.generate_with_history(&messages).await?;
//! ```

/// Core LLM client trait, attachments and provider selection.
pub mod client;
pub mod gemini;

#[cfg(feature = "ollama")]
pub mod ollama;

pub use client::{Attachment, AttachmentKind, LLMClient, Provider};
