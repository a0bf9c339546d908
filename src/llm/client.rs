//! LLM Client abstractions and provider management
//!
//! This module provides a unified interface for the model providers the bot
//! can talk to:
//! - **Ollama**: local inference, text and images (feature `ollama`)
//! - **Gemini**: Google Generative Language REST API, text, images and audio

use crate::types::{AppError, Result};
use async_trait::async_trait;

/// Generic LLM client trait for provider abstraction
///
/// Messages are `(role, content)` pairs in conversation order. Roles are
/// `system`, `user` and `assistant`; the last pair is normally the pending
/// user message.
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Generate the assistant's next reply from a conversation
    async fn generate_with_history(&self, messages: &[(String, String)]) -> Result<String>;

    /// Generate a reply to binary media (photo or voice) in the context of a
    /// conversation
    async fn generate_with_attachment(
        &self,
        messages: &[(String, String)],
        attachment: &Attachment,
    ) -> Result<String>;

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}

/// Kind of media carried by an [`Attachment`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Image,
    Audio,
}

/// Binary media plus the instruction that tells the model what to do with it
#[derive(Debug, Clone)]
pub struct Attachment {
    pub kind: AttachmentKind,
    /// MIME type, e.g. `image/jpeg` or `audio/ogg`
    pub mime_type: String,
    pub data: Vec<u8>,
    /// Text sent alongside the media in the same user turn
    pub instruction: String,
}

impl Attachment {
    pub fn image(data: Vec<u8>, mime_type: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            kind: AttachmentKind::Image,
            mime_type: mime_type.into(),
            data,
            instruction: instruction.into(),
        }
    }

    pub fn audio(data: Vec<u8>, mime_type: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            kind: AttachmentKind::Audio,
            mime_type: mime_type.into(),
            data,
            instruction: instruction.into(),
        }
    }
}

/// Split leading `system` pairs from the rest of the conversation.
///
/// Several system prompts are joined with blank lines.
pub fn split_system_prompt(messages: &[(String, String)]) -> (Option<String>, &[(String, String)]) {
    let count = messages
        .iter()
        .take_while(|(role, _)| role == "system")
        .count();

    if count == 0 {
        return (None, messages);
    }

    let system = messages[..count]
        .iter()
        .map(|(_, content)| content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    (Some(system), &messages[count..])
}

/// Provider enum for runtime selection
///
/// | Provider | Text | Images | Audio |
/// |----------|------|--------|-------|
/// | Ollama   | ✅   | ✅     | ❌    |
/// | Gemini   | ✅   | ✅     | ✅    |
#[derive(Debug, Clone)]
pub enum Provider {
    /// Ollama local LLM provider
    ///
    /// # Example
    /// ```rust,ignore
    /// let provider = Provider::Ollama {
    ///     base_url: "http://localhost:11434".to_string(),
    ///     model: "llama3.2".to_string(),
    /// };
    /// ```
    Ollama { base_url: String, model: String },

    /// Google Gemini via the `generateContent` REST endpoint
    ///
    /// # Example
    /// ```rust,ignore
    /// let provider = Provider::Gemini {
    ///     api_key: std::env::var("GEMINI_API_KEY")?,
    ///     api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
    ///     model: "gemini-2.0-flash".to_string(),
    /// };
    /// ```
    Gemini {
        api_key: String,
        api_base: String,
        model: String,
    },
}

impl Provider {
    /// Create a client instance for this provider
    ///
    /// # Errors
    ///
    /// Returns an error if the provider was compiled out or its configuration
    /// is unusable.
    pub async fn create_client(&self) -> Result<Box<dyn LLMClient>> {
        match self {
            #[cfg(feature = "ollama")]
            Provider::Ollama { base_url, model } => Ok(Box::new(
                super::ollama::OllamaClient::new(base_url.clone(), model.clone()).await?,
            )),

            #[cfg(not(feature = "ollama"))]
            Provider::Ollama { model, .. } => Err(AppError::Config(format!(
                "Model '{}' needs the Ollama provider, but this build lacks the `ollama` feature",
                model
            ))),

            Provider::Gemini {
                api_key,
                api_base,
                model,
            } => {
                if api_key.is_empty() {
                    return Err(AppError::Config(
                        "Gemini provider requires an API key".to_string(),
                    ));
                }
                Ok(Box::new(super::gemini::GeminiClient::new(
                    api_key.clone(),
                    api_base.clone(),
                    model.clone(),
                )?))
            }
        }
    }

    /// Get a human-readable name for this provider
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Ollama { .. } => "Ollama",
            Provider::Gemini { .. } => "Gemini",
        }
    }

    /// The configured model identifier
    pub fn model(&self) -> &str {
        match self {
            Provider::Ollama { model, .. } | Provider::Gemini { model, .. } => model,
        }
    }
}
