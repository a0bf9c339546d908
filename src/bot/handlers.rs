//! Per-update handling.
//!
//! Every inbound message gets exactly one reply: the model's answer, a
//! command response, or the user-facing text of whatever error stopped the
//! turn. A turn is recorded in memory only after the model has answered.

use super::documents;
use super::prompts;
use crate::AppState;
use crate::llm::Attachment;
use crate::memory::build_model_messages;
use crate::telegram::{InboundMessage, MessageKind};
use crate::types::{AppError, Result};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Bot commands. Unrecognized `/words` fall back to the help text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Reset,
    Unknown(String),
}

impl Command {
    /// Parse `/command`, `/command@BotName` or `/command args`.
    ///
    /// Returns `None` for ordinary text.
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.trim_start().strip_prefix('/')?.split_whitespace().next()?;
        let name = word.split('@').next().unwrap_or(word).to_ascii_lowercase();

        Some(match name.as_str() {
            "start" => Command::Start,
            "help" => Command::Help,
            "reset" => Command::Reset,
            _ => Command::Unknown(name),
        })
    }
}

/// What the model is asked, and what memory keeps of the user's side.
struct Turn {
    /// Final user message in the model input (text turns only)
    prompt: Option<String>,
    attachment: Option<Attachment>,
    /// User-side text recorded in memory
    stored: String,
}

/// Handle one inbound message and send its single reply.
pub async fn handle_message(state: &AppState, message: InboundMessage) {
    let chat_id = message.chat_id;

    let reply = match process(state, &message).await {
        Ok(reply) => reply,
        Err(e) => {
            match &e {
                AppError::Unauthorized(_) | AppError::InvalidInput(_) => {
                    debug!(error = %e, "Update rejected")
                }
                AppError::StorageUnavailable(_) => {
                    error!(target: "aria::storage", error = %e, "Update failed on storage")
                }
                _ => error!(error = %e, "Update failed"),
            }
            e.user_message().to_string()
        }
    };

    if let Err(e) = state.transport.send_text(chat_id, &reply).await {
        error!(chat_id, error = %e, "Failed to deliver reply");
    }
}

async fn process(state: &AppState, message: &InboundMessage) -> Result<String> {
    // Nothing is read or stored for users outside the allow-list
    state.access.check(&message.user_id)?;

    match &message.kind {
        MessageKind::Text(text) => match Command::parse(text) {
            Some(command) => run_command(state, message, command).await,
            None => handle_text(state, message, text).await,
        },
        MessageKind::Photo { file_id, caption } => {
            handle_photo(state, message, file_id, caption.as_deref()).await
        }
        MessageKind::Voice { file_id, mime_type } => {
            handle_voice(state, message, file_id, mime_type).await
        }
        MessageKind::Document {
            file_id,
            file_name,
            mime_type,
            caption,
        } => {
            handle_document(
                state,
                message,
                file_id,
                file_name,
                mime_type.as_deref(),
                caption.as_deref(),
            )
            .await
        }
    }
}

async fn run_command(
    state: &AppState,
    message: &InboundMessage,
    command: Command,
) -> Result<String> {
    match command {
        Command::Start => Ok(prompts::welcome(message.display_name())),
        Command::Help => Ok(prompts::HELP.to_string()),
        Command::Reset => {
            let removed = state.memory.clear(&message.user_id).await?;
            info!(user_id = %message.user_id, removed, "User reset their history");
            Ok(prompts::RESET_DONE.to_string())
        }
        Command::Unknown(name) => {
            debug!(command = %name, "Unknown command");
            Ok(prompts::HELP.to_string())
        }
    }
}

async fn handle_text(state: &AppState, message: &InboundMessage, text: &str) -> Result<String> {
    info!(user_id = %message.user_id, chars = text.chars().count(), "Text message");
    send_typing(state, message.chat_id).await;

    complete_turn(
        state,
        message,
        Turn {
            prompt: Some(text.to_string()),
            attachment: None,
            stored: text.to_string(),
        },
    )
    .await
}

async fn handle_photo(
    state: &AppState,
    message: &InboundMessage,
    file_id: &str,
    caption: Option<&str>,
) -> Result<String> {
    info!(user_id = %message.user_id, has_caption = caption.is_some(), "Photo message");
    send_typing(state, message.chat_id).await;

    let bytes = download(state, file_id).await?;
    let instruction = caption.unwrap_or(prompts::PHOTO_INSTRUCTION);

    complete_turn(
        state,
        message,
        Turn {
            prompt: None,
            // Telegram re-encodes every photo as JPEG
            attachment: Some(Attachment::image(bytes, "image/jpeg", instruction)),
            stored: prompts::photo_display(caption),
        },
    )
    .await
}

async fn handle_voice(
    state: &AppState,
    message: &InboundMessage,
    file_id: &str,
    mime_type: &str,
) -> Result<String> {
    info!(user_id = %message.user_id, mime_type = %mime_type, "Voice message");
    send_typing(state, message.chat_id).await;

    let bytes = download(state, file_id).await?;

    complete_turn(
        state,
        message,
        Turn {
            prompt: None,
            attachment: Some(Attachment::audio(
                bytes,
                mime_type,
                prompts::VOICE_INSTRUCTION,
            )),
            stored: prompts::VOICE_DISPLAY.to_string(),
        },
    )
    .await
}

async fn handle_document(
    state: &AppState,
    message: &InboundMessage,
    file_id: &str,
    file_name: &str,
    mime_type: Option<&str>,
    caption: Option<&str>,
) -> Result<String> {
    info!(user_id = %message.user_id, file_name = %file_name, "Document message");

    if !documents::is_text_document(file_name, mime_type) {
        return Err(AppError::MediaDecode(format!(
            "unsupported document type for {} ({})",
            file_name,
            mime_type.unwrap_or("unknown")
        )));
    }

    send_typing(state, message.chat_id).await;

    let bytes = download(state, file_id).await?;
    let text = documents::extract_text(&bytes, file_name, state.config.media.max_document_chars)?;

    complete_turn(
        state,
        message,
        Turn {
            prompt: Some(prompts::document_prompt(file_name, caption, &text)),
            attachment: None,
            stored: prompts::document_display(file_name, caption),
        },
    )
    .await
}

/// Ask the model with the user's history as context, then record the turn.
async fn complete_turn(state: &AppState, message: &InboundMessage, turn: Turn) -> Result<String> {
    let user_id = &message.user_id;

    let history = match state.memory.get_history(user_id).await {
        Ok(history) => history,
        Err(e) => {
            // Answer without context rather than not at all
            warn!(target: "aria::storage", user_id = %user_id, error = %e, "History unavailable, continuing without context");
            Vec::new()
        }
    };

    let messages = build_model_messages(
        Some(state.system_prompt()),
        &history,
        turn.prompt.as_deref(),
    );

    let reply = match &turn.attachment {
        Some(attachment) => {
            with_model_timeout(state, state.llm.generate_with_attachment(&messages, attachment))
                .await?
        }
        None => with_model_timeout(state, state.llm.generate_with_history(&messages)).await?,
    };

    if reply.trim().is_empty() {
        return Err(AppError::ModelUnavailable(
            "model returned an empty reply".to_string(),
        ));
    }

    if let Err(e) = state.memory.append_turn(user_id, &turn.stored, &reply).await {
        error!(target: "aria::storage", user_id = %user_id, error = %e, "Failed to record turn");
    }

    debug!(user_id = %user_id, chars = reply.chars().count(), model = %state.llm.model_name(), "Reply ready");
    Ok(reply)
}

async fn with_model_timeout<F>(state: &AppState, call: F) -> Result<String>
where
    F: Future<Output = Result<String>>,
{
    let secs = state.config.model.timeout_secs;
    match tokio::time::timeout(Duration::from_secs(secs), call).await {
        Ok(result) => result,
        Err(_) => Err(AppError::ModelTimeout(secs)),
    }
}

async fn download(state: &AppState, file_id: &str) -> Result<Vec<u8>> {
    let secs = state.config.media.download_timeout_secs;
    match tokio::time::timeout(
        Duration::from_secs(secs),
        state.transport.download_file(file_id),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => Err(AppError::MediaDecode(format!(
            "download of {} timed out after {}s",
            file_id, secs
        ))),
    }
}

async fn send_typing(state: &AppState, chat_id: i64) {
    if let Err(e) = state.transport.send_typing(chat_id).await {
        debug!(chat_id, error = %e, "Typing indicator failed");
    }
}
