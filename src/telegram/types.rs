use serde::{Deserialize, Serialize};

// ============================================================================
// Telegram Bot API types
// ============================================================================

/// Envelope of every Bot API response.
#[derive(Debug, Deserialize)]
pub struct TelegramResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramMessage {
    pub message_id: i64,
    pub from: Option<TelegramUser>,
    pub chat: TelegramChat,
    #[serde(default)]
    pub date: u64,
    pub text: Option<String>,
    pub caption: Option<String>,
    pub photo: Option<Vec<TelegramPhotoSize>>,
    pub voice: Option<TelegramAudio>,
    pub audio: Option<TelegramAudio>,
    pub document: Option<TelegramDocument>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramUser {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramChat {
    pub id: i64,
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramPhotoSize {
    pub file_id: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    pub file_size: Option<i64>,
}

/// Voice notes and audio files share the fields Aria needs.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramAudio {
    pub file_id: String,
    #[serde(default)]
    pub duration: u32,
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramDocument {
    pub file_id: String,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub file_size: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramFile {
    pub file_id: String,
    pub file_path: Option<String>,
}

// ============================================================================
// Inbound messages
// ============================================================================

/// What the user sent, normalized from a Telegram message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    /// Plain text, including `/commands`
    Text(String),
    /// Largest available size of a photo
    Photo {
        file_id: String,
        caption: Option<String>,
    },
    /// Voice note or audio file
    Voice { file_id: String, mime_type: String },
    Document {
        file_id: String,
        file_name: String,
        mime_type: Option<String>,
        caption: Option<String>,
    },
}

/// A message Aria can act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub update_id: i64,
    pub chat_id: i64,
    /// Telegram user id, used as the memory partition key
    pub user_id: String,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub kind: MessageKind,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

impl InboundMessage {
    /// Normalize an update. Updates without a sender or with unsupported
    /// content (stickers, locations, edits...) yield `None`.
    pub fn from_update(update: TelegramUpdate) -> Option<Self> {
        let message = update.message?;
        let from = message.from?;
        let caption = non_empty(message.caption);

        let kind = if let Some(text) = non_empty(message.text) {
            MessageKind::Text(text)
        } else if let Some(photos) = message.photo {
            // Sizes arrive smallest first; prefer the reported byte size
            let best = photos
                .into_iter()
                .max_by_key(|p| (p.file_size.unwrap_or(0), u64::from(p.width) * u64::from(p.height)))?;
            MessageKind::Photo {
                file_id: best.file_id,
                caption,
            }
        } else if let Some(audio) = message.voice.or(message.audio) {
            MessageKind::Voice {
                file_id: audio.file_id,
                mime_type: non_empty(audio.mime_type).unwrap_or_else(|| "audio/ogg".to_string()),
            }
        } else if let Some(document) = message.document {
            MessageKind::Document {
                file_id: document.file_id,
                file_name: non_empty(document.file_name)
                    .unwrap_or_else(|| "document".to_string()),
                mime_type: non_empty(document.mime_type),
                caption,
            }
        } else {
            return None;
        };

        Some(Self {
            update_id: update.update_id,
            chat_id: message.chat.id,
            user_id: from.id.to_string(),
            username: from.username,
            first_name: from.first_name,
            kind,
        })
    }

    /// Name to greet the user with.
    pub fn display_name(&self) -> &str {
        self.first_name
            .as_deref()
            .or(self.username.as_deref())
            .unwrap_or("there")
    }
}
