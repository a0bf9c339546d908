use super::ChatTransport;
use super::chunk::{TELEGRAM_MAX_LEN, chunk_message};
use super::types::{TelegramFile, TelegramResponse, TelegramUpdate, TelegramUser};
use crate::types::{AppError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";
/// Default timeout for Bot API calls (seconds)
const API_TIMEOUT_SECS: u64 = 30;

/// Telegram Bot API client (long polling).
pub struct TelegramClient {
    client: Client,
    token: String,
    api_base: String,
    polling_timeout: u64,
    download_timeout: Duration,
    /// Highest update id handed out by `get_updates`
    last_update_id: AtomicI64,
}

/// reqwest errors embed the request URL, which carries the bot token.
fn transport_error(context: &str, e: reqwest::Error) -> AppError {
    AppError::Transport(format!("{}: {}", context, e.without_url()))
}

impl TelegramClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            token: token.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            polling_timeout: 30,
            download_timeout: Duration::from_secs(API_TIMEOUT_SECS),
            last_update_id: AtomicI64::new(0),
        }
    }

    /// Point the client at another Bot API server (self-hosted or a mock).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Long-poll timeout in seconds; zero means short polling.
    pub fn with_polling_timeout(mut self, secs: u64) -> Self {
        self.polling_timeout = secs;
        self
    }

    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{}", self.api_base, self.token, file_path)
    }

    /// POST a Bot API method and unwrap the `{ok, result}` envelope.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &serde_json::Value,
        timeout: Duration,
    ) -> Result<T> {
        let response = self
            .client
            .post(self.api_url(method))
            .json(params)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| transport_error(method, e))?;

        let status = response.status();
        let body: TelegramResponse<T> = response
            .json()
            .await
            .map_err(|e| transport_error(method, e))?;

        if !body.ok {
            return Err(AppError::Transport(format!(
                "Telegram API error on {} ({}): {}",
                method,
                status,
                body.description.unwrap_or_default()
            )));
        }

        body.result.ok_or_else(|| {
            AppError::Transport(format!("Telegram returned ok but no result for {}", method))
        })
    }

    /// Test the token by calling getMe
    pub async fn get_me(&self) -> Result<TelegramUser> {
        self.call("getMe", &json!({}), Duration::from_secs(API_TIMEOUT_SECS))
            .await
    }

    /// Discard updates queued while the bot was offline.
    pub async fn drop_pending_updates(&self) -> Result<()> {
        let _: bool = self
            .call(
                "deleteWebhook",
                &json!({ "drop_pending_updates": true }),
                Duration::from_secs(API_TIMEOUT_SECS),
            )
            .await?;
        debug!("Dropped pending updates");
        Ok(())
    }

    /// Long-poll for new updates, advancing the offset past everything returned.
    pub async fn get_updates(&self) -> Result<Vec<TelegramUpdate>> {
        let last = self.last_update_id.load(Ordering::SeqCst);
        let params = json!({
            "offset": if last > 0 { last + 1 } else { 0 },
            "timeout": self.polling_timeout,
            "allowed_updates": ["message"],
        });

        let updates: Vec<TelegramUpdate> = self
            .call(
                "getUpdates",
                &params,
                Duration::from_secs(self.polling_timeout + 10),
            )
            .await?;

        if let Some(max) = updates.iter().map(|u| u.update_id).max() {
            self.last_update_id.fetch_max(max, Ordering::SeqCst);
        }

        Ok(updates)
    }

    pub fn last_update_id(&self) -> i64 {
        self.last_update_id.load(Ordering::SeqCst)
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        parse_mode: Option<&str>,
    ) -> Result<()> {
        let mut params = json!({
            "chat_id": chat_id,
            "text": text,
        });
        if let Some(mode) = parse_mode {
            params["parse_mode"] = serde_json::Value::String(mode.to_string());
        }

        let _: serde_json::Value = self
            .call("sendMessage", &params, Duration::from_secs(API_TIMEOUT_SECS))
            .await?;
        Ok(())
    }

    /// Resolve a file id to its download path.
    pub async fn get_file(&self, file_id: &str) -> Result<TelegramFile> {
        self.call(
            "getFile",
            &json!({ "file_id": file_id }),
            Duration::from_secs(API_TIMEOUT_SECS),
        )
        .await
    }
}

#[async_trait]
impl ChatTransport for TelegramClient {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()> {
        for chunk in chunk_message(text, TELEGRAM_MAX_LEN) {
            if let Err(e) = self.send_message(chat_id, &chunk, Some("Markdown")).await {
                // Usually unbalanced Markdown entities in model output
                warn!(chat_id, error = %e, "Markdown send failed, retrying as plain text");
                self.send_message(chat_id, &chunk, None).await?;
            }
        }
        Ok(())
    }

    async fn send_typing(&self, chat_id: i64) -> Result<()> {
        let _: bool = self
            .call(
                "sendChatAction",
                &json!({ "chat_id": chat_id, "action": "typing" }),
                Duration::from_secs(API_TIMEOUT_SECS),
            )
            .await?;
        Ok(())
    }

    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>> {
        let file = self
            .get_file(file_id)
            .await
            .map_err(|e| AppError::MediaDecode(format!("getFile failed: {}", e)))?;
        let file_path = file.file_path.ok_or_else(|| {
            AppError::MediaDecode(format!("File {} has no download path", file.file_id))
        })?;

        let response = self
            .client
            .get(self.file_url(&file_path))
            .timeout(self.download_timeout)
            .send()
            .await
            .map_err(|e| AppError::MediaDecode(format!("download failed: {}", e.without_url())))?;

        if !response.status().is_success() {
            return Err(AppError::MediaDecode(format!(
                "download failed with status {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::MediaDecode(format!("download failed: {}", e.without_url())))?;

        debug!(file_id = %file_id, bytes = bytes.len(), "Downloaded Telegram file");
        Ok(bytes.to_vec())
    }
}
