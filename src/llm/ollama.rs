use crate::llm::client::{Attachment, AttachmentKind, LLMClient};
use crate::types::{AppError, Result};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ollama_rs::{
    Ollama,
    generation::chat::{ChatMessage, request::ChatMessageRequest},
    generation::images::Image,
};

const DEFAULT_PORT: u16 = 11434;

pub struct OllamaClient {
    client: Ollama,
    model: String,
}

/// Split `scheme://host[:port][/...]` into `("scheme://host", port)`.
fn parse_base_url(base_url: &str) -> (String, u16) {
    let (scheme, rest) = base_url
        .split_once("://")
        .unwrap_or(("http", base_url));
    let authority = rest.split('/').next().unwrap_or_default();

    let (host, port) = match authority.rsplit_once(':') {
        Some((host, port)) => (host, port.parse().unwrap_or(DEFAULT_PORT)),
        None => (authority, DEFAULT_PORT),
    };
    let host = if host.is_empty() { "localhost" } else { host };

    (format!("{}://{}", scheme, host), port)
}

fn to_chat_messages(messages: &[(String, String)]) -> Vec<ChatMessage> {
    messages
        .iter()
        .map(|(role, content)| match role.as_str() {
            "system" => ChatMessage::system(content.clone()),
            "assistant" => ChatMessage::assistant(content.clone()),
            _ => ChatMessage::user(content.clone()),
        })
        .collect()
}

impl OllamaClient {
    pub async fn new(base_url: String, model: String) -> Result<Self> {
        let (host, port) = parse_base_url(&base_url);
        let client = Ollama::new(host, port);

        Ok(Self { client, model })
    }

    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let request = ChatMessageRequest::new(self.model.clone(), messages);

        let response = self
            .client
            .send_chat_messages(request)
            .await
            .map_err(|e| AppError::ModelUnavailable(format!("Ollama error: {}", e)))?;

        let content = response.message.content;
        if content.trim().is_empty() {
            return Err(AppError::ModelUnavailable(
                "Ollama returned an empty reply".to_string(),
            ));
        }

        Ok(content)
    }
}

#[async_trait]
impl LLMClient for OllamaClient {
    async fn generate_with_history(&self, messages: &[(String, String)]) -> Result<String> {
        self.chat(to_chat_messages(messages)).await
    }

    async fn generate_with_attachment(
        &self,
        messages: &[(String, String)],
        attachment: &Attachment,
    ) -> Result<String> {
        // Ollama chat only accepts images alongside text
        if attachment.kind == AttachmentKind::Audio {
            return Err(AppError::MediaDecode(format!(
                "Model '{}' cannot process audio through Ollama",
                self.model
            )));
        }

        let mut chat_messages = to_chat_messages(messages);
        let image = Image::from_base64(STANDARD.encode(&attachment.data));
        chat_messages
            .push(ChatMessage::user(attachment.instruction.clone()).with_images(vec![image]));

        self.chat(chat_messages).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
