//! Google Gemini provider over the `generateContent` REST endpoint.

use crate::llm::client::{Attachment, LLMClient, split_system_prompt};
use crate::types::{AppError, Result};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini REST client
pub struct GeminiClient {
    client: Client,
    api_key: String,
    api_base: String,
    model: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Gemini calls the assistant role `model`.
fn gemini_role(role: &str) -> &'static str {
    match role {
        "assistant" => "model",
        _ => "user",
    }
}

fn to_contents(messages: &[(String, String)]) -> Vec<Content> {
    messages
        .iter()
        .map(|(role, content)| Content {
            role: gemini_role(role),
            parts: vec![Part::Text {
                text: content.clone(),
            }],
        })
        .collect()
}

impl GeminiClient {
    pub fn new(api_key: String, api_base: String, model: String) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let api_base = if api_base.trim().is_empty() {
            DEFAULT_API_BASE.to_string()
        } else {
            api_base.trim_end_matches('/').to_string()
        };

        Ok(Self {
            client,
            api_key,
            api_base,
            model,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }

    fn build_request(
        messages: &[(String, String)],
        attachment: Option<&Attachment>,
    ) -> GenerateContentRequest {
        let (system, conversation) = split_system_prompt(messages);
        let mut contents = to_contents(conversation);

        if let Some(attachment) = attachment {
            contents.push(Content {
                role: "user",
                parts: vec![
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: attachment.mime_type.clone(),
                            data: STANDARD.encode(&attachment.data),
                        },
                    },
                    Part::Text {
                        text: attachment.instruction.clone(),
                    },
                ],
            });
        }

        GenerateContentRequest {
            contents,
            system_instruction: system.map(|text| SystemInstruction {
                parts: vec![Part::Text { text }],
            }),
        }
    }

    async fn call(&self, body: &GenerateContentRequest) -> Result<String> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::ModelUnavailable(format!("Gemini request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            let detail: String = detail.chars().take(300).collect();
            error!(status = %status, detail = %detail, "Gemini API error");
            return Err(AppError::ModelUnavailable(format!(
                "Gemini API error {}: {}",
                status, detail
            )));
        }

        let data: GenerateContentResponse = response.json().await.map_err(|e| {
            AppError::ModelUnavailable(format!("Invalid Gemini response: {}", e))
        })?;

        let reply = data
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| {
                AppError::ModelUnavailable("Gemini returned no reply text".to_string())
            })?;

        debug!(chars = reply.len(), "Gemini responded");
        Ok(reply)
    }
}

#[async_trait]
impl LLMClient for GeminiClient {
    async fn generate_with_history(&self, messages: &[(String, String)]) -> Result<String> {
        let body = Self::build_request(messages, None);
        self.call(&body).await
    }

    async fn generate_with_attachment(
        &self,
        messages: &[(String, String)],
        attachment: &Attachment,
    ) -> Result<String> {
        let body = Self::build_request(messages, Some(attachment));
        self.call(&body).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
