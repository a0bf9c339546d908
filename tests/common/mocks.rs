//! Mock implementations for testing.
//!
//! This module provides mock model clients, chat transports and history
//! stores that can be shared across test files without duplication.

use aria::db::{HistoryStore, TursoClient};
use aria::llm::{Attachment, AttachmentKind, LLMClient};
use aria::telegram::ChatTransport;
use aria::types::{AppError, HistoryEntry, MessageRole, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// One call observed by [`MockLLMClient`].
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub messages: Vec<(String, String)>,
    pub attachment: Option<RecordedAttachment>,
}

#[derive(Debug, Clone)]
pub struct RecordedAttachment {
    pub kind: AttachmentKind,
    pub mime_type: String,
    pub instruction: String,
    pub len: usize,
}

/// Mock LLM client with a canned reply.
///
/// It can be configured to fail or to stall, and it records every request
/// so tests can assert on the context the handlers built.
///
/// # Examples
///
/// ```ignore
/// let client = MockLLMClient::new("Hello, world!");
/// let client = MockLLMClient::failing();
/// let client = MockLLMClient::new("late").with_delay(Duration::from_secs(5));
/// ```
#[derive(Clone)]
pub struct MockLLMClient {
    response: String,
    should_fail: bool,
    delay: Option<Duration>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockLLMClient {
    /// Create a new mock client that returns the given response.
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            should_fail: false,
            delay: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock client that always returns an error.
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::new("")
        }
    }

    /// Sleep before answering (for timeout tests).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn last_call(&self) -> RecordedCall {
        self.calls
            .lock()
            .last()
            .cloned()
            .expect("model was never called")
    }

    async fn answer(&self, call: RecordedCall) -> Result<String> {
        self.calls.lock().push(call);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.should_fail {
            return Err(AppError::ModelUnavailable("Mock LLM failure".to_string()));
        }
        Ok(self.response.clone())
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn generate_with_history(&self, messages: &[(String, String)]) -> Result<String> {
        self.answer(RecordedCall {
            messages: messages.to_vec(),
            attachment: None,
        })
        .await
    }

    async fn generate_with_attachment(
        &self,
        messages: &[(String, String)],
        attachment: &Attachment,
    ) -> Result<String> {
        self.answer(RecordedCall {
            messages: messages.to_vec(),
            attachment: Some(RecordedAttachment {
                kind: attachment.kind,
                mime_type: attachment.mime_type.clone(),
                instruction: attachment.instruction.clone(),
                len: attachment.data.len(),
            }),
        })
        .await
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

/// In-memory chat transport that records what the bot sends.
#[derive(Default)]
pub struct MockTransport {
    sent: Mutex<Vec<(i64, String)>>,
    typing: Mutex<Vec<i64>>,
    files: Mutex<HashMap<String, Vec<u8>>>,
    fail_typing: bool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Typing indicators fail; replies still go through.
    pub fn with_failing_typing() -> Self {
        Self {
            fail_typing: true,
            ..Self::default()
        }
    }

    pub fn add_file(&self, file_id: &str, bytes: &[u8]) {
        self.files.lock().insert(file_id.to_string(), bytes.to_vec());
    }

    pub fn sent(&self) -> Vec<(i64, String)> {
        self.sent.lock().clone()
    }

    /// Text of the only message sent so far.
    pub fn single_reply(&self) -> String {
        let sent = self.sent.lock();
        assert_eq!(sent.len(), 1, "expected exactly one reply, got {:?}", *sent);
        sent[0].1.clone()
    }

    pub fn typing_count(&self) -> usize {
        self.typing.lock().len()
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()> {
        self.sent.lock().push((chat_id, text.to_string()));
        Ok(())
    }

    async fn send_typing(&self, chat_id: i64) -> Result<()> {
        if self.fail_typing {
            return Err(AppError::Transport("typing failed".to_string()));
        }
        self.typing.lock().push(chat_id);
        Ok(())
    }

    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>> {
        self.files
            .lock()
            .get(file_id)
            .cloned()
            .ok_or_else(|| AppError::MediaDecode(format!("no such file: {}", file_id)))
    }
}

/// History store wrapper that can fail reads and/or writes.
pub struct FlakyStore {
    inner: TursoClient,
    fail_reads: bool,
    fail_writes: bool,
}

impl FlakyStore {
    pub async fn new(fail_reads: bool, fail_writes: bool) -> Self {
        Self {
            inner: TursoClient::new_memory()
                .await
                .expect("Failed to create in-memory database"),
            fail_reads,
            fail_writes,
        }
    }

    fn unavailable() -> AppError {
        AppError::StorageUnavailable("disk I/O error".to_string())
    }
}

#[async_trait]
impl HistoryStore for FlakyStore {
    async fn append_entries(
        &self,
        user_id: &str,
        entries: &[(MessageRole, &str)],
        max_history: usize,
    ) -> Result<()> {
        if self.fail_writes {
            return Err(Self::unavailable());
        }
        self.inner
            .append_entries(user_id, entries, max_history)
            .await
    }

    async fn recent_entries(&self, user_id: &str, limit: usize) -> Result<Vec<HistoryEntry>> {
        if self.fail_reads {
            return Err(Self::unavailable());
        }
        self.inner.recent_entries(user_id, limit).await
    }

    async fn clear_entries(&self, user_id: &str) -> Result<u64> {
        if self.fail_writes {
            return Err(Self::unavailable());
        }
        self.inner.clear_entries(user_id).await
    }

    async fn count_entries(&self, user_id: &str) -> Result<u64> {
        self.inner.count_entries(user_id).await
    }
}
