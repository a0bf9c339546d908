//! Shared helpers for integration tests.

#![allow(dead_code)]

pub mod mocks;

use aria::db::{HistoryStore, TursoClient};
use aria::telegram::{InboundMessage, MessageKind};
use aria::{AccessControl, AppState, AriaConfig, ConversationMemory};
use mocks::{MockLLMClient, MockTransport};
use std::sync::Arc;

pub const CHAT_ID: i64 = 9000;

/// Memory over a fresh in-memory database.
pub async fn memory(max_history: usize) -> Arc<ConversationMemory> {
    let store = TursoClient::new_memory()
        .await
        .expect("Failed to create in-memory database");
    memory_over(Arc::new(store), max_history)
}

pub fn memory_over(store: Arc<dyn HistoryStore>, max_history: usize) -> Arc<ConversationMemory> {
    Arc::new(ConversationMemory::new(store, max_history).expect("valid cap"))
}

/// Everything a handler test needs, with handles kept for assertions.
pub struct Harness {
    pub state: AppState,
    pub llm: MockLLMClient,
    pub transport: Arc<MockTransport>,
    pub memory: Arc<ConversationMemory>,
}

impl Harness {
    pub async fn new(llm: MockLLMClient) -> Self {
        Self::with(
            llm,
            MockTransport::new(),
            memory(15).await,
            AriaConfig::default(),
            AccessControl::open(),
        )
    }

    pub fn with(
        llm: MockLLMClient,
        transport: MockTransport,
        memory: Arc<ConversationMemory>,
        config: AriaConfig,
        access: AccessControl,
    ) -> Self {
        let transport = Arc::new(transport);
        let state = AppState {
            config: Arc::new(config),
            memory: Arc::clone(&memory),
            llm: Arc::new(llm.clone()),
            access: Arc::new(access),
            transport: transport.clone(),
        };

        Self {
            state,
            llm,
            transport,
            memory,
        }
    }
}

pub fn inbound(user_id: &str, kind: MessageKind) -> InboundMessage {
    InboundMessage {
        update_id: 1,
        chat_id: CHAT_ID,
        user_id: user_id.to_string(),
        username: Some("tester".to_string()),
        first_name: Some("Ada".to_string()),
        kind,
    }
}

pub fn text(user_id: &str, text: &str) -> InboundMessage {
    inbound(user_id, MessageKind::Text(text.to_string()))
}

/// Stored contents for a user, oldest first.
pub async fn contents(memory: &ConversationMemory, user_id: &str) -> Vec<String> {
    memory
        .get_history(user_id)
        .await
        .expect("history readable")
        .into_iter()
        .map(|e| e.content)
        .collect()
}
