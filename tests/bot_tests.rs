//! Bot handler tests
//!
//! Drive `handle_message` end to end with a mock model, a recording
//! transport and a real in-memory history store.

mod common;

use aria::bot::{Dispatcher, handle_message, prompts};
use aria::llm::AttachmentKind;
use aria::telegram::MessageKind;
use aria::telegram::types::TelegramUpdate;
use aria::{AccessControl, AppError, AriaConfig};
use common::mocks::{FlakyStore, MockLLMClient, MockTransport};
use common::{CHAT_ID, Harness, contents, inbound, memory, memory_over, text};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn config_with_timeout(secs: u64) -> AriaConfig {
    let mut config = AriaConfig::default();
    config.model.timeout_secs = secs;
    config
}

// ============= Text Turns =============

#[tokio::test]
async fn test_text_turn_replies_and_records() {
    let h = Harness::new(MockLLMClient::new("Hello Ada!")).await;

    handle_message(&h.state, text("1", "hi")).await;

    assert_eq!(h.transport.single_reply(), "Hello Ada!");
    assert_eq!(h.transport.sent()[0].0, CHAT_ID);
    assert_eq!(contents(&h.memory, "1").await, vec!["hi", "Hello Ada!"]);
    assert_eq!(h.transport.typing_count(), 1);
}

#[tokio::test]
async fn test_model_sees_system_prompt_history_and_new_message() {
    let h = Harness::new(MockLLMClient::new("reply")).await;
    h.memory.append_turn("1", "earlier", "before").await.unwrap();

    handle_message(&h.state, text("1", "now")).await;

    let call = h.llm.last_call();
    let roles: Vec<_> = call.messages.iter().map(|(r, _)| r.as_str()).collect();
    assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
    assert_eq!(call.messages[0].1, prompts::SYSTEM_PROMPT);
    assert_eq!(call.messages[1].1, "earlier");
    assert_eq!(call.messages[3].1, "now");
}

#[tokio::test]
async fn test_configured_system_prompt_replaces_persona() {
    let mut config = AriaConfig::default();
    config.model.system_prompt = Some("Answer in haiku.".to_string());
    let h = Harness::with(
        MockLLMClient::new("ok"),
        MockTransport::new(),
        memory(15).await,
        config,
        AccessControl::open(),
    );

    handle_message(&h.state, text("1", "hi")).await;

    assert_eq!(h.llm.last_call().messages[0].1, "Answer in haiku.");
}

#[tokio::test]
async fn test_cap_applies_to_recorded_turns() {
    let h = Harness::with(
        MockLLMClient::new("reply"),
        MockTransport::new(),
        memory(3).await,
        AriaConfig::default(),
        AccessControl::open(),
    );

    for msg in ["one", "two", "three"] {
        handle_message(&h.state, text("1", msg)).await;
    }

    assert_eq!(contents(&h.memory, "1").await, vec!["reply", "three", "reply"]);
    // Model context never carries more than the cap of history entries
    assert_eq!(h.llm.last_call().messages.len(), 1 + 3 + 1);
}

// ============= Failures =============

#[tokio::test]
async fn test_model_timeout_sends_notice_and_records_nothing() {
    let h = Harness::with(
        MockLLMClient::new("too late").with_delay(Duration::from_secs(3)),
        MockTransport::new(),
        memory(15).await,
        config_with_timeout(1),
        AccessControl::open(),
    );

    handle_message(&h.state, text("1", "hello?")).await;

    assert_eq!(
        h.transport.single_reply(),
        AppError::ModelTimeout(1).user_message()
    );
    assert_eq!(h.memory.count("1").await.unwrap(), 0);
}

#[tokio::test]
async fn test_model_failure_sends_notice_and_records_nothing() {
    let h = Harness::new(MockLLMClient::failing()).await;

    handle_message(&h.state, text("1", "hello?")).await;

    let reply = h.transport.single_reply();
    assert!(reply.contains("AI backend"));
    assert!(!reply.contains("Mock LLM failure"));
    assert_eq!(h.memory.count("1").await.unwrap(), 0);
}

#[tokio::test]
async fn test_blank_model_reply_is_not_recorded() {
    let h = Harness::new(MockLLMClient::new("   ")).await;

    handle_message(&h.state, text("1", "hello?")).await;

    assert_eq!(
        h.transport.single_reply(),
        AppError::ModelUnavailable(String::new()).user_message()
    );
    assert_eq!(h.memory.count("1").await.unwrap(), 0);
}

#[tokio::test]
async fn test_unreadable_history_still_answers_without_context() {
    let store = FlakyStore::new(true, false).await;
    let h = Harness::with(
        MockLLMClient::new("still here"),
        MockTransport::new(),
        memory_over(Arc::new(store), 15),
        AriaConfig::default(),
        AccessControl::open(),
    );

    handle_message(&h.state, text("1", "hi")).await;

    assert_eq!(h.transport.single_reply(), "still here");
    let roles: Vec<_> = h
        .llm
        .last_call()
        .messages
        .into_iter()
        .map(|(r, _)| r)
        .collect();
    assert_eq!(roles, vec!["system", "user"]);
}

#[tokio::test]
async fn test_unwritable_history_still_delivers_reply() {
    let store = FlakyStore::new(false, true).await;
    let h = Harness::with(
        MockLLMClient::new("answer"),
        MockTransport::new(),
        memory_over(Arc::new(store), 15),
        AriaConfig::default(),
        AccessControl::open(),
    );

    handle_message(&h.state, text("1", "hi")).await;

    assert_eq!(h.transport.single_reply(), "answer");
    assert_eq!(h.memory.count("1").await.unwrap(), 0);
}

#[tokio::test]
async fn test_reset_on_broken_storage_reports_memory_problem() {
    let store = FlakyStore::new(false, true).await;
    let h = Harness::with(
        MockLLMClient::new("unused"),
        MockTransport::new(),
        memory_over(Arc::new(store), 15),
        AriaConfig::default(),
        AccessControl::open(),
    );

    handle_message(&h.state, text("1", "/reset")).await;

    assert_eq!(
        h.transport.single_reply(),
        AppError::StorageUnavailable(String::new()).user_message()
    );
}

#[tokio::test]
async fn test_typing_failure_does_not_block_reply() {
    let h = Harness::with(
        MockLLMClient::new("fine"),
        MockTransport::with_failing_typing(),
        memory(15).await,
        AriaConfig::default(),
        AccessControl::open(),
    );

    handle_message(&h.state, text("1", "hi")).await;

    assert_eq!(h.transport.single_reply(), "fine");
}

// ============= Access Control =============

#[tokio::test]
async fn test_unauthorized_user_is_denied_without_side_effects() {
    let h = Harness::with(
        MockLLMClient::new("secret"),
        MockTransport::new(),
        memory(15).await,
        AriaConfig::default(),
        AccessControl::new(["1"]),
    );

    handle_message(&h.state, text("2", "let me in")).await;

    assert_eq!(
        h.transport.single_reply(),
        AppError::Unauthorized(String::new()).user_message()
    );
    assert!(h.llm.calls().is_empty());
    assert_eq!(h.transport.typing_count(), 0);
    assert_eq!(h.memory.count("2").await.unwrap(), 0);
}

#[tokio::test]
async fn test_unauthorized_user_cannot_reset_others() {
    let h = Harness::with(
        MockLLMClient::new("ok"),
        MockTransport::new(),
        memory(15).await,
        AriaConfig::default(),
        AccessControl::new(["1"]),
    );
    h.memory.append_turn("2", "stale", "entries").await.unwrap();

    handle_message(&h.state, text("2", "/reset")).await;

    assert_eq!(h.memory.count("2").await.unwrap(), 2);
}

#[tokio::test]
async fn test_allowed_user_is_served() {
    let h = Harness::with(
        MockLLMClient::new("welcome back"),
        MockTransport::new(),
        memory(15).await,
        AriaConfig::default(),
        AccessControl::new(["1", "3"]),
    );

    handle_message(&h.state, text("3", "hi")).await;

    assert_eq!(h.transport.single_reply(), "welcome back");
}

// ============= Commands =============

#[tokio::test]
async fn test_start_greets_by_first_name() {
    let h = Harness::new(MockLLMClient::new("unused")).await;

    handle_message(&h.state, text("1", "/start")).await;

    let reply = h.transport.single_reply();
    assert!(reply.starts_with("👋 Hi Ada!"));
    assert!(h.llm.calls().is_empty());
    assert_eq!(h.memory.count("1").await.unwrap(), 0);
}

#[tokio::test]
async fn test_help_and_unknown_commands_show_help() {
    let h = Harness::new(MockLLMClient::new("unused")).await;

    handle_message(&h.state, text("1", "/help")).await;
    handle_message(&h.state, text("1", "/weather")).await;

    let sent = h.transport.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|(_, t)| t == prompts::HELP));
    assert!(h.llm.calls().is_empty());
}

#[tokio::test]
async fn test_reset_clears_only_the_sender() {
    let h = Harness::new(MockLLMClient::new("unused")).await;
    h.memory.append_turn("1", "mine", "yours").await.unwrap();
    h.memory.append_turn("2", "other", "user").await.unwrap();

    handle_message(&h.state, text("1", "/reset")).await;

    assert_eq!(h.transport.single_reply(), prompts::RESET_DONE);
    assert_eq!(h.memory.count("1").await.unwrap(), 0);
    assert_eq!(h.memory.count("2").await.unwrap(), 2);
}

#[tokio::test]
async fn test_reset_with_empty_history_still_confirms() {
    let h = Harness::new(MockLLMClient::new("unused")).await;

    handle_message(&h.state, text("1", "/reset@AriaBot")).await;

    assert_eq!(h.transport.single_reply(), prompts::RESET_DONE);
}

// ============= Media =============

#[tokio::test]
async fn test_photo_with_caption() {
    let h = Harness::new(MockLLMClient::new("A cat on a sofa.")).await;
    h.transport.add_file("photo-1", &[0xff, 0xd8, 0xff]);

    let message = inbound(
        "1",
        MessageKind::Photo {
            file_id: "photo-1".into(),
            caption: Some("What animal is this?".into()),
        },
    );
    handle_message(&h.state, message).await;

    assert_eq!(h.transport.single_reply(), "A cat on a sofa.");

    let attachment = h.llm.last_call().attachment.expect("image attached");
    assert_eq!(attachment.kind, AttachmentKind::Image);
    assert_eq!(attachment.mime_type, "image/jpeg");
    assert_eq!(attachment.instruction, "What animal is this?");
    assert_eq!(attachment.len, 3);

    assert_eq!(
        contents(&h.memory, "1").await,
        vec!["[Sent a photo]: What animal is this?", "A cat on a sofa."]
    );
}

#[tokio::test]
async fn test_photo_without_caption_uses_default_instruction() {
    let h = Harness::new(MockLLMClient::new("A sunset.")).await;
    h.transport.add_file("photo-1", &[0xff, 0xd8]);

    let message = inbound(
        "1",
        MessageKind::Photo {
            file_id: "photo-1".into(),
            caption: None,
        },
    );
    handle_message(&h.state, message).await;

    let attachment = h.llm.last_call().attachment.unwrap();
    assert_eq!(attachment.instruction, prompts::PHOTO_INSTRUCTION);
    assert_eq!(
        contents(&h.memory, "1").await,
        vec!["[Sent a photo]", "A sunset."]
    );
}

#[tokio::test]
async fn test_failed_download_reports_media_error() {
    let h = Harness::new(MockLLMClient::new("unused")).await;

    let message = inbound(
        "1",
        MessageKind::Photo {
            file_id: "missing".into(),
            caption: None,
        },
    );
    handle_message(&h.state, message).await;

    assert_eq!(
        h.transport.single_reply(),
        AppError::MediaDecode(String::new()).user_message()
    );
    assert!(h.llm.calls().is_empty());
    assert_eq!(h.memory.count("1").await.unwrap(), 0);
}

#[tokio::test]
async fn test_voice_message_recorded_as_placeholder() {
    let h = Harness::new(MockLLMClient::new("🎙️ Transcription: hello")).await;
    h.transport.add_file("voice-1", b"OggS....");

    let message = inbound(
        "1",
        MessageKind::Voice {
            file_id: "voice-1".into(),
            mime_type: "audio/ogg".into(),
        },
    );
    handle_message(&h.state, message).await;

    let attachment = h.llm.last_call().attachment.unwrap();
    assert_eq!(attachment.kind, AttachmentKind::Audio);
    assert_eq!(attachment.mime_type, "audio/ogg");
    assert_eq!(attachment.instruction, prompts::VOICE_INSTRUCTION);

    assert_eq!(
        contents(&h.memory, "1").await,
        vec![prompts::VOICE_DISPLAY, "🎙️ Transcription: hello"]
    );
}

#[tokio::test]
async fn test_text_document_is_read_and_summarized() {
    let h = Harness::new(MockLLMClient::new("Summary: shopping list.")).await;
    h.transport.add_file("doc-1", "eggs\nmilk\nbread".as_bytes());

    let message = inbound(
        "1",
        MessageKind::Document {
            file_id: "doc-1".into(),
            file_name: "list.txt".into(),
            mime_type: Some("text/plain".into()),
            caption: None,
        },
    );
    handle_message(&h.state, message).await;

    assert_eq!(h.transport.single_reply(), "Summary: shopping list.");

    let call = h.llm.last_call();
    assert!(call.attachment.is_none());
    let (role, prompt) = call.messages.last().unwrap();
    assert_eq!(role, "user");
    assert!(prompt.contains("list.txt"));
    assert!(prompt.contains("eggs\nmilk\nbread"));

    // The document body is never stored, only its placeholder
    assert_eq!(
        contents(&h.memory, "1").await,
        vec!["[Sent document: list.txt]", "Summary: shopping list."]
    );
}

#[tokio::test]
async fn test_document_caption_becomes_the_request() {
    let h = Harness::new(MockLLMClient::new("Three items.")).await;
    h.transport.add_file("doc-1", b"a,b,c");

    let message = inbound(
        "1",
        MessageKind::Document {
            file_id: "doc-1".into(),
            file_name: "items.csv".into(),
            mime_type: None,
            caption: Some("How many items?".into()),
        },
    );
    handle_message(&h.state, message).await;

    let prompt = h.llm.last_call().messages.last().unwrap().1.clone();
    assert!(prompt.contains("How many items?"));
    assert_eq!(
        contents(&h.memory, "1").await[0],
        "[Sent document: items.csv] — How many items?"
    );
}

#[tokio::test]
async fn test_unsupported_document_is_refused_before_download() {
    let h = Harness::new(MockLLMClient::new("unused")).await;

    let message = inbound(
        "1",
        MessageKind::Document {
            file_id: "doc-1".into(),
            file_name: "report.pdf".into(),
            mime_type: Some("application/pdf".into()),
            caption: None,
        },
    );
    handle_message(&h.state, message).await;

    assert_eq!(
        h.transport.single_reply(),
        AppError::MediaDecode(String::new()).user_message()
    );
    assert!(h.llm.calls().is_empty());
    assert_eq!(h.transport.typing_count(), 0);
}

#[tokio::test]
async fn test_binary_content_in_text_document_is_refused() {
    let h = Harness::new(MockLLMClient::new("unused")).await;
    h.transport.add_file("doc-1", &[0x00, 0xff, 0xfe, 0x80]);

    let message = inbound(
        "1",
        MessageKind::Document {
            file_id: "doc-1".into(),
            file_name: "notes.txt".into(),
            mime_type: Some("text/plain".into()),
            caption: None,
        },
    );
    handle_message(&h.state, message).await;

    assert_eq!(
        h.transport.single_reply(),
        AppError::MediaDecode(String::new()).user_message()
    );
    assert!(h.llm.calls().is_empty());
}

// ============= Dispatcher =============

fn update(value: serde_json::Value) -> TelegramUpdate {
    serde_json::from_value(value).expect("valid update JSON")
}

#[tokio::test]
async fn test_dispatcher_handles_updates_concurrently() {
    let h = Harness::with(
        MockLLMClient::new("pong").with_delay(Duration::from_millis(200)),
        MockTransport::new(),
        memory(15).await,
        AriaConfig::default(),
        AccessControl::open(),
    );
    let mut dispatcher = Dispatcher::new(h.state.clone());

    for (update_id, user) in [(10, 1), (11, 2), (12, 3)] {
        let accepted = dispatcher.dispatch(update(json!({
            "update_id": update_id,
            "message": {
                "message_id": update_id,
                "from": {"id": user, "is_bot": false, "first_name": "U"},
                "chat": {"id": user, "type": "private"},
                "date": 1700000000,
                "text": "ping"
            }
        })));
        assert!(accepted);
    }
    assert_eq!(dispatcher.in_flight(), 3);

    // Three 200ms calls finish well inside one grace period when run in parallel
    let started = std::time::Instant::now();
    dispatcher.drain(Duration::from_secs(5)).await;
    assert!(started.elapsed() < Duration::from_millis(550));

    assert_eq!(dispatcher.in_flight(), 0);
    let mut chats: Vec<_> = h.transport.sent().into_iter().map(|(c, _)| c).collect();
    chats.sort();
    assert_eq!(chats, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_dispatcher_skips_updates_without_messages() {
    let h = Harness::new(MockLLMClient::new("unused")).await;
    let mut dispatcher = Dispatcher::new(h.state.clone());

    assert!(!dispatcher.dispatch(update(json!({"update_id": 5}))));
    assert!(!dispatcher.dispatch(update(json!({
        "update_id": 6,
        "message": {
            "message_id": 1,
            "from": {"id": 1, "is_bot": false, "first_name": "U"},
            "chat": {"id": 1, "type": "private"},
            "date": 1700000000,
            "sticker": {"file_id": "s"}
        }
    }))));

    assert_eq!(dispatcher.in_flight(), 0);
    dispatcher.reap();
    assert!(h.transport.sent().is_empty());
}

#[tokio::test]
async fn test_drain_aborts_handlers_past_grace() {
    let h = Harness::with(
        MockLLMClient::new("slow").with_delay(Duration::from_secs(30)),
        MockTransport::new(),
        memory(15).await,
        AriaConfig::default(),
        AccessControl::open(),
    );
    let mut dispatcher = Dispatcher::new(h.state.clone());

    dispatcher.dispatch(update(json!({
        "update_id": 1,
        "message": {
            "message_id": 1,
            "from": {"id": 1, "is_bot": false},
            "chat": {"id": 1, "type": "private"},
            "date": 1700000000,
            "text": "hello"
        }
    })));

    dispatcher.drain(Duration::from_millis(100)).await;
    assert_eq!(dispatcher.in_flight(), 0);
    assert!(h.transport.sent().is_empty());
}

fn text_update(update_id: i64, user: i64, text: &str) -> TelegramUpdate {
    update(json!({
        "update_id": update_id,
        "message": {
            "message_id": update_id,
            "from": {"id": user, "is_bot": false, "first_name": "U"},
            "chat": {"id": user, "type": "private"},
            "date": 1700000000,
            "text": text
        }
    }))
}

#[tokio::test]
async fn test_reset_after_slow_turn_leaves_history_empty() {
    let h = Harness::with(
        MockLLMClient::new("noted").with_delay(Duration::from_millis(200)),
        MockTransport::new(),
        memory(15).await,
        AriaConfig::default(),
        AccessControl::open(),
    );
    let mut dispatcher = Dispatcher::new(h.state.clone());

    dispatcher.dispatch(text_update(1, 1, "remember my secret"));
    dispatcher.dispatch(text_update(2, 1, "/reset"));
    dispatcher.drain(Duration::from_secs(5)).await;

    assert!(contents(&h.memory, "1").await.is_empty());
    let replies: Vec<_> = h.transport.sent().into_iter().map(|(_, t)| t).collect();
    assert_eq!(replies, vec!["noted".to_string(), prompts::RESET_DONE.to_string()]);
}

#[tokio::test]
async fn test_second_message_sees_first_turn() {
    let h = Harness::with(
        MockLLMClient::new("got it").with_delay(Duration::from_millis(100)),
        MockTransport::new(),
        memory(15).await,
        AriaConfig::default(),
        AccessControl::open(),
    );
    let mut dispatcher = Dispatcher::new(h.state.clone());

    dispatcher.dispatch(text_update(1, 1, "first"));
    dispatcher.dispatch(text_update(2, 1, "second"));
    dispatcher.drain(Duration::from_secs(5)).await;

    let calls = h.llm.calls();
    assert_eq!(calls.len(), 2);
    let context: Vec<_> = calls[1]
        .messages
        .iter()
        .map(|(role, content)| (role.as_str(), content.as_str()))
        .collect();
    assert_eq!(
        context[1..],
        [("user", "first"), ("assistant", "got it"), ("user", "second")]
    );
    assert_eq!(
        contents(&h.memory, "1").await,
        vec!["first", "got it", "second", "got it"]
    );
}

#[tokio::test]
async fn test_ordering_is_per_user_only() {
    let h = Harness::with(
        MockLLMClient::new("pong").with_delay(Duration::from_millis(200)),
        MockTransport::new(),
        memory(15).await,
        AriaConfig::default(),
        AccessControl::open(),
    );
    let mut dispatcher = Dispatcher::new(h.state.clone());

    dispatcher.dispatch(text_update(1, 1, "one"));
    dispatcher.dispatch(text_update(2, 1, "two"));
    dispatcher.dispatch(text_update(3, 2, "other"));

    // User 2 finishes alongside user 1's first message
    tokio::time::sleep(Duration::from_millis(300)).await;
    let mut chats: Vec<_> = h.transport.sent().into_iter().map(|(c, _)| c).collect();
    chats.sort();
    assert_eq!(chats, vec![1, 2]);

    dispatcher.drain(Duration::from_secs(5)).await;
    assert_eq!(h.transport.sent().len(), 3);
    assert_eq!(contents(&h.memory, "1").await[0], "one");
}
