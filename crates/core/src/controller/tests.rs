use std::sync::{Arc, Mutex};
use std::time::Duration;

use streamchat_protocol::{Credential, DEFAULT_SYSTEM_PROMPT, ModelId};
use streamchat_test_backend::{PresetReply, ScriptedBackend};
use tokio::sync::watch;
use tokio::time::timeout;

use super::*;
use crate::error::FALLBACK_FAILURE_MESSAGE;
use crate::transcript::{Role, TranscriptEvent};

struct Harness {
    controller: ChatController,
    backend: ScriptedBackend,
    idle_rx: watch::Receiver<usize>,
}

impl Harness {
    fn new(backend: ScriptedBackend) -> Self {
        let (idle_tx, idle_rx) = watch::channel(0usize);
        let controller = ChatControllerBuilder::with_backend(backend.clone())
            .with_credential(Credential::new("sk-test"))
            .on_idle(move || {
                idle_tx.send_modify(|n| *n += 1);
            })
            .build();
        Self {
            controller,
            backend,
            idle_rx,
        }
    }

    fn send(&self, text: &str) {
        self.controller.set_user_text(text).unwrap();
        self.controller.send().unwrap();
    }

    async fn wait_idle(&mut self, exchanges: usize) -> SessionSnapshot {
        timeout(
            Duration::from_millis(500),
            self.idle_rx.wait_for(|n| *n >= exchanges),
        )
        .await
        .unwrap()
        .unwrap();
        self.controller.snapshot().await.unwrap()
    }
}

fn contents(snapshot: &SessionSnapshot) -> Vec<(Role, &str)> {
    snapshot
        .messages
        .iter()
        .map(|m| (m.role(), m.content()))
        .collect()
}

#[tokio::test]
async fn test_simple_exchange() {
    let mut backend = ScriptedBackend::default();
    backend.add_reply(PresetReply::with_text_chunks(["Hel", "lo ", "there"]));
    let mut harness = Harness::new(backend);

    harness.send("Hi");
    let snapshot = harness.wait_idle(1).await;

    assert_eq!(
        contents(&snapshot),
        [(Role::User, "Hi"), (Role::Assistant, "Hello there")]
    );
    assert!(snapshot.messages.iter().all(|m| !m.is_streaming()));
    assert_eq!(snapshot.phase, ChatPhase::Idle);
    assert_eq!(snapshot.last_error, None);
    assert_eq!(snapshot.last_notice.as_deref(), Some(SUCCESS_NOTICE));
    assert_eq!(snapshot.form.user_text, "");
    assert!(snapshot.can_clear());

    let payloads = harness.backend.payloads();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0].user_text, "Hi");
    assert_eq!(payloads[0].system_prompt, DEFAULT_SYSTEM_PROMPT);
    assert_eq!(payloads[0].model, ModelId::Gpt41Mini);
    assert_eq!(payloads[0].credential.expose(), "sk-test");
}

#[tokio::test]
async fn test_multi_byte_boundaries() {
    let text = "Grüße, 世界 👋";
    let bytes = text.as_bytes();
    let mut backend = ScriptedBackend::default();
    // Every chunk is a single byte, so each multi-byte character is split.
    backend.add_reply(PresetReply::with_byte_chunks(
        bytes.iter().map(|b| vec![*b]),
    ));
    let mut harness = Harness::new(backend);

    harness.send("Say hello");
    let snapshot = harness.wait_idle(1).await;

    assert_eq!(snapshot.messages[1].content(), text);
    assert!(!snapshot.messages[1].content().contains('\u{FFFD}'));
}

#[tokio::test]
async fn test_validation() {
    let harness = Harness::new(ScriptedBackend::default());

    harness.send("   ");
    let snapshot = harness.controller.snapshot().await.unwrap();
    assert!(snapshot.messages.is_empty());
    assert_eq!(
        snapshot.last_error.as_deref(),
        Some("Please enter a message and API key")
    );
    assert_eq!(snapshot.form.user_text, "   ");

    harness.controller.set_credential(Credential::new(" ")).unwrap();
    harness.send("Hi");
    let snapshot = harness.controller.snapshot().await.unwrap();
    assert!(snapshot.messages.is_empty());
    assert!(snapshot.last_error.is_some());
    assert!(!snapshot.can_send());
    assert_eq!(snapshot.phase, ChatPhase::Idle);

    assert_eq!(harness.backend.request_count(), 0);
}

#[tokio::test]
async fn test_rejection_rolls_back() {
    let mut backend = ScriptedBackend::default();
    backend.add_reply(PresetReply::with_text_chunks(["Sure."]));
    backend.add_reply(PresetReply::rejected(401, "Invalid API key"));
    backend.add_reply(PresetReply::rejected(500, ""));
    let mut harness = Harness::new(backend);

    harness.send("First");
    harness.wait_idle(1).await;

    harness.send("Second");
    let snapshot = harness.wait_idle(2).await;
    assert_eq!(
        contents(&snapshot),
        [(Role::User, "First"), (Role::Assistant, "Sure.")]
    );
    assert_eq!(snapshot.last_error.as_deref(), Some("Invalid API key"));
    assert_eq!(snapshot.last_notice, None);
    // The input is not restored.
    assert_eq!(snapshot.form.user_text, "");

    harness.send("Third");
    let snapshot = harness.wait_idle(3).await;
    assert_eq!(snapshot.messages.len(), 2);
    assert_eq!(snapshot.last_error.as_deref(), Some("Request failed"));
}

#[tokio::test]
async fn test_missing_body_rolls_back() {
    let mut backend = ScriptedBackend::default();
    backend.add_reply(PresetReply::missing_body());
    let mut harness = Harness::new(backend);

    harness.send("Hi");
    let snapshot = harness.wait_idle(1).await;
    assert!(snapshot.messages.is_empty());
    assert!(snapshot.last_error.is_some());
}

#[tokio::test]
async fn test_stream_failure_keeps_partial_reply() {
    let mut backend = ScriptedBackend::default();
    backend.add_reply(
        PresetReply::with_text_chunks(["Once ", "upon ", "a time"])
            .with_failure_after(2),
    );
    let mut harness = Harness::new(backend);

    harness.send("Tell me a story");
    let snapshot = harness.wait_idle(1).await;
    assert_eq!(
        contents(&snapshot),
        [(Role::User, "Tell me a story"), (Role::Assistant, "Once upon ")]
    );
    assert!(!snapshot.messages[1].is_streaming());
    assert_eq!(snapshot.phase, ChatPhase::Idle);
    assert_eq!(snapshot.last_notice, None);
    let error = snapshot.last_error.unwrap();
    assert!(!error.is_empty());
    assert_ne!(error, FALLBACK_FAILURE_MESSAGE);
}

#[tokio::test]
async fn test_single_exchange_in_flight() {
    let mut backend = ScriptedBackend::default();
    backend.set_delay(Duration::from_millis(20));
    backend.add_reply(PresetReply::with_text_chunks(["a", "b", "c"]));
    backend.add_reply(PresetReply::with_text_chunks(["unexpected"]));
    let mut harness = Harness::new(backend);

    harness.send("One");
    harness.send("Two");
    let snapshot = harness.controller.snapshot().await.unwrap();
    assert!(snapshot.is_sending());
    assert!(!snapshot.can_send());
    assert!(!snapshot.can_clear());
    // The rejected send leaves the input alone.
    assert_eq!(snapshot.form.user_text, "Two");

    let snapshot = harness.wait_idle(1).await;
    assert_eq!(
        contents(&snapshot),
        [(Role::User, "One"), (Role::Assistant, "abc")]
    );
    assert_eq!(harness.backend.request_count(), 1);
}

#[tokio::test]
async fn test_clear_chat() {
    let mut backend = ScriptedBackend::default();
    backend.add_reply(PresetReply::rejected(401, "Invalid API key"));
    let mut harness = Harness::new(backend);

    harness.controller.clear_chat().unwrap();
    let snapshot = harness.controller.snapshot().await.unwrap();
    assert!(snapshot.messages.is_empty());
    assert_eq!(snapshot.last_error, None);

    harness.send("Hi");
    let snapshot = harness.wait_idle(1).await;
    assert!(snapshot.last_error.is_some());

    harness.controller.clear_chat().unwrap();
    harness.controller.clear_chat().unwrap();
    let snapshot = harness.controller.snapshot().await.unwrap();
    assert!(snapshot.messages.is_empty());
    assert_eq!(snapshot.last_error, None);
    assert_eq!(snapshot.last_notice, None);
    assert!(!snapshot.can_clear());
}

#[tokio::test]
async fn test_form_state() {
    let harness = Harness::new(ScriptedBackend::default());

    harness.controller.set_system_prompt("Be brief.").unwrap();
    harness.controller.set_model(ModelId::Gpt4).unwrap();
    harness.controller.set_user_text("Draft").unwrap();
    let snapshot = harness.controller.snapshot().await.unwrap();
    assert_eq!(snapshot.form.system_prompt, "Be brief.");
    assert_eq!(snapshot.form.model, ModelId::Gpt4);
    assert_eq!(snapshot.form.user_text, "Draft");
    assert!(snapshot.can_send());
    assert!(!snapshot.can_clear());
}

#[tokio::test]
async fn test_transcript_observer() {
    let mut backend = ScriptedBackend::default();
    backend.add_reply(PresetReply::with_text_chunks(["Hi", "!"]));
    let events = Arc::new(Mutex::new(vec![]));

    let (idle_tx, mut idle_rx) = watch::channel(false);
    let controller = ChatControllerBuilder::with_backend(backend)
        .with_credential(Credential::new("sk-test"))
        .on_transcript_change({
            let events = Arc::clone(&events);
            move |event, transcript| {
                events
                    .lock()
                    .unwrap()
                    .push((*event, transcript.len()));
            }
        })
        .on_idle(move || {
            idle_tx.send(true).unwrap();
        })
        .build();
    controller.set_user_text("Hello").unwrap();
    controller.send().unwrap();

    timeout(Duration::from_millis(500), idle_rx.wait_for(|v| *v))
        .await
        .unwrap()
        .unwrap();

    let snapshot = controller.snapshot().await.unwrap();
    let user = snapshot.messages[0].id();
    let assistant = snapshot.messages[1].id();
    assert_eq!(
        *events.lock().unwrap(),
        [
            (TranscriptEvent::Appended(user), 1),
            (TranscriptEvent::Appended(assistant), 2),
            (TranscriptEvent::Updated(assistant), 2),
            (TranscriptEvent::Updated(assistant), 2),
            (TranscriptEvent::Finalized(assistant), 2),
        ]
    );
}

#[tokio::test]
async fn test_clear_while_sending() {
    let mut backend = ScriptedBackend::default();
    backend.add_reply(PresetReply::with_text_chunks(["a", "b", "c"]));
    let mut harness = Harness::new(backend);

    // Both intents are handled before the exchange task gets to run.
    harness.send("Hi");
    harness.controller.clear_chat().unwrap();
    let snapshot = harness.controller.snapshot().await.unwrap();
    assert_eq!(snapshot.phase, ChatPhase::Sending);
    assert!(snapshot.messages.is_empty());
    assert_eq!(snapshot.last_error, None);
    assert_eq!(snapshot.last_notice, None);

    // The reply still streams into a fresh assistant record.
    let snapshot = harness.wait_idle(1).await;
    assert_eq!(contents(&snapshot), [(Role::Assistant, "abc")]);
    assert!(!snapshot.messages[0].is_streaming());
    assert_eq!(snapshot.last_notice.as_deref(), Some(SUCCESS_NOTICE));
}

#[tokio::test]
async fn test_clear_while_streaming() {
    let mut backend = ScriptedBackend::default();
    backend.set_delay(Duration::from_millis(30));
    backend.add_reply(PresetReply::with_text_chunks(["a", "b", "c"]));
    let mut harness = Harness::new(backend);

    harness.send("Hi");
    timeout(Duration::from_millis(500), async {
        loop {
            let snapshot = harness.controller.snapshot().await.unwrap();
            if snapshot.phase == ChatPhase::Streaming {
                break;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .unwrap();

    harness.controller.clear_chat().unwrap();
    let snapshot = harness.controller.snapshot().await.unwrap();
    assert_eq!(snapshot.phase, ChatPhase::Streaming);
    assert!(snapshot.messages.is_empty());

    // Fragments of the removed record are dropped.
    let snapshot = harness.wait_idle(1).await;
    assert!(snapshot.messages.is_empty());
    assert_eq!(snapshot.phase, ChatPhase::Idle);
    assert_eq!(snapshot.last_error, None);
    assert_eq!(snapshot.last_notice.as_deref(), Some(SUCCESS_NOTICE));
    assert_eq!(harness.backend.request_count(), 1);
}
