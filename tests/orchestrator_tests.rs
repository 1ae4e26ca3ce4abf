// Integration tests for the chat orchestrator
//
// Each test drives the orchestrator against a scripted API and checks the
// exact render events it emits along with the cached session list.

mod common;

use anyhow::Result;
use common::{harness, ScriptedInput};
use issac_client::{
    AudioInputConfig, ChatOrchestrator, ClientError, CredentialStore, EventLog, MemoryStore,
    Message, RecordingState, RenderEvent, Session, WavFileInput,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn session(id: &str, name: &str) -> Session {
    Session {
        id: Some(id.to_string()),
        name: name.to_string(),
    }
}

#[tokio::test]
async fn test_first_reply_reconciles_pending_session() {
    let mut h = harness();
    h.api.reply("Hi!", "s1");

    h.chat.create_session("Trip planning");
    h.chat.send_text("Hello").await;

    assert_eq!(
        h.log.take(),
        vec![
            RenderEvent::ClearTranscript,
            RenderEvent::SessionsChanged {
                sessions: vec![Session::pending("Trip planning")],
                active: None,
            },
            RenderEvent::AppendBubble(Message::user("Hello")),
            RenderEvent::LoadingStarted,
            RenderEvent::SessionsChanged {
                sessions: vec![session("s1", "Trip planning")],
                active: Some("s1".to_string()),
            },
            RenderEvent::LoadingStopped,
            RenderEvent::AppendBubble(Message::assistant("Hi!")),
        ]
    );

    assert_eq!(h.chat.current_session_id(), Some("s1"));
    assert_eq!(h.chat.sessions(), vec![session("s1", "Trip planning")]);
    assert_eq!(
        *h.api.chat_calls.lock().unwrap(),
        vec![("Hello".to_string(), None)]
    );
}

#[tokio::test]
async fn test_followup_turn_carries_session_id() {
    let mut h = harness();
    h.api.reply("Hi!", "s1");
    h.api.reply("Sure.", "s1");

    h.chat.create_session("Trip planning");
    h.chat.send_text("Hello").await;
    h.log.take();
    h.chat.send_text("Book a train").await;

    assert_eq!(
        h.api.chat_calls.lock().unwrap()[1],
        ("Book a train".to_string(), Some("s1".to_string()))
    );
    // No second reconcile, so no list refresh.
    assert!(!h
        .log
        .events()
        .iter()
        .any(|e| matches!(e, RenderEvent::SessionsChanged { .. })));
}

#[tokio::test]
async fn test_server_error_keeps_cache_and_session() {
    let mut h = harness();
    h.api
        .fail_chat(ClientError::from_status(500, "Internal Server Error"));

    h.chat.create_session("Trip planning");
    h.log.take();
    h.chat.send_text("Hello").await;

    assert_eq!(
        h.log.take(),
        vec![
            RenderEvent::AppendBubble(Message::user("Hello")),
            RenderEvent::LoadingStarted,
            RenderEvent::LoadingStopped,
            RenderEvent::AppendBubble(Message::assistant("⚠️ HTTP 500")),
        ]
    );
    assert_eq!(h.chat.current_session_id(), None);
    assert_eq!(h.chat.sessions(), vec![Session::pending("Trip planning")]);
}

#[tokio::test]
async fn test_blank_message_is_ignored() {
    let mut h = harness();

    h.chat.send_text("   \t ").await;

    assert!(h.log.events().is_empty());
    assert_eq!(h.api.chat_call_count(), 0);
}

#[tokio::test]
async fn test_message_is_trimmed_before_sending() {
    let mut h = harness();
    h.api.reply("Hi!", "s1");

    h.chat.send_text("  Hello \n").await;

    assert_eq!(h.log.events()[0], RenderEvent::AppendBubble(Message::user("Hello")));
    assert_eq!(h.api.chat_calls.lock().unwrap()[0].0, "Hello");
}

#[tokio::test]
async fn test_switch_session_renders_history() {
    let mut h = harness();
    h.api.history(Ok(vec![
        Message::user("What's the weather?"),
        Message::assistant("Sunny."),
    ]));

    h.chat.switch_session("s7").await;

    assert_eq!(
        h.log.take(),
        vec![
            RenderEvent::SessionsChanged {
                sessions: vec![],
                active: Some("s7".to_string()),
            },
            RenderEvent::ClearTranscript,
            RenderEvent::AppendBubble(Message::user("What's the weather?")),
            RenderEvent::AppendBubble(Message::assistant("Sunny.")),
        ]
    );
    assert_eq!(h.chat.current_session_id(), Some("s7"));
    assert_eq!(*h.api.history_calls.lock().unwrap(), vec!["s7".to_string()]);
}

#[tokio::test]
async fn test_failed_history_shows_one_warning() {
    let mut h = harness();
    h.api
        .history(Err(ClientError::Network("connection refused".to_string())));

    h.chat.switch_session("s7").await;

    let events = h.log.take();
    let clear = events
        .iter()
        .position(|e| *e == RenderEvent::ClearTranscript)
        .expect("transcript cleared");
    let after: Vec<_> = events[clear + 1..].to_vec();
    assert_eq!(
        after,
        vec![RenderEvent::AppendBubble(Message::assistant(
            "⚠️ Failed to load history"
        ))]
    );
    assert_eq!(h.chat.current_session_id(), Some("s7"));
}

#[tokio::test]
async fn test_switch_then_send_does_not_reconcile() {
    let mut h = harness();
    h.api.history(Ok(vec![]));
    h.api.reply("Hi!", "s7");

    h.chat.create_session("Trip planning");
    h.chat.switch_session("s7").await;
    h.chat.send_text("Hello").await;

    // The pending session keeps its null id: the prior id was not null.
    assert_eq!(h.chat.sessions(), vec![Session::pending("Trip planning")]);
    assert_eq!(
        h.api.chat_calls.lock().unwrap()[0].1.as_deref(),
        Some("s7")
    );
}

#[tokio::test]
async fn test_create_session_with_blank_name_is_ignored() {
    let mut h = harness();

    h.chat.create_session("   ");

    assert!(h.log.events().is_empty());
    assert!(h.chat.sessions().is_empty());
}

#[tokio::test]
async fn test_second_pending_session_replaces_first() {
    let mut h = harness();

    h.chat.create_session("Trip planning");
    h.chat.create_session("Recipes");

    assert_eq!(h.chat.sessions(), vec![Session::pending("Recipes")]);
}

#[tokio::test]
async fn test_init_greets_and_lists_sessions() {
    let mut h = harness();
    h.chat.create_session("Trip planning");
    h.log.take();

    h.chat.init().await;

    let events = h.log.take();
    assert_eq!(events.len(), 2);
    match &events[0] {
        RenderEvent::Greeting(text) => {
            assert!(text.starts_with("Good "));
            assert!(text.ends_with("alice"), "greeting was {:?}", text);
        }
        other => panic!("expected a greeting, got {:?}", other),
    }
    assert_eq!(
        events[1],
        RenderEvent::SessionsChanged {
            sessions: vec![Session::pending("Trip planning")],
            active: None,
        }
    );
}

#[tokio::test]
async fn test_voice_turn_renders_transcript_and_reply() {
    let mut h = harness();
    h.chat.set_voice_input(Box::new(ScriptedInput::speech())).unwrap();
    h.api.voice_reply("What time is it?", "Noon.", "s3");

    h.chat.send_voice().await;
    assert_eq!(h.chat.recording_state(), RecordingState::Recording);
    h.chat.send_voice().await;

    assert_eq!(
        h.log.take(),
        vec![
            RenderEvent::RecordingChanged(RecordingState::Recording),
            RenderEvent::RecordingChanged(RecordingState::Idle),
            RenderEvent::LoadingStarted,
            RenderEvent::LoadingStopped,
            RenderEvent::AppendBubble(Message::user("What time is it?")),
            RenderEvent::AppendBubble(Message::assistant("Noon.")),
        ]
    );
    assert_eq!(h.chat.current_session_id(), Some("s3"));

    let calls = h.api.voice_calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0.mime_type, "audio/wav");
    assert_eq!(calls[0].0.file_name, "voice.wav");
    assert_eq!(calls[0].1, None);
}

#[tokio::test]
async fn test_voice_turn_reconciles_pending_session() {
    let mut h = harness();
    h.chat.set_voice_input(Box::new(ScriptedInput::speech())).unwrap();
    h.api.voice_reply("Hello", "Hi!", "s1");

    h.chat.create_session("Trip planning");
    h.chat.send_voice().await;
    h.chat.send_voice().await;

    assert_eq!(h.chat.sessions(), vec![session("s1", "Trip planning")]);
}

#[tokio::test]
async fn test_voice_upload_failure_alerts_and_marks_bubble() {
    let mut h = harness();
    h.chat.set_voice_input(Box::new(ScriptedInput::speech())).unwrap();
    h.api
        .fail_voice(ClientError::from_status(400, r#"{"error":"No file"}"#));

    h.chat.send_voice().await;
    h.chat.send_voice().await;

    let events = h.log.take();
    assert_eq!(
        events[2..],
        [
            RenderEvent::LoadingStarted,
            RenderEvent::LoadingStopped,
            RenderEvent::Alert("Voice recording failed: No file".to_string()),
            RenderEvent::AppendBubble(Message::assistant("⚠️ No file")),
        ]
    );
    assert_eq!(h.chat.recording_state(), RecordingState::Idle);
    assert_eq!(h.chat.current_session_id(), None);
}

#[tokio::test]
async fn test_microphone_denied_leaves_recorder_idle() {
    let mut h = harness();
    h.chat
        .set_voice_input(Box::new(ScriptedInput::denied("Permission denied")))
        .unwrap();

    h.chat.send_voice().await;

    assert_eq!(
        h.log.take(),
        vec![
            RenderEvent::RecordingChanged(RecordingState::Idle),
            RenderEvent::Alert("Voice recording failed: Permission denied".to_string()),
        ]
    );
    assert_eq!(h.chat.recording_state(), RecordingState::Idle);
    assert!(h.api.voice_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_voice_without_capture_is_unsupported() {
    let mut h = harness();

    h.chat.send_voice().await;

    assert_eq!(
        h.log.take(),
        vec![RenderEvent::Alert("Audio recording not supported.".to_string())]
    );
}

#[tokio::test]
async fn test_missing_voice_file_alerts_once() {
    let mut h = harness();
    let input = WavFileInput::new("/nonexistent/question.wav", AudioInputConfig::default());

    h.chat.send_recording(Box::new(input)).await;

    let events = h.log.take();
    let alerts: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, RenderEvent::Alert(_)))
        .collect();
    assert_eq!(alerts.len(), 1, "events were {:?}", events);
    match alerts[0] {
        RenderEvent::Alert(text) => assert!(text.starts_with("Voice recording failed: ")),
        _ => unreachable!(),
    }
    assert_eq!(h.chat.recording_state(), RecordingState::Idle);
    assert!(h.api.voice_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_recording_turn_sends_once() {
    let mut h = harness();
    let input = ScriptedInput::speech();
    let starts = input.starts.clone();
    h.api.voice_reply("Hello", "Hi!", "s1");

    h.chat.send_recording(Box::new(input)).await;

    assert_eq!(starts.load(Ordering::SeqCst), 1);
    assert_eq!(h.api.voice_calls.lock().unwrap().len(), 1);
    assert_eq!(h.chat.current_session_id(), Some("s1"));
    assert_eq!(h.chat.recording_state(), RecordingState::Idle);
}

#[tokio::test]
async fn test_recording_turn_leaves_no_voice_input_behind() {
    let mut h = harness();
    h.api.voice_reply("Hello", "Hi!", "s1");

    h.chat.send_recording(Box::new(ScriptedInput::speech())).await;
    h.log.take();
    h.chat.send_voice().await;

    assert_eq!(
        h.log.take(),
        vec![RenderEvent::Alert("Audio recording not supported.".to_string())]
    );
}

#[tokio::test]
async fn test_recording_turn_restores_microphone() {
    let mut h = harness();
    let mic = ScriptedInput::speech();
    let mic_starts = mic.starts.clone();
    h.chat.set_voice_input(Box::new(mic)).unwrap();
    h.api.voice_reply("From file", "Ok.", "s1");

    h.chat.send_recording(Box::new(ScriptedInput::speech())).await;
    h.chat.send_voice().await;

    assert_eq!(mic_starts.load(Ordering::SeqCst), 1);
    assert_eq!(h.chat.recording_state(), RecordingState::Recording);
}

#[tokio::test]
async fn test_recording_turn_refused_while_recording() {
    let mut h = harness();
    let mic = ScriptedInput::speech();
    let open = mic.open_streams.clone();
    h.chat.set_voice_input(Box::new(mic)).unwrap();
    h.api.voice_reply("Live", "Heard you.", "s1");

    h.chat.send_voice().await;
    h.log.take();
    let file = ScriptedInput::speech();
    let file_starts = file.starts.clone();
    h.chat.send_recording(Box::new(file)).await;

    assert_eq!(
        h.log.take(),
        vec![RenderEvent::Alert("Finish the current recording first.".to_string())]
    );
    assert_eq!(file_starts.load(Ordering::SeqCst), 0);
    assert_eq!(h.chat.recording_state(), RecordingState::Recording);
    assert_eq!(open.load(Ordering::SeqCst), 1);

    // The live recording is still intact and can be sent.
    h.chat.send_voice().await;
    assert_eq!(h.api.voice_calls.lock().unwrap().len(), 1);
    assert_eq!(open.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_logout_clears_credentials() -> Result<()> {
    let h = harness();
    let credentials = h.credentials.clone();
    let log = h.log.clone();

    h.chat.logout()?;

    assert!(!credentials.is_authenticated());
    assert_eq!(credentials.username(), None);
    assert_eq!(log.events(), vec![RenderEvent::LoggedOut]);
    Ok(())
}

#[tokio::test]
async fn test_sessions_survive_logout_for_same_user() -> Result<()> {
    let mut h = harness();
    h.chat.create_session("Trip planning");
    let store = h.store.clone();
    let api = h.api.clone();
    h.chat.logout()?;

    let credentials = CredentialStore::new(Arc::new(store));
    credentials.save("tok-alice-2", "alice")?;
    let chat = ChatOrchestrator::new(api, credentials, Box::new(EventLog::new()))?;

    assert_eq!(chat.sessions(), vec![Session::pending("Trip planning")]);
    Ok(())
}

#[test]
fn test_orchestrator_requires_credentials() {
    let api = common::FakeApi::new();
    let credentials = CredentialStore::new(Arc::new(MemoryStore::new()));

    let result = ChatOrchestrator::new(api, credentials, Box::new(EventLog::new()));

    assert!(matches!(result, Err(ClientError::Auth(_))));
}
