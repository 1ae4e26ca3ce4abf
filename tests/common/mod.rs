// Shared fakes for the integration tests
#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use issac_client::api::{ChatResponse, VoiceResponse};
use issac_client::{
    AssistantApi, AudioArtifact, AudioFrame, AudioInput, ChatOrchestrator, ClientError,
    CredentialStore, EventLog, MemoryStore, Message,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Audio input that replays fixed frames and tracks how many streams are open
pub struct ScriptedInput {
    frames: Vec<AudioFrame>,
    open_error: Option<String>,
    sender: Option<mpsc::Sender<AudioFrame>>,
    pub open_streams: Arc<AtomicUsize>,
    pub max_open_streams: Arc<AtomicUsize>,
    pub starts: Arc<AtomicUsize>,
}

impl ScriptedInput {
    pub fn with_frames(frames: Vec<AudioFrame>) -> Self {
        Self {
            frames,
            open_error: None,
            sender: None,
            open_streams: Arc::new(AtomicUsize::new(0)),
            max_open_streams: Arc::new(AtomicUsize::new(0)),
            starts: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// 200ms of 16kHz mono audio in two frames
    pub fn speech() -> Self {
        Self::with_frames(vec![frame(1600, 0), frame(1600, 100)])
    }

    pub fn denied(reason: &str) -> Self {
        let mut input = Self::with_frames(Vec::new());
        input.open_error = Some(reason.to_string());
        input
    }
}

pub fn frame(samples: usize, timestamp_ms: u64) -> AudioFrame {
    AudioFrame {
        samples: vec![100; samples],
        sample_rate: 16000,
        channels: 1,
        timestamp_ms,
    }
}

#[async_trait]
impl AudioInput for ScriptedInput {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = &self.open_error {
            anyhow::bail!("{}", reason);
        }

        let (tx, rx) = mpsc::channel(self.frames.len().max(1));
        for frame in &self.frames {
            tx.send(frame.clone()).await?;
        }

        let open = self.open_streams.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_open_streams.fetch_max(open, Ordering::SeqCst);
        self.sender = Some(tx);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if self.sender.take().is_some() {
            self.open_streams.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.sender.is_some()
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Assistant API that answers from per-endpoint queues and records every call
#[derive(Default)]
pub struct FakeApi {
    chat_replies: Mutex<VecDeque<Result<ChatResponse, ClientError>>>,
    voice_replies: Mutex<VecDeque<Result<VoiceResponse, ClientError>>>,
    history_replies: Mutex<VecDeque<Result<Vec<Message>, ClientError>>>,
    pub chat_calls: Mutex<Vec<(String, Option<String>)>>,
    pub voice_calls: Mutex<Vec<(AudioArtifact, Option<String>)>>,
    pub history_calls: Mutex<Vec<String>>,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, reply: &str, session_id: &str) {
        self.chat_replies.lock().unwrap().push_back(Ok(ChatResponse {
            reply: reply.to_string(),
            session_id: session_id.to_string(),
        }));
    }

    pub fn fail_chat(&self, err: ClientError) {
        self.chat_replies.lock().unwrap().push_back(Err(err));
    }

    pub fn voice_reply(&self, transcript: &str, reply: &str, session_id: &str) {
        self.voice_replies.lock().unwrap().push_back(Ok(VoiceResponse {
            transcript: transcript.to_string(),
            reply: reply.to_string(),
            session_id: session_id.to_string(),
        }));
    }

    pub fn fail_voice(&self, err: ClientError) {
        self.voice_replies.lock().unwrap().push_back(Err(err));
    }

    pub fn history(&self, result: Result<Vec<Message>, ClientError>) {
        self.history_replies.lock().unwrap().push_back(result);
    }

    pub fn chat_call_count(&self) -> usize {
        self.chat_calls.lock().unwrap().len()
    }
}

fn unscripted<T>() -> Result<T, ClientError> {
    Err(ClientError::Network("no scripted reply".to_string()))
}

#[async_trait]
impl AssistantApi for FakeApi {
    async fn chat(
        &self,
        message: &str,
        session_id: Option<&str>,
    ) -> Result<ChatResponse, ClientError> {
        self.chat_calls
            .lock()
            .unwrap()
            .push((message.to_string(), session_id.map(str::to_string)));
        self.chat_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(unscripted)
    }

    async fn voice(
        &self,
        audio: &AudioArtifact,
        session_id: Option<&str>,
    ) -> Result<VoiceResponse, ClientError> {
        self.voice_calls
            .lock()
            .unwrap()
            .push((audio.clone(), session_id.map(str::to_string)));
        self.voice_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(unscripted)
    }

    async fn history(&self, session_id: &str) -> Result<Vec<Message>, ClientError> {
        self.history_calls
            .lock()
            .unwrap()
            .push(session_id.to_string());
        self.history_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(unscripted)
    }

    async fn search(&self, query: &str) -> Result<Vec<String>, ClientError> {
        Ok(vec![format!("snippet for {}", query)])
    }
}

pub struct Harness {
    pub api: Arc<FakeApi>,
    pub store: MemoryStore,
    pub credentials: CredentialStore,
    pub log: EventLog,
    pub chat: ChatOrchestrator,
}

/// Orchestrator for `alice` over a fake API, in-memory storage and an event log
pub fn harness() -> Harness {
    let api = FakeApi::new();
    let store = MemoryStore::new();
    let credentials = CredentialStore::new(Arc::new(store.clone()));
    credentials.save("tok-alice", "alice").unwrap();

    let log = EventLog::new();
    let chat = ChatOrchestrator::new(api.clone(), credentials.clone(), Box::new(log.clone()))
        .unwrap();

    Harness {
        api,
        store,
        credentials,
        log,
        chat,
    }
}
