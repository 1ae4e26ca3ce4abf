use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::artifact::AudioArtifact;
use super::backend::{AudioFrame, AudioInput};
use crate::error::ClientError;

/// Where the recording control currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    Idle,
    Recording,
    Processing,
}

/// Inputs that drive [`RecordingState`] transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureInput {
    /// The single record/stop control was pressed
    Toggle,
    /// Explicit stop request
    Stop,
    /// The platform refused to open a stream
    OpenFailed,
    /// The stopped stream has been turned into an artifact (or failed to)
    Finalized,
}

/// Work the driver has to do after a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureAction {
    OpenStream,
    FinalizeStream,
    Nothing,
}

impl RecordingState {
    /// Pure transition table
    ///
    /// A toggle while recording is the stop gesture; a stop outside
    /// `Recording` and a toggle while `Processing` change nothing.
    pub fn transition(self, input: CaptureInput) -> (RecordingState, CaptureAction) {
        match (self, input) {
            (RecordingState::Idle, CaptureInput::Toggle) => {
                (RecordingState::Recording, CaptureAction::OpenStream)
            }
            (RecordingState::Recording, CaptureInput::Toggle)
            | (RecordingState::Recording, CaptureInput::Stop) => {
                (RecordingState::Processing, CaptureAction::FinalizeStream)
            }
            (RecordingState::Recording, CaptureInput::OpenFailed) => {
                (RecordingState::Idle, CaptureAction::Nothing)
            }
            (RecordingState::Processing, CaptureInput::Finalized) => {
                (RecordingState::Idle, CaptureAction::Nothing)
            }
            (state, _) => (state, CaptureAction::Nothing),
        }
    }
}

/// Result of pressing the record control
#[derive(Debug)]
pub enum ToggleOutcome {
    /// A stream was opened and recording began
    Started,
    /// Recording stopped and produced an artifact
    Finished(AudioArtifact),
    /// A previous recording is still being finalized
    Busy,
}

/// Recording lifecycle around a single [`AudioInput`]
///
/// Owns at most one open stream and one frame buffer. Frames are collected on
/// a background task while recording; stopping releases the stream, waits for
/// the frame channel to close and encodes everything into one artifact.
pub struct VoiceCapture {
    input: Box<dyn AudioInput>,
    state: RecordingState,
    collector: Option<JoinHandle<Vec<AudioFrame>>>,
}

impl VoiceCapture {
    pub fn new(input: Box<dyn AudioInput>) -> Self {
        Self {
            input,
            state: RecordingState::Idle,
            collector: None,
        }
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    pub fn input_name(&self) -> &str {
        self.input.name()
    }

    /// Swap the audio input; refused while a recording is in progress
    pub fn replace_input(&mut self, input: Box<dyn AudioInput>) -> Result<(), ClientError> {
        if self.state != RecordingState::Idle {
            return Err(ClientError::Capture(
                "cannot change audio input while recording".to_string(),
            ));
        }
        self.input = input;
        Ok(())
    }

    /// Press the record control: starts when idle, stops when recording
    pub async fn start(&mut self) -> Result<ToggleOutcome, ClientError> {
        match self.apply(CaptureInput::Toggle) {
            CaptureAction::OpenStream => {
                self.open().await?;
                Ok(ToggleOutcome::Started)
            }
            CaptureAction::FinalizeStream => self.finalize().await.map(ToggleOutcome::Finished),
            CaptureAction::Nothing => Ok(ToggleOutcome::Busy),
        }
    }

    /// Stop recording and return the artifact; `None` when nothing was recording
    pub async fn stop(&mut self) -> Result<Option<AudioArtifact>, ClientError> {
        match self.apply(CaptureInput::Stop) {
            CaptureAction::FinalizeStream => self.finalize().await.map(Some),
            _ => Ok(None),
        }
    }

    fn apply(&mut self, input: CaptureInput) -> CaptureAction {
        let (next, action) = self.state.transition(input);
        if next != self.state {
            info!("Voice capture {:?} -> {:?}", self.state, next);
        }
        self.state = next;
        action
    }

    async fn open(&mut self) -> Result<(), ClientError> {
        let mut frames_rx = match self.input.start().await {
            Ok(rx) => rx,
            Err(e) => {
                error!("Failed to open {} stream: {:#}", self.input.name(), e);
                if let Err(e) = self.input.stop().await {
                    warn!("Failed to release {} after open error: {:#}", self.input.name(), e);
                }
                self.apply(CaptureInput::OpenFailed);
                return Err(ClientError::Capture(format!("{:#}", e)));
            }
        };

        self.collector = Some(tokio::spawn(async move {
            let mut frames = Vec::new();
            while let Some(frame) = frames_rx.recv().await {
                frames.push(frame);
            }
            frames
        }));

        info!("Recording from {}", self.input.name());
        Ok(())
    }

    async fn finalize(&mut self) -> Result<AudioArtifact, ClientError> {
        let released = self.input.stop().await;
        let collector = self.collector.take();

        let result = match (released, collector) {
            (Err(e), collector) => {
                if let Some(collector) = collector {
                    collector.abort();
                }
                Err(ClientError::Capture(format!(
                    "Failed to stop {}: {:#}",
                    self.input.name(),
                    e
                )))
            }
            (Ok(()), Some(collector)) => match collector.await {
                Ok(frames) => AudioArtifact::from_frames(&frames)
                    .map_err(|e| ClientError::Capture(format!("{:#}", e))),
                Err(e) => Err(ClientError::Capture(format!(
                    "Frame collector failed: {}",
                    e
                ))),
            },
            (Ok(()), None) => Err(ClientError::Capture("no active recording".to_string())),
        };

        self.apply(CaptureInput::Finalized);

        match &result {
            Ok(artifact) => info!(
                "Recording finished: {} bytes, {}ms",
                artifact.bytes.len(),
                artifact.duration_ms
            ),
            Err(e) => warn!("Recording failed: {}", e),
        }
        result
    }
}

impl Drop for VoiceCapture {
    fn drop(&mut self) {
        if let Some(collector) = self.collector.take() {
            collector.abort();
        }
    }
}
