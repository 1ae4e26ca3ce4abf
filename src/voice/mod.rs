//! Voice capture
//!
//! This module provides:
//! - `AudioInput`, the stream abstraction (WAV replay, cpal microphone)
//! - `VoiceCapture`, the Idle/Recording/Processing state machine that owns
//!   one stream at a time and turns a recording into one `AudioArtifact`

pub mod artifact;
pub mod backend;
pub mod capture;
pub mod file;

#[cfg(feature = "microphone")]
pub mod microphone;

pub use artifact::AudioArtifact;
pub use backend::{AudioFrame, AudioInput, AudioInputConfig, AudioInputFactory, AudioSource};
pub use capture::{CaptureAction, CaptureInput, RecordingState, ToggleOutcome, VoiceCapture};
pub use file::WavFileInput;

#[cfg(feature = "microphone")]
pub use microphone::MicrophoneInput;
