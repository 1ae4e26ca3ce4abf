use anyhow::Result;
use std::path::PathBuf;
use tokio::sync::mpsc;

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Configuration for an audio input
#[derive(Debug, Clone)]
pub struct AudioInputConfig {
    /// Sample rate requested from the device; the device default is used when
    /// it cannot provide it (file inputs keep their own rate)
    pub sample_rate: u32,
    /// Channel count requested from the device; captured audio is downmixed
    /// to mono either way
    pub channels: u16,
    /// Frame size in milliseconds
    pub buffer_duration_ms: u64,
}

impl Default for AudioInputConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,      // 16kHz for Whisper
            channels: 1,             // Mono
            buffer_duration_ms: 100, // 100ms frames
        }
    }
}

impl From<&crate::config::AudioConfig> for AudioInputConfig {
    fn from(cfg: &crate::config::AudioConfig) -> Self {
        Self {
            sample_rate: cfg.sample_rate,
            channels: cfg.channels,
            buffer_duration_ms: cfg.buffer_duration_ms,
        }
    }
}

/// Audio capture input trait
///
/// Implementations:
/// - Microphone: cpal input device (behind the `microphone` feature)
/// - File: WAV file replay (testing, pre-recorded questions)
///
/// The frame channel closes once `stop()` has released the underlying
/// stream, which is how the consumer learns that recording has finished.
#[async_trait::async_trait]
pub trait AudioInput: Send + Sync {
    /// Open the stream and start delivering frames
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Release the stream; the frame channel closes after the last frame
    async fn stop(&mut self) -> Result<()>;

    /// Check if the input currently holds an open stream
    fn is_capturing(&self) -> bool;

    /// Input name for logging
    fn name(&self) -> &str;
}

/// Audio input factory
pub struct AudioInputFactory;

impl AudioInputFactory {
    /// Create an audio input for the given source
    pub fn create(source: AudioSource, config: AudioInputConfig) -> Result<Box<dyn AudioInput>> {
        match source {
            AudioSource::Microphone { device } => {
                #[cfg(feature = "microphone")]
                {
                    use super::microphone::MicrophoneInput;
                    Ok(Box::new(MicrophoneInput::new(device, config)))
                }

                #[cfg(not(feature = "microphone"))]
                {
                    let _ = (device, config);
                    anyhow::bail!(
                        "Audio recording not supported in this build (enable the `microphone` feature)"
                    )
                }
            }

            AudioSource::File(path) => {
                use super::file::WavFileInput;
                Ok(Box::new(WavFileInput::new(path, config)))
            }
        }
    }
}

/// Audio source type
#[derive(Debug, Clone)]
pub enum AudioSource {
    /// Input device, by name or the platform default
    Microphone { device: Option<String> },
    /// WAV file input
    File(PathBuf),
}
