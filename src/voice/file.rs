use anyhow::{bail, Context, Result};
use hound::WavReader;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use super::backend::{AudioFrame, AudioInput, AudioInputConfig};

/// Replays a WAV file as if it were a live input
///
/// Without pacing the whole file is queued at once and `stop()` waits for it
/// to drain, so a start/stop cycle always yields the complete recording. With
/// pacing, frames arrive in real time and `stop()` cuts the replay short.
pub struct WavFileInput {
    path: PathBuf,
    config: AudioInputConfig,
    realtime: bool,
    pump: Option<JoinHandle<()>>,
}

impl WavFileInput {
    pub fn new(path: impl Into<PathBuf>, config: AudioInputConfig) -> Self {
        Self {
            path: path.into(),
            config,
            realtime: false,
            pump: None,
        }
    }

    /// Deliver frames at their natural rate instead of all at once
    pub fn realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    fn read_frames(&self) -> Result<Vec<AudioFrame>> {
        let reader = WavReader::open(&self.path)
            .with_context(|| format!("Failed to open WAV file: {:?}", self.path))?;

        let spec = reader.spec();
        if spec.bits_per_sample != 16 || spec.sample_format != hound::SampleFormat::Int {
            bail!(
                "Unsupported WAV format: {}-bit {:?} (expected 16-bit PCM)",
                spec.bits_per_sample,
                spec.sample_format
            );
        }

        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read audio samples")?;

        let frame_len = (spec.sample_rate as u64 * self.config.buffer_duration_ms / 1000).max(1)
            as usize
            * spec.channels.max(1) as usize;

        let frames = samples
            .chunks(frame_len)
            .enumerate()
            .map(|(i, chunk)| AudioFrame {
                samples: chunk.to_vec(),
                sample_rate: spec.sample_rate,
                channels: spec.channels,
                timestamp_ms: i as u64 * self.config.buffer_duration_ms,
            })
            .collect::<Vec<_>>();

        info!(
            "Loaded {:?}: {}Hz, {} channels, {} frames",
            self.path,
            spec.sample_rate,
            spec.channels,
            frames.len()
        );

        Ok(frames)
    }
}

#[async_trait::async_trait]
impl AudioInput for WavFileInput {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.pump.is_some() {
            bail!("WAV input already capturing");
        }

        let frames = self.read_frames()?;
        let (tx, rx) = mpsc::channel(frames.len().max(1));
        let pace = self
            .realtime
            .then(|| Duration::from_millis(self.config.buffer_duration_ms));

        self.pump = Some(tokio::spawn(async move {
            for frame in frames {
                if tx.send(frame).await.is_err() {
                    break;
                }
                if let Some(pace) = pace {
                    tokio::time::sleep(pace).await;
                }
            }
        }));

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        let Some(pump) = self.pump.take() else {
            return Ok(());
        };

        if self.realtime {
            pump.abort();
        }
        match pump.await {
            Ok(()) => Ok(()),
            Err(e) if e.is_cancelled() => Ok(()),
            Err(e) => Err(anyhow::anyhow!("WAV replay task panicked: {}", e)),
        }
    }

    fn is_capturing(&self) -> bool {
        self.pump.is_some()
    }

    fn name(&self) -> &str {
        "wav-file"
    }
}
