// Microphone input using cpal

use anyhow::{anyhow, bail, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use std::sync::mpsc as std_mpsc;
use std::thread::JoinHandle;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use super::backend::{AudioFrame, AudioInput, AudioInputConfig};

/// Captures the default (or a named) input device
///
/// cpal streams are not `Send`, so each recording owns a dedicated thread
/// that opens the stream, parks until stopped, then drops it. Dropping the
/// stream drops the data callback and with it the frame sender.
pub struct MicrophoneInput {
    device: Option<String>,
    config: AudioInputConfig,
    label: String,
    worker: Option<(std_mpsc::Sender<()>, JoinHandle<()>)>,
}

impl MicrophoneInput {
    pub fn new(device: Option<String>, config: AudioInputConfig) -> Self {
        Self {
            label: device.clone().unwrap_or_else(|| "default microphone".to_string()),
            device,
            config,
            worker: None,
        }
    }

    /// Input device names, for the CLI device selector
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();
        let devices = host.input_devices().context("no input devices available")?;
        Ok(devices.filter_map(|d| d.name().ok()).collect())
    }
}

#[async_trait::async_trait]
impl AudioInput for MicrophoneInput {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.worker.is_some() {
            bail!("microphone already capturing");
        }

        let (frame_tx, frame_rx) = mpsc::channel(256);
        let (ready_tx, ready_rx) = oneshot::channel::<Result<String>>();
        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();
        let device = self.device.clone();
        let requested = self.config.clone();

        let handle = std::thread::Builder::new()
            .name("issac-microphone".to_string())
            .spawn(move || {
                let (stream, name) = match open_stream(device.as_deref(), &requested, frame_tx) {
                    Ok(opened) => opened,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(name));

                // Park until stop() signals or the input is dropped
                let _ = stop_rx.recv();

                if let Err(e) = stream.pause() {
                    warn!("Failed to pause microphone stream: {}", e);
                }
                drop(stream);
            })
            .context("Failed to spawn microphone thread")?;

        match ready_rx.await {
            Ok(Ok(name)) => {
                info!("Microphone stream open on {}", name);
                self.label = name;
                self.worker = Some((stop_tx, handle));
                Ok(frame_rx)
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => Err(anyhow!("microphone thread exited before opening a stream")),
        }
    }

    async fn stop(&mut self) -> Result<()> {
        let Some((stop_tx, handle)) = self.worker.take() else {
            return Ok(());
        };

        let _ = stop_tx.send(());
        tokio::task::spawn_blocking(move || handle.join())
            .await
            .context("Failed to join microphone thread")?
            .map_err(|_| anyhow!("microphone thread panicked"))?;

        info!("Microphone stream released");
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.worker.is_some()
    }

    fn name(&self) -> &str {
        &self.label
    }
}

impl Drop for MicrophoneInput {
    fn drop(&mut self) {
        if let Some((stop_tx, _)) = self.worker.take() {
            let _ = stop_tx.send(());
        }
    }
}

fn open_stream(
    device_name: Option<&str>,
    requested: &AudioInputConfig,
    sender: mpsc::Sender<AudioFrame>,
) -> Result<(cpal::Stream, String)> {
    let host = cpal::default_host();
    let device = match device_name {
        Some(name) => host
            .input_devices()
            .context("no input devices available")?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| anyhow!("input device '{}' not found", name))?,
        None => host
            .default_input_device()
            .context("no default input device available")?,
    };
    let name = device
        .name()
        .unwrap_or_else(|_| "unknown input device".to_string());

    let supported = pick_config(&device, &name, requested)?;
    let format = supported.sample_format();
    let stream_config: StreamConfig = supported.into();
    let channels = usize::from(stream_config.channels.max(1));
    info!(
        "Capturing {}Hz, {} channels ({:?}) from {}",
        stream_config.sample_rate.0, stream_config.channels, format, name
    );
    let pump = FramePump::new(stream_config.sample_rate.0, requested.buffer_duration_ms, sender);

    let err_fn = |err: cpal::StreamError| warn!("Microphone stream error: {}", err);

    let stream = match format {
        SampleFormat::F32 => {
            let mut pump = pump;
            device.build_input_stream(
                &stream_config,
                move |data: &[f32], _| {
                    pump.push(data, channels, |s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                },
                err_fn,
                None,
            )?
        }
        SampleFormat::I16 => {
            let mut pump = pump;
            device.build_input_stream(
                &stream_config,
                move |data: &[i16], _| pump.push(data, channels, |s| s),
                err_fn,
                None,
            )?
        }
        SampleFormat::U16 => {
            let mut pump = pump;
            device.build_input_stream(
                &stream_config,
                move |data: &[u16], _| pump.push(data, channels, |s| (s as i32 - 32_768) as i16),
                err_fn,
                None,
            )?
        }
        other => bail!("unsupported sample format: {:?}", other),
    };

    stream
        .play()
        .with_context(|| format!("Failed to start capture on '{}'", name))?;

    Ok((stream, name))
}

/// The requested rate and channel count when the device offers them in a
/// sample format the pump converts, else the device default
fn pick_config(
    device: &cpal::Device,
    name: &str,
    requested: &AudioInputConfig,
) -> Result<cpal::SupportedStreamConfig> {
    let ranges: Vec<cpal::SupportedStreamConfigRange> = match device.supported_input_configs() {
        Ok(ranges) => ranges.collect(),
        Err(e) => {
            warn!("Failed to list input configurations for {}: {}", name, e);
            Vec::new()
        }
    };

    let matching = ranges.into_iter().find(|range| {
        convertible(range.sample_format())
            && supports(
                range.channels(),
                range.min_sample_rate().0,
                range.max_sample_rate().0,
                requested,
            )
    });

    match matching {
        Some(range) => Ok(range.with_sample_rate(cpal::SampleRate(requested.sample_rate))),
        None => {
            info!(
                "{} cannot capture {}Hz x{}; using its default configuration",
                name, requested.sample_rate, requested.channels
            );
            device
                .default_input_config()
                .with_context(|| format!("'{}' has no usable input configuration", name))
        }
    }
}

fn convertible(format: SampleFormat) -> bool {
    matches!(format, SampleFormat::F32 | SampleFormat::I16 | SampleFormat::U16)
}

fn supports(channels: u16, min_rate: u32, max_rate: u32, requested: &AudioInputConfig) -> bool {
    channels == requested.channels && (min_rate..=max_rate).contains(&requested.sample_rate)
}

/// Downmixes callback buffers to mono and cuts them into fixed-size frames
struct FramePump {
    sample_rate: u32,
    frame_samples: usize,
    frame_ms: u64,
    pending: Vec<i16>,
    emitted: u64,
    sender: mpsc::Sender<AudioFrame>,
}

impl FramePump {
    fn new(sample_rate: u32, frame_ms: u64, sender: mpsc::Sender<AudioFrame>) -> Self {
        let frame_samples = ((sample_rate as u64 * frame_ms) / 1000).max(1) as usize;
        Self {
            sample_rate,
            frame_samples,
            frame_ms,
            pending: Vec::with_capacity(frame_samples),
            emitted: 0,
            sender,
        }
    }

    fn push<T, F>(&mut self, data: &[T], channels: usize, convert: F)
    where
        T: Copy,
        F: Fn(T) -> i16,
    {
        for frame in data.chunks(channels) {
            let sum: i32 = frame.iter().map(|&s| convert(s) as i32).sum();
            self.pending.push((sum / frame.len() as i32) as i16);
        }

        while self.pending.len() >= self.frame_samples {
            let samples: Vec<i16> = self.pending.drain(..self.frame_samples).collect();
            self.emit(samples);
        }
    }

    fn emit(&mut self, samples: Vec<i16>) {
        let frame = AudioFrame {
            samples,
            sample_rate: self.sample_rate,
            channels: 1,
            timestamp_ms: self.emitted * self.frame_ms,
        };
        self.emitted += 1;

        // The callback thread must never block; a full queue drops the frame.
        if let Err(mpsc::error::TrySendError::Full(_)) = self.sender.try_send(frame) {
            warn!("Dropped microphone frame: consumer is behind");
        }
    }
}

impl Drop for FramePump {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            let tail = std::mem::take(&mut self.pending);
            self.emit(tail);
        }
    }
}
