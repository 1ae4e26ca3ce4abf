use anyhow::{bail, Context, Result};
use std::io::Cursor;

use super::backend::AudioFrame;

/// One finished recording, ready for upload
#[derive(Debug, Clone, PartialEq)]
pub struct AudioArtifact {
    /// Encoded audio
    pub bytes: Vec<u8>,
    /// MIME type of `bytes`
    pub mime_type: String,
    /// File name sent with the multipart upload
    pub file_name: String,
    /// Recording length in milliseconds
    pub duration_ms: u64,
}

impl AudioArtifact {
    pub const WAV_MIME: &'static str = "audio/wav";
    pub const WAV_FILE_NAME: &'static str = "voice.wav";

    /// Concatenate captured frames into a single 16-bit PCM WAV file
    ///
    /// The format of the first frame wins; inputs never change format
    /// mid-stream.
    pub fn from_frames(frames: &[AudioFrame]) -> Result<Self> {
        let Some(first) = frames.first() else {
            bail!("no audio captured");
        };

        let sample_count: usize = frames.iter().map(|f| f.samples.len()).sum();
        if sample_count == 0 {
            bail!("no audio captured");
        }

        let spec = hound::WavSpec {
            channels: first.channels,
            sample_rate: first.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::with_capacity(44 + sample_count * 2));
        {
            let mut writer =
                hound::WavWriter::new(&mut cursor, spec).context("Failed to start WAV encoding")?;
            for frame in frames {
                for &sample in &frame.samples {
                    writer
                        .write_sample(sample)
                        .context("Failed to write sample to WAV")?;
                }
            }
            writer.finalize().context("Failed to finalize WAV data")?;
        }

        let per_second = first.sample_rate as u64 * first.channels.max(1) as u64;
        let duration_ms = if per_second == 0 {
            0
        } else {
            sample_count as u64 * 1000 / per_second
        };

        Ok(Self {
            bytes: cursor.into_inner(),
            mime_type: Self::WAV_MIME.to_string(),
            file_name: Self::WAV_FILE_NAME.to_string(),
            duration_ms,
        })
    }
}
