//! Streaming WAV (RIFF linear-PCM) encoder.
//!
//! A fixed 44-byte header is written at open with a zero data length;
//! PCM bytes are appended as they arrive; `finalize` seeks back and
//! patches the RIFF and data chunk sizes so the declared length exactly
//! equals the bytes written.

use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::models::error::RecorderError;

use super::{create_parent_dirs, AudioEncoder};

/// Size of the standard WAV RIFF header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

const BIT_DEPTH: u16 = 16;

/// Generate a 44-byte WAV RIFF header for 16-bit PCM.
///
/// Layout:
/// ```text
/// [0-3]    "RIFF"
/// [4-7]    file size - 8 (36 + data_size)
/// [8-11]   "WAVE"
/// [12-15]  "fmt "
/// [16-19]  16 (PCM format chunk size)
/// [20-21]  1 (PCM format code)
/// [22-23]  channels
/// [24-27]  sample_rate
/// [28-31]  byte_rate = sample_rate * channels * 2
/// [32-33]  block_align = channels * 2
/// [34-35]  16 (bits per sample)
/// [36-39]  "data"
/// [40-43]  data_size
/// ```
pub fn generate_wav_header(sample_rate: u32, channels: u16, data_size: u32) -> [u8; WAV_HEADER_SIZE] {
    let byte_rate = sample_rate * channels as u32 * BIT_DEPTH as u32 / 8;
    let block_align = channels * BIT_DEPTH / 8;
    let chunk_size = 36 + data_size;

    let mut header = [0u8; WAV_HEADER_SIZE];

    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&chunk_size.to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes());
    header[22..24].copy_from_slice(&channels.to_le_bytes());
    header[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&BIT_DEPTH.to_le_bytes());

    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());

    header
}

pub struct WavEncoder {
    path: PathBuf,
    file: Option<File>,
    channels: u16,
    frames: u64,
    data_bytes: u64,
}

impl WavEncoder {
    /// Create the file (and any missing directories) and write the
    /// placeholder header.
    pub fn open(path: &Path, sample_rate: u32, channels: u16) -> Result<Self, RecorderError> {
        create_parent_dirs(path)?;

        let mut file = File::create(path)
            .map_err(|e| RecorderError::Path(format!("failed to create file: {e}")))?;

        let header = generate_wav_header(sample_rate, channels, 0);
        file.write_all(&header)
            .map_err(|e| RecorderError::EncodeIo(format!("failed to write header: {e}")))?;

        log::debug!("wav encoder opened: {}", path.display());

        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
            channels,
            frames: 0,
            data_bytes: 0,
        })
    }
}

impl AudioEncoder for WavEncoder {
    fn append(&mut self, pcm: &[i16]) -> Result<(), RecorderError> {
        let file = self.file.as_mut().ok_or(RecorderError::EncoderClosed)?;

        let mut bytes = Vec::with_capacity(pcm.len() * 2);
        for &sample in pcm {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        file.write_all(&bytes)
            .map_err(|e| RecorderError::EncodeIo(format!("write failed: {e}")))?;

        self.data_bytes += bytes.len() as u64;
        self.frames += (pcm.len() / self.channels as usize) as u64;
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), RecorderError> {
        let Some(mut file) = self.file.take() else {
            return Ok(());
        };

        // Patch RIFF chunk size at offset 4, then data size at offset 40.
        let riff_size = (36 + self.data_bytes) as u32;
        file.seek(SeekFrom::Start(4))
            .map_err(|e| RecorderError::EncodeIo(e.to_string()))?;
        file.write_all(&riff_size.to_le_bytes())
            .map_err(|e| RecorderError::EncodeIo(e.to_string()))?;

        file.seek(SeekFrom::Start(40))
            .map_err(|e| RecorderError::EncodeIo(e.to_string()))?;
        file.write_all(&(self.data_bytes as u32).to_le_bytes())
            .map_err(|e| RecorderError::EncodeIo(e.to_string()))?;

        file.flush()
            .map_err(|e| RecorderError::EncodeIo(e.to_string()))?;

        log::debug!(
            "wav encoder finalized: {} ({} frames)",
            self.path.display(),
            self.frames
        );
        Ok(())
    }

    fn frames_written(&self) -> u64 {
        self.frames
    }

    fn format(&self) -> super::SinkFormat {
        super::SinkFormat::Wav
    }

    fn path(&self) -> &Path {
        &self.path
    }
}
