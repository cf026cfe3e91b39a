//! Lossless FLAC encoder (16-bit subtype) built on `flacenc`.
//!
//! `flacenc`'s encoder materializes a whole stream (STREAMINFO carries
//! the total sample count and MD5), so appended blocks are streamed to
//! a raw-PCM spill file next to the output and the container is encoded
//! from it in one pass at `finalize`. Memory stays bounded per block,
//! every appended sample is on disk before `append` returns, and the
//! spill is removed once the FLAC stream is written. The output file
//! itself is created at `open` so path problems surface synchronously,
//! before any audio is captured.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use flacenc::component::BitRepr;
use flacenc::error::Verify;

use crate::models::error::RecorderError;

use super::{create_parent_dirs, AudioEncoder};

pub struct FlacEncoder {
    path: PathBuf,
    file: Option<File>,
    spill_path: PathBuf,
    /// Interleaved i16 little-endian samples, appended as they arrive.
    spill: Option<BufWriter<File>>,
    sample_rate: u32,
    channels: u16,
    samples_written: u64,
}

impl FlacEncoder {
    pub fn open(path: &Path, sample_rate: u32, channels: u16) -> Result<Self, RecorderError> {
        create_parent_dirs(path)?;

        let file = File::create(path)
            .map_err(|e| RecorderError::Path(format!("failed to create file: {e}")))?;

        let mut spill_os = path.as_os_str().to_os_string();
        spill_os.push(".pcm");
        let spill_path = PathBuf::from(spill_os);

        let spill = File::create(&spill_path)
            .map_err(|e| RecorderError::Path(format!("failed to create spill file: {e}")))?;

        log::debug!("flac encoder opened: {}", path.display());

        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
            spill_path,
            spill: Some(BufWriter::new(spill)),
            sample_rate,
            channels,
            samples_written: 0,
        })
    }
}

impl AudioEncoder for FlacEncoder {
    fn append(&mut self, pcm: &[i16]) -> Result<(), RecorderError> {
        let spill = self.spill.as_mut().ok_or(RecorderError::EncoderClosed)?;

        let mut bytes = Vec::with_capacity(pcm.len() * 2);
        for &sample in pcm {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        spill
            .write_all(&bytes)
            .map_err(|e| RecorderError::EncodeIo(format!("spill write failed: {e}")))?;

        self.samples_written += pcm.len() as u64;
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), RecorderError> {
        let Some(mut file) = self.file.take() else {
            return Ok(());
        };

        if let Some(mut spill) = self.spill.take() {
            spill
                .flush()
                .map_err(|e| RecorderError::EncodeIo(format!("spill flush failed: {e}")))?;
        }

        let raw = fs::read(&self.spill_path)
            .map_err(|e| RecorderError::EncodeIo(format!("spill read failed: {e}")))?;
        let mut samples = Vec::with_capacity(raw.len() / 2);
        for pair in raw.chunks_exact(2) {
            samples.push(i16::from_le_bytes([pair[0], pair[1]]) as i32);
        }

        let config = flacenc::config::Encoder::default()
            .into_verified()
            .map_err(|(_, err)| RecorderError::EncodeIo(format!("flac config: {err:?}")))?;

        let source = flacenc::source::MemSource::from_samples(
            &samples,
            self.channels as usize,
            16,
            self.sample_rate as usize,
        );

        let stream = flacenc::encode_with_fixed_block_size(&config, source, config.block_size)
            .map_err(|e| RecorderError::EncodeIo(format!("flac encode: {e:?}")))?;

        let mut sink = flacenc::bitsink::ByteSink::new();
        stream
            .write(&mut sink)
            .map_err(|e| RecorderError::EncodeIo(format!("flac serialize: {e:?}")))?;

        file.write_all(sink.as_slice())
            .map_err(|e| RecorderError::EncodeIo(format!("write failed: {e}")))?;
        file.flush()
            .map_err(|e| RecorderError::EncodeIo(e.to_string()))?;

        fs::remove_file(&self.spill_path).ok();

        log::debug!(
            "flac encoder finalized: {} ({} frames)",
            self.path.display(),
            self.frames_written()
        );
        Ok(())
    }

    fn frames_written(&self) -> u64 {
        self.samples_written / self.channels as u64
    }

    fn format(&self) -> super::SinkFormat {
        super::SinkFormat::Flac
    }

    fn path(&self) -> &Path {
        &self.path
    }
}
