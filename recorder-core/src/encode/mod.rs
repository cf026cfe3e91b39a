//! Streaming encoders for the two supported containers.
//!
//! Both encoders own exactly one output file for the lifetime of a
//! session: `open` → `append`* → `finalize`. Appending after finalize is
//! a contract violation and fails with `RecorderError::EncoderClosed`;
//! the session guarantees the ordering is never violated in practice.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::models::error::RecorderError;

pub mod flac;
pub mod wav;

pub use flac::FlacEncoder;
pub use wav::WavEncoder;

/// Output container format. Closed set: each variant is bound to its own
/// encoder behind the `AudioEncoder` trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkFormat {
    Wav,
    Flac,
}

impl SinkFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Flac => "flac",
        }
    }
}

impl std::str::FromStr for SinkFormat {
    type Err = RecorderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wav" => Ok(Self::Wav),
            "flac" => Ok(Self::Flac),
            other => Err(RecorderError::Config(format!("unknown format: {other}"))),
        }
    }
}

/// Streaming audio encoder owning one open output file.
///
/// `append` takes interleaved signed 16-bit PCM (already gain-adjusted
/// and converted by the caller) and must never re-read or rewrite
/// previously appended sample data. `finalize` completes the container
/// metadata and releases the file; it is safe to call at most once.
pub trait AudioEncoder: Send {
    fn append(&mut self, pcm: &[i16]) -> Result<(), RecorderError>;

    fn finalize(&mut self) -> Result<(), RecorderError>;

    /// Frames appended so far (one frame = one sample per channel).
    fn frames_written(&self) -> u64;

    fn format(&self) -> SinkFormat;

    fn path(&self) -> &Path;
}

/// Open an encoder for `format` at `path`, creating the directory tree
/// if absent.
///
/// Failures to create the directory or the file surface as
/// `RecorderError::Path` and leave no encoder open.
pub fn open(
    path: &Path,
    format: SinkFormat,
    sample_rate: u32,
    channels: u16,
) -> Result<Box<dyn AudioEncoder>, RecorderError> {
    match format {
        SinkFormat::Wav => Ok(Box::new(WavEncoder::open(path, sample_rate, channels)?)),
        SinkFormat::Flac => Ok(Box::new(FlacEncoder::open(path, sample_rate, channels)?)),
    }
}

/// Conventional output file name: `rec_<timestamp>.<ext>`.
pub fn default_file_name(format: SinkFormat) -> String {
    let ts = chrono::Local::now().format("%Y%m%d_%H%M%S");
    format!("rec_{}.{}", ts, format.extension())
}

/// SHA-256 hex digest of a file on disk.
pub fn sha256_file(path: &Path) -> Result<String, RecorderError> {
    let data = fs::read(path)
        .map_err(|e| RecorderError::EncodeIo(format!("failed to read file for checksum: {e}")))?;
    let digest = Sha256::digest(&data);
    Ok(digest.iter().map(|b| format!("{b:02x}")).collect())
}

pub(crate) fn create_parent_dirs(path: &Path) -> Result<(), RecorderError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| RecorderError::Path(format!("failed to create directory: {e}")))?;
    }
    Ok(())
}
