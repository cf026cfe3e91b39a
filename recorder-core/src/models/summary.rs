use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::encode::SinkFormat;

/// Summary returned when a recording session is stopped and its file
/// has been finalized.
///
/// Serializable so the caller's preference/history layer can persist it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingSummary {
    pub file_path: PathBuf,
    pub format: SinkFormat,
    /// Frames actually written (one frame = one sample per channel).
    pub frames: u64,
    /// `frames / sample_rate`.
    pub duration_secs: f64,
    /// SHA-256 hex digest of the finalized file.
    pub checksum: String,
    pub finished_at: String,
}

impl RecordingSummary {
    pub fn new(
        file_path: PathBuf,
        format: SinkFormat,
        frames: u64,
        sample_rate: u32,
        checksum: String,
    ) -> Self {
        Self {
            file_path,
            format,
            frames,
            duration_secs: frames as f64 / sample_rate as f64,
            checksum,
            finished_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
