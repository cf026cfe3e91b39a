use serde::{Deserialize, Serialize};

/// Configuration for a recorder session.
///
/// Immutable for the duration of one session, with two exceptions:
/// the gain may change at any time (applied to the next block) and the
/// device index may change while idle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Capture sample rate in Hz (default: 44100).
    pub sample_rate: u32,

    /// Number of capture channels, 1 = mono, 2 = stereo (default: 1).
    pub channels: u16,

    /// Requested frames per capture callback (default: 1024).
    ///
    /// Backends treat this as a hint; delivered blocks may differ in size.
    pub block_size: u32,

    /// Input device index from `list_input_devices`, or `None` for the
    /// system default.
    pub device_index: Option<usize>,

    /// Gain in decibels applied to every captured block (default: 0.0).
    pub gain_db: f32,

    /// Length of the visualization scope window in seconds (default: 2.0).
    pub scope_window_secs: f32,
}

impl RecorderConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate == 0 {
            return Err("sample rate must be positive".into());
        }
        if ![1, 2].contains(&self.channels) {
            return Err(format!("unsupported channel count: {}", self.channels));
        }
        if self.block_size == 0 {
            return Err("block size must be positive".into());
        }
        if self.scope_window_secs <= 0.0 {
            return Err("scope window must be positive".into());
        }
        Ok(())
    }

    /// Scope buffer capacity in samples for this configuration.
    pub fn scope_capacity(&self) -> usize {
        ((self.scope_window_secs as f64 * self.sample_rate as f64) as usize).max(1)
    }
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 1,
            block_size: 1024,
            device_index: None,
            gain_db: 0.0,
            scope_window_secs: 2.0,
        }
    }
}
