//! Coarse VU-style loudness indicator.

/// Default RMS-to-level scale. An empirical tuning value: full-scale
/// input saturates the meter well before the clamp, speech sits in a
/// readable mid range.
pub const DEFAULT_RMS_SCALE: f32 = 300.0;

/// Maps a block of mono samples to an integer level in `[0, 100]`.
///
/// The mapping is `clamp(rms * scale, 0, 100)`: monotonic in RMS and
/// saturating at 100. Not a calibrated loudness unit.
#[derive(Debug, Clone, Copy)]
pub struct LevelMeter {
    scale: f32,
}

impl LevelMeter {
    pub fn new() -> Self {
        Self::with_scale(DEFAULT_RMS_SCALE)
    }

    pub fn with_scale(scale: f32) -> Self {
        Self { scale }
    }

    /// Level of one block. An empty block yields 0.
    pub fn level(&self, samples: &[f32]) -> u8 {
        (rms(samples) * self.scale).clamp(0.0, 100.0) as u8
    }
}

impl Default for LevelMeter {
    fn default() -> Self {
        Self::new()
    }
}

/// Root-mean-square of a block (0.0–1.0 for normalized audio).
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}
