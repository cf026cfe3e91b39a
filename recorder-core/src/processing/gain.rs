//! Linear gain stage.
//!
//! Pure math on `&mut [f32]` buffers, no state, safe to call from the
//! capture callback with the gain value current at that moment.

/// Convert a decibel value to a linear amplitude factor: `10^(db/20)`.
pub fn db_to_linear(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

/// Apply `gain_db` to a block of samples in place.
///
/// Every sample is multiplied by the linear factor and then hard-clipped
/// to `[-1.0, 1.0]` (no soft saturation). A gain of 0 dB leaves in-range
/// samples unchanged.
pub fn apply_gain(samples: &mut [f32], gain_db: f32) {
    let factor = db_to_linear(gain_db);
    for sample in samples {
        *sample = (*sample * factor).clamp(-1.0, 1.0);
    }
}
