//! Sample-layout helpers shared by the encoder and metering paths.

/// Downmix interleaved multi-channel audio to mono by averaging channels
/// per frame.
///
/// Mono input is returned as-is (copied). A trailing partial frame is
/// ignored.
pub fn downmix_to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    let frame_count = samples.len() / channels;
    let scale = 1.0 / channels as f32;
    let mut mono = Vec::with_capacity(frame_count);
    for frame in 0..frame_count {
        let mut sum = 0.0f32;
        for ch in 0..channels {
            sum += samples[frame * channels + ch];
        }
        mono.push(sum * scale);
    }
    mono
}

/// Convert f32 samples in `[-1.0, 1.0]` to signed 16-bit PCM.
///
/// Rounding mode: multiply by 32767 and truncate toward zero (the `as`
/// cast). Out-of-range input is clamped first, so 1.0 maps to 32767 and
/// -1.0 maps to -32767.
pub fn to_i16_pcm(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
        .collect()
}
