use std::sync::Arc;

use crate::models::config::RecorderConfig;
use crate::models::error::RecorderError;

/// Callback invoked for every captured block.
///
/// `samples` are interleaved f32 in `[-1.0, 1.0]` at the configured
/// sample rate and channel count. The slice is only valid for the
/// duration of the call; the block is not retained by the backend.
pub type AudioBlockCallback = Arc<dyn Fn(&[f32]) + Send + Sync + 'static>;

/// Callback invoked when the backend fails mid-stream (device unplugged,
/// stream dropped by the OS).
pub type CaptureErrorCallback = Arc<dyn Fn(RecorderError) + Send + Sync + 'static>;

/// Interface for platform audio capture backends.
///
/// Implemented by `recorder-cpal`'s `CpalMicCapture`; tests use scripted
/// in-process providers. Exactly one capture stream may be active per
/// provider at a time.
pub trait CaptureProvider {
    /// Start delivering blocks via `on_block`.
    ///
    /// Blocks arrive on a dedicated audio thread in strict arrival
    /// order — keep per-block processing minimal. `on_error` fires at
    /// most once, after which no further blocks are delivered.
    fn start(
        &mut self,
        config: &RecorderConfig,
        on_block: AudioBlockCallback,
        on_error: CaptureErrorCallback,
    ) -> Result<(), RecorderError>;

    /// Stop capturing and release the device stream.
    fn stop(&mut self) -> Result<(), RecorderError>;
}
