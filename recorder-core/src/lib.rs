//! # recorder-core
//!
//! Platform-agnostic mic recording core library.
//!
//! Captures blocks from a pluggable audio backend, applies a linear gain,
//! streams the result into a WAV or FLAC file, and maintains a rolling
//! scope buffer plus a coarse 0–100 level meter for visualization.
//! Platform backends (cpal, test doubles) implement the `CaptureProvider`
//! trait and plug into the generic `RecorderSession`.
//!
//! ## Architecture
//!
//! ```text
//! recorder-core (this crate)
//! ├── traits/       ← CaptureProvider + callback typedefs
//! ├── models/       ← RecorderError, RecorderState, RecorderConfig, InputDevice, RecordingSummary
//! ├── processing/   ← gain stage, scope ring buffer, level meter, PCM helpers
//! ├── encode/       ← SinkFormat, AudioEncoder, WavEncoder, FlacEncoder
//! └── session/      ← RecorderSession (generic orchestrator)
//! ```

pub mod encode;
pub mod models;
pub mod processing;
pub mod session;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use encode::{default_file_name, AudioEncoder, FlacEncoder, SinkFormat, WavEncoder};
pub use models::config::RecorderConfig;
pub use models::device::InputDevice;
pub use models::error::RecorderError;
pub use models::state::RecorderState;
pub use models::summary::RecordingSummary;
pub use processing::level_meter::LevelMeter;
pub use processing::scope_buffer::ScopeBuffer;
pub use session::recorder::RecorderSession;
pub use traits::capture_provider::{AudioBlockCallback, CaptureErrorCallback, CaptureProvider};
