//! # recorder-cpal
//!
//! cpal capture backend for recorder-core.
//!
//! Provides:
//! - `CpalMicCapture` — input capture implementing `CaptureProvider`
//! - `list_input_devices` — input device enumeration
//!
//! ## Usage
//! ```ignore
//! use recorder_core::{RecorderConfig, RecorderSession, SinkFormat};
//! use recorder_cpal::CpalMicCapture;
//!
//! let mut session = RecorderSession::new(CpalMicCapture::new(), RecorderConfig::default())?;
//! session.start("/tmp/rec_20260830_120000.wav", SinkFormat::Wav)?;
//! // ... poll session.current_level() / session.scope_snapshot() ...
//! session.stop()?;
//! ```

pub mod device_enumerator;
pub mod mic_capture;

pub use device_enumerator::list_input_devices;
pub use mic_capture::CpalMicCapture;
