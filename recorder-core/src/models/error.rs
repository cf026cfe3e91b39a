use thiserror::Error;

/// Errors that can occur during recording operations.
///
/// Every failure ends the current session cleanly; nothing is retried
/// automatically. The caller decides whether to start a new session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecorderError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("output path error: {0}")]
    Path(String),

    #[error("capture device error: {0}")]
    Device(String),

    #[error("encode I/O error: {0}")]
    EncodeIo(String),

    #[error("a recording is already in progress")]
    AlreadyRecording,

    #[error("encoder has already been finalized")]
    EncoderClosed,
}
