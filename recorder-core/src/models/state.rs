/// Recorder session state machine.
///
/// State transitions:
/// ```text
/// idle → recording → idle
/// ```
///
/// `Idle` is both the initial and the terminal state of every session;
/// transitions happen only via explicit `start()`/`stop()` calls (or a
/// self-stop after an asynchronous failure).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    Recording,
}

impl RecorderState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording)
    }
}
