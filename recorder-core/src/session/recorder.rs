use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::encode::{self, AudioEncoder, SinkFormat};
use crate::models::config::RecorderConfig;
use crate::models::error::RecorderError;
use crate::models::state::RecorderState;
use crate::models::summary::RecordingSummary;
use crate::processing::gain;
use crate::processing::level_meter::LevelMeter;
use crate::processing::pcm;
use crate::processing::scope_buffer::ScopeBuffer;
use crate::traits::capture_provider::{
    AudioBlockCallback, CaptureErrorCallback, CaptureProvider,
};

/// Internal mutable session state, protected by `parking_lot::Mutex`.
struct Shared {
    state: RecorderState,
    started_at: Option<Instant>,
    /// Error from an asynchronous failure (append or device drop),
    /// handed to the caller on the next `stop()` or `take_error()`.
    pending_error: Option<RecorderError>,
}

impl Shared {
    fn new() -> Self {
        Self {
            state: RecorderState::Idle,
            started_at: None,
            pending_error: None,
        }
    }
}

/// Recorder session orchestrator, generic over the capture backend.
///
/// Data flow per captured block:
/// ```text
/// [CaptureProvider] → gain → ┬→ i16 PCM → [AudioEncoder]   (persisted)
///                            └→ mono     → [ScopeBuffer]   (ephemeral)
///                                        → [LevelMeter]    (ephemeral)
/// ```
///
/// The control thread issues `start`/`stop`/queries; blocks arrive on
/// the backend's audio thread. Shared state between the two uses
/// explicit synchronization: a mutex for the state and scope buffer,
/// atomics for the level value and the gain, so queries never observe a
/// torn write and never stall the callback for long.
pub struct RecorderSession<P: CaptureProvider> {
    provider: P,
    config: RecorderConfig,
    shared: Arc<Mutex<Shared>>,
    scope: Arc<Mutex<ScopeBuffer>>,
    level: Arc<AtomicU8>,
    /// Current gain in dB, stored as f32 bits so the callback can read
    /// it without locking.
    gain_bits: Arc<AtomicU32>,
    /// Exactly one encoder may be open per session; drained under the
    /// control thread before a new `start()` can succeed.
    encoder: Arc<Mutex<Option<Box<dyn AudioEncoder>>>>,
    meter: LevelMeter,
    provider_started: bool,
}

impl<P: CaptureProvider> RecorderSession<P> {
    pub fn new(provider: P, config: RecorderConfig) -> Result<Self, RecorderError> {
        config.validate().map_err(RecorderError::Config)?;

        Ok(Self {
            provider,
            gain_bits: Arc::new(AtomicU32::new(config.gain_db.to_bits())),
            scope: Arc::new(Mutex::new(ScopeBuffer::new(config.scope_capacity()))),
            config,
            shared: Arc::new(Mutex::new(Shared::new())),
            level: Arc::new(AtomicU8::new(0)),
            encoder: Arc::new(Mutex::new(None)),
            meter: LevelMeter::new(),
            provider_started: false,
        })
    }

    /// Begin recording to `path` in `format`.
    ///
    /// Fails with `AlreadyRecording` while a session is in progress,
    /// with `Path` when the output directory does not exist (no file is
    /// created in that case), and with `Device` when the backend cannot
    /// be opened — in which case the already-opened encoder is finalized
    /// before the error is reported, leaving no dangling resources.
    pub fn start(
        &mut self,
        path: impl Into<PathBuf>,
        format: SinkFormat,
    ) -> Result<(), RecorderError> {
        let path = path.into();

        if self.is_running() {
            return Err(RecorderError::AlreadyRecording);
        }
        self.shared.lock().pending_error = None;

        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if !dir.is_dir() {
            return Err(RecorderError::Path(format!(
                "output directory does not exist: {}",
                dir.display()
            )));
        }

        let enc = encode::open(&path, format, self.config.sample_rate, self.config.channels)?;
        *self.encoder.lock() = Some(enc);

        // Fresh scope buffer and meter value per session.
        *self.scope.lock() = ScopeBuffer::new(self.config.scope_capacity());
        self.level.store(0, Ordering::Relaxed);

        let on_block = self.block_callback();
        let on_error = self.error_callback();

        // Recording state must be visible before the backend runs: some
        // backends deliver blocks from inside `start()`, and the callback
        // drops anything that arrives while the session reads as idle.
        {
            let mut s = self.shared.lock();
            s.state = RecorderState::Recording;
            s.started_at = Some(Instant::now());
        }

        if let Err(err) = self.provider.start(&self.config, on_block, on_error) {
            {
                let mut s = self.shared.lock();
                s.state = RecorderState::Idle;
                s.started_at = None;
            }
            if let Some(mut enc) = self.encoder.lock().take() {
                if let Err(close_err) = enc.finalize() {
                    log::error!("encoder finalize after failed start also failed: {close_err}");
                }
            }
            return Err(err);
        }
        self.provider_started = true;

        log::info!(
            "recording started: {} ({:?}, {} Hz, {} ch, {:+.1} dB)",
            path.display(),
            format,
            self.config.sample_rate,
            self.config.channels,
            self.gain_db()
        );
        Ok(())
    }

    /// Stop recording and finalize the output file.
    ///
    /// Idempotent: calling while idle is a no-op returning `Ok(None)`.
    /// If an asynchronous failure already ended the session, that error
    /// is returned here (unless it was drained via `take_error`).
    pub fn stop(&mut self) -> Result<Option<RecordingSummary>, RecorderError> {
        {
            let mut s = self.shared.lock();
            s.state = RecorderState::Idle;
            s.started_at = None;
        }

        if self.provider_started {
            if let Err(err) = self.provider.stop() {
                log::warn!("capture provider stop failed: {err}");
            }
            self.provider_started = false;
        }

        let taken = self.encoder.lock().take();
        match taken {
            Some(mut enc) => {
                let frames = enc.frames_written();
                let format = enc.format();
                let path = enc.path().to_path_buf();
                enc.finalize()?;

                let checksum = encode::sha256_file(&path)?;
                let summary = RecordingSummary::new(
                    path,
                    format,
                    frames,
                    self.config.sample_rate,
                    checksum,
                );
                log::info!(
                    "recording stopped: {} ({} frames, {:.2}s)",
                    summary.file_path.display(),
                    summary.frames,
                    summary.duration_secs
                );
                Ok(Some(summary))
            }
            None => match self.shared.lock().pending_error.take() {
                Some(err) => Err(err),
                None => Ok(None),
            },
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.lock().state.is_recording()
    }

    pub fn state(&self) -> RecorderState {
        self.shared.lock().state
    }

    /// Whole seconds since `start()`; 0 while idle.
    pub fn elapsed_secs(&self) -> u64 {
        self.shared
            .lock()
            .started_at
            .map(|t| t.elapsed().as_secs())
            .unwrap_or(0)
    }

    /// Latest meter value in `[0, 100]`.
    pub fn current_level(&self) -> u8 {
        self.level.load(Ordering::Relaxed)
    }

    /// Chronological copy of the scope window, newest sample last.
    pub fn scope_snapshot(&self) -> Vec<f32> {
        self.scope.lock().snapshot()
    }

    /// Change the gain. Valid in either state; while recording it
    /// applies from the next block on.
    pub fn set_gain_db(&self, db: f32) {
        self.gain_bits.store(db.to_bits(), Ordering::Relaxed);
    }

    pub fn gain_db(&self) -> f32 {
        f32::from_bits(self.gain_bits.load(Ordering::Relaxed))
    }

    /// Select the capture device for the next session. Only valid while
    /// idle.
    pub fn set_device_index(&mut self, index: Option<usize>) -> Result<(), RecorderError> {
        if self.is_running() {
            return Err(RecorderError::AlreadyRecording);
        }
        self.config.device_index = index;
        Ok(())
    }

    /// Drain the error left behind by an asynchronous failure, if any.
    pub fn take_error(&self) -> Option<RecorderError> {
        self.shared.lock().pending_error.take()
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    // --- Internal helpers ---

    /// Per-block pipeline run on the backend's audio thread.
    ///
    /// Lock discipline: the state lock is never held while waiting on
    /// the encoder lock from the control thread, and the callback takes
    /// them one at a time, so the two threads cannot deadlock.
    fn block_callback(&self) -> AudioBlockCallback {
        let shared = Arc::clone(&self.shared);
        let encoder = Arc::clone(&self.encoder);
        let scope = Arc::clone(&self.scope);
        let level = Arc::clone(&self.level);
        let gain_bits = Arc::clone(&self.gain_bits);
        let meter = self.meter;
        let channels = self.config.channels as usize;

        Arc::new(move |samples: &[f32]| {
            if !shared.lock().state.is_recording() {
                return;
            }

            let mut block = samples.to_vec();
            gain::apply_gain(&mut block, f32::from_bits(gain_bits.load(Ordering::Relaxed)));

            let pcm16 = pcm::to_i16_pcm(&block);
            {
                let mut slot = encoder.lock();
                let Some(enc) = slot.as_mut() else {
                    return;
                };
                if let Err(err) = enc.append(&pcm16) {
                    // Write failure: not retried. Self-stop, finalize
                    // best-effort so the header is not left unfinalized,
                    // and keep the error for the caller.
                    log::error!("failed to append audio block: {err}");
                    if let Some(mut enc) = slot.take() {
                        if let Err(close_err) = enc.finalize() {
                            log::error!("best-effort finalize also failed: {close_err}");
                        }
                    }
                    drop(slot);
                    let mut s = shared.lock();
                    s.state = RecorderState::Idle;
                    s.started_at = None;
                    s.pending_error = Some(err);
                    return;
                }
            }

            let mono = pcm::downmix_to_mono(&block, channels);
            scope.lock().push(&mono);
            level.store(meter.level(&mono), Ordering::Relaxed);
        })
    }

    /// Mid-stream backend failure: close out the partial file so it
    /// stays a valid container, move to idle, surface the error on the
    /// next query.
    fn error_callback(&self) -> CaptureErrorCallback {
        let shared = Arc::clone(&self.shared);
        let encoder = Arc::clone(&self.encoder);

        Arc::new(move |err: RecorderError| {
            log::error!("capture backend failure: {err}");
            if let Some(mut enc) = encoder.lock().take() {
                if let Err(close_err) = enc.finalize() {
                    log::error!("finalize after device failure failed: {close_err}");
                }
            }
            let mut s = shared.lock();
            s.state = RecorderState::Idle;
            s.started_at = None;
            s.pending_error = Some(err);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Scripted provider: the test keeps a clone and pushes blocks
    /// through the captured callback as if an audio thread delivered
    /// them.
    #[derive(Clone, Default)]
    struct MockProvider {
        callbacks: Arc<Mutex<Option<(AudioBlockCallback, CaptureErrorCallback)>>>,
        fail_start: bool,
        /// Delivered synchronously from inside `start()`, like a backend
        /// whose audio thread fires before `start()` returns.
        start_block: Arc<Mutex<Option<Vec<f32>>>>,
    }

    impl MockProvider {
        fn failing() -> Self {
            Self {
                fail_start: true,
                ..Self::default()
            }
        }

        fn set_start_block(&self, block: Vec<f32>) {
            *self.start_block.lock() = Some(block);
        }

        fn emit(&self, block: &[f32]) {
            let cb = self.callbacks.lock().as_ref().map(|(b, _)| Arc::clone(b));
            if let Some(cb) = cb {
                cb(block);
            }
        }

        fn emit_error(&self, err: RecorderError) {
            let cb = self.callbacks.lock().as_ref().map(|(_, e)| Arc::clone(e));
            if let Some(cb) = cb {
                cb(err);
            }
        }
    }

    impl CaptureProvider for MockProvider {
        fn start(
            &mut self,
            _config: &RecorderConfig,
            on_block: AudioBlockCallback,
            on_error: CaptureErrorCallback,
        ) -> Result<(), RecorderError> {
            if self.fail_start {
                return Err(RecorderError::Device("mock device unavailable".into()));
            }
            *self.callbacks.lock() = Some((Arc::clone(&on_block), on_error));
            if let Some(block) = self.start_block.lock().take() {
                on_block(&block);
            }
            Ok(())
        }

        fn stop(&mut self) -> Result<(), RecorderError> {
            *self.callbacks.lock() = None;
            Ok(())
        }
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("recorder_session_test_{name}"));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn session(name: &str) -> (RecorderSession<MockProvider>, MockProvider, PathBuf) {
        let provider = MockProvider::default();
        let handle = provider.clone();
        let session = RecorderSession::new(provider, RecorderConfig::default()).unwrap();
        (session, handle, temp_dir(name))
    }

    #[test]
    fn wav_round_trip_declares_exact_frame_count() {
        let (mut session, provider, dir) = session("round_trip");
        let path = dir.join("take.wav");

        session.start(&path, SinkFormat::Wav).unwrap();
        let block = vec![0.25f32; 1024];
        for _ in 0..8 {
            provider.emit(&block);
        }
        let summary = session.stop().unwrap().unwrap();

        assert_eq!(summary.frames, 8 * 1024);
        assert!((summary.duration_secs - 8.0 * 1024.0 / 44100.0).abs() < 1e-9);

        let data = fs::read(&path).unwrap();
        let declared = u32::from_le_bytes([data[40], data[41], data[42], data[43]]);
        assert_eq!(declared as u64, 8 * 1024 * 2); // 16-bit mono
        assert_eq!(data.len() as u64, 44 + 8 * 1024 * 2);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn flac_session_produces_flac_stream() {
        let (mut session, provider, dir) = session("flac");
        let path = dir.join("take.flac");

        session.start(&path, SinkFormat::Flac).unwrap();
        provider.emit(&vec![0.1f32; 1024]);
        provider.emit(&vec![-0.1f32; 1024]);
        let summary = session.stop().unwrap().unwrap();

        assert_eq!(summary.frames, 2048);
        assert_eq!(summary.format, SinkFormat::Flac);
        let data = fs::read(&path).unwrap();
        assert_eq!(&data[0..4], b"fLaC");

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn gain_is_applied_before_encoding() {
        let (mut session, provider, dir) = session("gain");
        let path = dir.join("hot.wav");

        session.set_gain_db(24.0);
        session.start(&path, SinkFormat::Wav).unwrap();
        provider.emit(&[0.9f32; 4]); // clips to 1.0
        session.stop().unwrap();

        let data = fs::read(&path).unwrap();
        let first = i16::from_le_bytes([data[44], data[45]]);
        assert_eq!(first, i16::MAX);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn scope_and_level_update_per_block() {
        let (mut session, provider, dir) = session("meter");
        let path = dir.join("take.wav");

        session.start(&path, SinkFormat::Wav).unwrap();
        assert_eq!(session.current_level(), 0);

        provider.emit(&[1.0f32; 512]);
        assert_eq!(session.current_level(), 100);
        let snap = session.scope_snapshot();
        assert_eq!(snap.len(), 512);
        assert_eq!(snap[511], 1.0);

        session.stop().unwrap();
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn stop_is_idempotent() {
        let (mut session, provider, dir) = session("idempotent");
        let path = dir.join("take.wav");

        session.start(&path, SinkFormat::Wav).unwrap();
        provider.emit(&[0.0f32; 64]);

        assert!(session.stop().unwrap().is_some());
        assert!(session.stop().unwrap().is_none());
        assert!(session.stop().unwrap().is_none());
        assert!(!session.is_running());

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn start_while_recording_is_rejected() {
        let (mut session, _provider, dir) = session("double_start");
        session.start(dir.join("a.wav"), SinkFormat::Wav).unwrap();

        let err = session.start(dir.join("b.wav"), SinkFormat::Wav);
        assert_eq!(err, Err(RecorderError::AlreadyRecording));
        assert!(session.is_running());

        session.stop().unwrap();
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_directory_fails_with_path_error_and_no_file() {
        let (mut session, _provider, dir) = session("missing_dir");
        let missing = dir.join("does_not_exist");
        let path = missing.join("take.wav");

        let result = session.start(&path, SinkFormat::Wav);
        assert!(matches!(result, Err(RecorderError::Path(_))));
        assert!(!session.is_running());
        assert!(!path.exists());
        assert!(!missing.exists());

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn provider_start_failure_leaves_no_dangling_encoder() {
        let provider = MockProvider::failing();
        let mut session = RecorderSession::new(provider, RecorderConfig::default()).unwrap();
        let dir = temp_dir("failed_start");
        let path = dir.join("take.wav");

        let result = session.start(&path, SinkFormat::Wav);
        assert!(matches!(result, Err(RecorderError::Device(_))));
        assert!(!session.is_running());

        // The encoder was finalized before the error surfaced: the file
        // on disk is a valid, empty container.
        let data = fs::read(&path).unwrap();
        assert_eq!(data.len(), 44);
        assert_eq!(&data[0..4], b"RIFF");

        // And a new session can start cleanly afterwards.
        assert!(session.stop().unwrap().is_none());

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn mid_stream_device_failure_self_stops_with_valid_file() {
        let (mut session, provider, dir) = session("device_drop");
        let path = dir.join("take.wav");

        session.start(&path, SinkFormat::Wav).unwrap();
        provider.emit(&[0.5f32; 1024]);
        provider.emit_error(RecorderError::Device("stream lost".into()));

        assert!(!session.is_running());
        // Blocks after the failure are dropped, not written.
        provider.emit(&[0.5f32; 1024]);

        let err = session.stop();
        assert_eq!(err, Err(RecorderError::Device("stream lost".into())));

        // Partial file is a finalized, playable container.
        let data = fs::read(&path).unwrap();
        let declared = u32::from_le_bytes([data[40], data[41], data[42], data[43]]);
        assert_eq!(declared, 1024 * 2);
        assert_eq!(data.len() as u32, 44 + declared);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn append_failure_self_stops_and_surfaces_error() {
        let (mut session, provider, dir) = session("append_failure");
        let path = dir.join("take.wav");

        session.start(&path, SinkFormat::Wav).unwrap();
        provider.emit(&[0.5f32; 256]);

        // Close the open encoder behind the session's back so the next
        // append fails the way a full-disk write would.
        {
            let mut slot = session.encoder.lock();
            let mut enc = slot.take().unwrap();
            enc.finalize().unwrap();
            *slot = Some(enc);
        }

        provider.emit(&[0.5f32; 256]);

        assert!(!session.is_running());
        assert!(session.encoder.lock().is_none());
        // Blocks after the failure are dropped on the idle check.
        provider.emit(&[0.5f32; 256]);

        assert_eq!(session.stop(), Err(RecorderError::EncoderClosed));
        // The error is reported once; afterwards stop is a clean no-op.
        assert!(session.stop().unwrap().is_none());

        // The file holds everything appended before the failure.
        let data = fs::read(&path).unwrap();
        let declared = u32::from_le_bytes([data[40], data[41], data[42], data[43]]);
        assert_eq!(declared, 256 * 2);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn block_delivered_during_start_is_captured() {
        let (mut session, provider, dir) = session("early_block");
        let path = dir.join("take.wav");

        provider.set_start_block(vec![0.25f32; 512]);
        session.start(&path, SinkFormat::Wav).unwrap();

        // The block the backend pushed before start() returned counts.
        assert_eq!(session.scope_snapshot().len(), 512);
        let summary = session.stop().unwrap().unwrap();
        assert_eq!(summary.frames, 512);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn failed_start_reverts_to_idle() {
        let provider = MockProvider::failing();
        let mut session = RecorderSession::new(provider, RecorderConfig::default()).unwrap();
        let dir = temp_dir("failed_start_state");

        let result = session.start(dir.join("t.wav"), SinkFormat::Wav);
        assert!(matches!(result, Err(RecorderError::Device(_))));
        assert_eq!(session.state(), RecorderState::Idle);
        assert_eq!(session.elapsed_secs(), 0);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn elapsed_is_zero_when_idle() {
        let (mut session, _provider, dir) = session("elapsed");
        assert_eq!(session.elapsed_secs(), 0);

        session.start(dir.join("t.wav"), SinkFormat::Wav).unwrap();
        assert!(session.is_running());
        session.stop().unwrap();
        assert_eq!(session.elapsed_secs(), 0);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn gain_can_change_in_either_state() {
        let (mut session, _provider, dir) = session("gain_states");
        session.set_gain_db(-6.0);
        assert_eq!(session.gain_db(), -6.0);

        session.start(dir.join("t.wav"), SinkFormat::Wav).unwrap();
        session.set_gain_db(12.0);
        assert_eq!(session.gain_db(), 12.0);
        session.stop().unwrap();

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn device_change_only_while_idle() {
        let (mut session, _provider, dir) = session("device_change");
        session.set_device_index(Some(2)).unwrap();
        assert_eq!(session.config().device_index, Some(2));

        session.start(dir.join("t.wav"), SinkFormat::Wav).unwrap();
        assert_eq!(
            session.set_device_index(None),
            Err(RecorderError::AlreadyRecording)
        );
        session.stop().unwrap();

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn fresh_scope_buffer_per_session() {
        let (mut session, provider, dir) = session("scope_reset");

        session.start(dir.join("a.wav"), SinkFormat::Wav).unwrap();
        provider.emit(&[0.7f32; 128]);
        assert_eq!(session.scope_snapshot().len(), 128);
        session.stop().unwrap();

        session.start(dir.join("b.wav"), SinkFormat::Wav).unwrap();
        assert!(session.scope_snapshot().is_empty());
        session.stop().unwrap();

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn stereo_blocks_are_downmixed_for_scope() {
        let provider = MockProvider::default();
        let handle = provider.clone();
        let config = RecorderConfig {
            channels: 2,
            ..Default::default()
        };
        let mut session = RecorderSession::new(provider, config).unwrap();
        let dir = temp_dir("stereo_downmix");

        session.start(dir.join("t.wav"), SinkFormat::Wav).unwrap();
        handle.emit(&[0.2, 0.8, 0.4, 0.6]); // two frames, mean 0.5 each
        let snap = session.scope_snapshot();
        assert_eq!(snap.len(), 2);
        assert!((snap[0] - 0.5).abs() < 1e-6);
        assert!((snap[1] - 0.5).abs() < 1e-6);
        session.stop().unwrap();

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn invalid_config_is_rejected_at_construction() {
        let config = RecorderConfig {
            sample_rate: 0,
            ..Default::default()
        };
        let result = RecorderSession::new(MockProvider::default(), config);
        assert!(matches!(result, Err(RecorderError::Config(_))));
    }

    #[test]
    fn summary_checksum_matches_file_contents() {
        let (mut session, provider, dir) = session("checksum");
        let path = dir.join("take.wav");

        session.start(&path, SinkFormat::Wav).unwrap();
        provider.emit(&[0.3f32; 256]);
        let summary = session.stop().unwrap().unwrap();

        assert_eq!(summary.checksum.len(), 64);
        assert_eq!(summary.checksum, encode::sha256_file(&path).unwrap());

        fs::remove_dir_all(&dir).ok();
    }
}
