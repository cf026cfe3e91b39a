//! Microphone capture via cpal.
//!
//! Delivers interleaved f32 blocks to the session's callback on cpal's
//! audio thread. Integer device formats are converted to f32 before
//! hand-off so the core only ever sees normalized samples.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;

use recorder_core::{
    AudioBlockCallback, CaptureErrorCallback, CaptureProvider, RecorderConfig, RecorderError,
};

/// Input capture stream backed by cpal.
///
/// The stream handle is not `Send` on every platform, so the capture —
/// and the session owning it — stays on the thread that started it;
/// block delivery happens on cpal's own audio thread.
pub struct CpalMicCapture {
    stream: Option<cpal::Stream>,
}

impl CpalMicCapture {
    pub fn new() -> Self {
        Self { stream: None }
    }
}

impl Default for CpalMicCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureProvider for CpalMicCapture {
    fn start(
        &mut self,
        config: &RecorderConfig,
        on_block: AudioBlockCallback,
        on_error: CaptureErrorCallback,
    ) -> Result<(), RecorderError> {
        if self.stream.is_some() {
            return Err(RecorderError::AlreadyRecording);
        }

        let host = cpal::default_host();
        let device = select_device(&host, config.device_index)?;
        let device_name = device.name().unwrap_or_else(|_| "unknown".into());

        let sample_format = device
            .default_input_config()
            .map_err(|e| RecorderError::Device(format!("no usable input config: {e}")))?
            .sample_format();

        let stream_config = cpal::StreamConfig {
            channels: config.channels,
            sample_rate: cpal::SampleRate(config.sample_rate),
            buffer_size: cpal::BufferSize::Fixed(config.block_size),
        };

        // The fixed block size is a hint; some backends reject it.
        let stream = match build_stream(
            &device,
            &stream_config,
            sample_format,
            on_block.clone(),
            on_error.clone(),
        ) {
            Ok(stream) => stream,
            Err(err) => {
                log::warn!("fixed buffer size rejected ({err}); retrying with backend default");
                let fallback = cpal::StreamConfig {
                    buffer_size: cpal::BufferSize::Default,
                    ..stream_config
                };
                build_stream(&device, &fallback, sample_format, on_block, on_error)?
            }
        };

        stream
            .play()
            .map_err(|e| RecorderError::Device(format!("failed to start stream: {e}")))?;
        self.stream = Some(stream);

        log::info!(
            "capture started on '{}' ({} Hz, {} ch, {:?})",
            device_name,
            config.sample_rate,
            config.channels,
            sample_format
        );
        Ok(())
    }

    fn stop(&mut self) -> Result<(), RecorderError> {
        if let Some(stream) = self.stream.take() {
            // Dropping the stream stops capture and releases the device.
            drop(stream);
            log::info!("capture stream stopped");
        }
        Ok(())
    }
}

fn select_device(
    host: &cpal::Host,
    index: Option<usize>,
) -> Result<cpal::Device, RecorderError> {
    match index {
        Some(i) => host
            .input_devices()
            .map_err(|e| RecorderError::Device(format!("device enumeration failed: {e}")))?
            .nth(i)
            .ok_or_else(|| RecorderError::Config(format!("no input device at index {i}"))),
        None => host
            .default_input_device()
            .ok_or_else(|| RecorderError::Device("no default input device".into())),
    }
}

fn build_stream(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    sample_format: SampleFormat,
    on_block: AudioBlockCallback,
    on_error: CaptureErrorCallback,
) -> Result<cpal::Stream, RecorderError> {
    let err_fn = move |err: cpal::StreamError| {
        on_error(RecorderError::Device(err.to_string()));
    };

    let stream = match sample_format {
        SampleFormat::F32 => device.build_input_stream(
            config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| on_block(data),
            err_fn,
            None,
        ),
        SampleFormat::I16 => device.build_input_stream(
            config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                let converted: Vec<f32> =
                    data.iter().map(|&s| s as f32 / i16::MAX as f32).collect();
                on_block(&converted);
            },
            err_fn,
            None,
        ),
        SampleFormat::U16 => device.build_input_stream(
            config,
            move |data: &[u16], _: &cpal::InputCallbackInfo| {
                let converted: Vec<f32> = data
                    .iter()
                    .map(|&s| (s as f32 / u16::MAX as f32) * 2.0 - 1.0)
                    .collect();
                on_block(&converted);
            },
            err_fn,
            None,
        ),
        other => {
            return Err(RecorderError::Device(format!(
                "unsupported sample format: {other:?}"
            )))
        }
    };

    stream.map_err(|e| RecorderError::Device(format!("failed to build input stream: {e}")))
}
