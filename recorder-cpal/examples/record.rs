//! Minimal capture demo: list devices, record five seconds from the
//! default input to the system temp directory, print the level meter
//! while running.
//!
//! ```text
//! RUST_LOG=info cargo run --example record
//! ```

use std::io::Write;
use std::thread;
use std::time::Duration;

use recorder_core::{default_file_name, RecorderConfig, RecorderError, RecorderSession, SinkFormat};
use recorder_cpal::{list_input_devices, CpalMicCapture};

fn main() -> Result<(), RecorderError> {
    env_logger::init();

    let devices = list_input_devices()?;
    if devices.is_empty() {
        eprintln!("no input devices found");
        return Ok(());
    }
    for device in &devices {
        let marker = if device.is_default { " (default)" } else { "" };
        println!("[{}] {}{}", device.index, device.name, marker);
    }

    let mut session = RecorderSession::new(CpalMicCapture::new(), RecorderConfig::default())?;
    let path = std::env::temp_dir().join(default_file_name(SinkFormat::Wav));

    session.start(&path, SinkFormat::Wav)?;
    for _ in 0..50 {
        thread::sleep(Duration::from_millis(100));
        print!(
            "\rlevel: {:3}  elapsed: {}s ",
            session.current_level(),
            session.elapsed_secs()
        );
        std::io::stdout().flush().ok();
    }
    println!();

    if let Some(summary) = session.stop()? {
        println!(
            "saved {} ({:.2}s, {} frames, sha256 {})",
            summary.file_path.display(),
            summary.duration_secs,
            summary.frames,
            summary.checksum
        );
    }
    Ok(())
}
