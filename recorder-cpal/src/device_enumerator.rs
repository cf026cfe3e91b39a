//! Input device enumeration via cpal.

use cpal::traits::{DeviceTrait, HostTrait};

use recorder_core::{InputDevice, RecorderError};

/// List devices that advertise at least one capturable input
/// configuration.
///
/// Returns an empty vector (not an error) when no device qualifies.
/// Indices are positions in the host's input-device iteration and are
/// what `RecorderConfig::device_index` selects; they stay stable for
/// one enumeration pass.
pub fn list_input_devices() -> Result<Vec<InputDevice>, RecorderError> {
    let host = cpal::default_host();
    let default_name = host.default_input_device().and_then(|d| d.name().ok());

    let devices = host
        .input_devices()
        .map_err(|e| RecorderError::Device(format!("device enumeration failed: {e}")))?;

    let mut out = Vec::new();
    for (index, device) in devices.enumerate() {
        let has_input = device
            .supported_input_configs()
            .map(|mut configs| configs.next().is_some())
            .unwrap_or(false);
        if !has_input {
            continue;
        }

        let name = device.name().unwrap_or_else(|_| format!("Device {index}"));
        let is_default = default_name.as_deref() == Some(name.as_str());
        out.push(InputDevice {
            index,
            name,
            is_default,
        });
    }

    log::debug!("enumerated {} input devices", out.len());
    Ok(out)
}
