//! Audio input device enumeration.

use anyhow::Result;
use cpal::traits::{DeviceTrait, HostTrait};

/// Information about one audio input device.
#[derive(Debug, Clone)]
pub struct AudioDeviceInfo {
    pub name: String,
    pub is_default: bool,
}

/// List all available audio input devices on the system.
///
/// # Errors
/// Returns an error if no audio input devices are found.
pub fn list_input_devices() -> Result<Vec<AudioDeviceInfo>> {
    let host = cpal::default_host();
    let default_device_name = host
        .default_input_device()
        .and_then(|d| d.description().ok())
        .map(|d| d.to_string());

    let mut devices = Vec::new();
    for device in host.input_devices()? {
        if let Ok(desc) = device.description() {
            let name = desc.to_string();
            devices.push(AudioDeviceInfo {
                name: name.clone(),
                is_default: default_device_name.as_ref() == Some(&name),
            });
        }
    }

    if devices.is_empty() {
        anyhow::bail!("No audio input devices found");
    }

    Ok(devices)
}

/// Whether a default input device is present. This is the microphone
/// capability query front-ends run before offering to start a session.
pub fn default_input_available() -> bool {
    cpal::default_host().default_input_device().is_some()
}
