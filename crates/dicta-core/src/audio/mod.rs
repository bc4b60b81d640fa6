//! Microphone capture and device enumeration.

pub mod capture;
pub mod devices;

pub use capture::{CaptureHandle, start_capture};
pub use devices::{AudioDeviceInfo, default_input_available, list_input_devices};
