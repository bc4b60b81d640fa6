//! Microphone capture streaming 16kHz mono chunks into a channel.

use anyhow::{Context, Result, anyhow};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use tokio::sync::mpsc;

use crate::resample::{ChunkResampler, mix_to_mono};

/// Keeps the input stream alive while capture runs. Dropping it stops the
/// microphone and closes the sample channel.
pub struct CaptureHandle {
    _stream: Stream,
}

/// Open the default (or named) input device and stream 16kHz mono f32
/// chunks into `tx` until the returned handle is dropped.
pub fn start_capture(
    device_name: Option<&str>,
    tx: mpsc::UnboundedSender<Vec<f32>>,
) -> Result<CaptureHandle> {
    let device = find_device(device_name)?;
    let supported = device
        .default_input_config()
        .context("No default input configuration for the capture device")?;

    let channels = supported.channels();
    let source_rate = supported.sample_rate();
    let config: StreamConfig = supported.config();

    crate::verbose!(
        "capture: {} ch at {} Hz, format {:?}",
        channels,
        source_rate,
        supported.sample_format()
    );

    let stream = match supported.sample_format() {
        SampleFormat::F32 => build_stream::<f32>(&device, &config, channels, source_rate, tx)?,
        SampleFormat::I16 => build_stream::<i16>(&device, &config, channels, source_rate, tx)?,
        SampleFormat::U16 => build_stream::<u16>(&device, &config, channels, source_rate, tx)?,
        other => return Err(anyhow!("Unsupported input sample format: {other:?}")),
    };

    stream.play().context("Failed to start the input stream")?;
    Ok(CaptureHandle { _stream: stream })
}

fn find_device(device_name: Option<&str>) -> Result<Device> {
    let host = cpal::default_host();
    match device_name {
        None => host
            .default_input_device()
            .context("No default input device available"),
        Some(wanted) => {
            for device in host.input_devices()? {
                if let Ok(desc) = device.description()
                    && desc.to_string() == wanted
                {
                    return Ok(device);
                }
            }
            Err(anyhow!("Input device '{wanted}' not found"))
        }
    }
}

fn build_stream<T>(
    device: &Device,
    config: &StreamConfig,
    channels: u16,
    source_rate: u32,
    tx: mpsc::UnboundedSender<Vec<f32>>,
) -> Result<Stream>
where
    T: cpal::Sample + cpal::SizedSample,
    f32: cpal::FromSample<T>,
{
    let mut resampler = ChunkResampler::new(source_rate)?;
    let mut reported = false;

    // Stream errors are common on Linux and non-fatal; report once.
    let err_fn = move |err| {
        if !reported {
            reported = true;
            crate::verbose!("audio stream error (non-fatal, further ones suppressed): {err}");
        }
    };

    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            let f32_samples: Vec<f32> = data.iter().map(|&s| cpal::Sample::from_sample(s)).collect();
            let mono = mix_to_mono(&f32_samples, channels);
            let resampled = resampler.push(&mono);
            if !resampled.is_empty() {
                // Unbounded send never blocks the audio thread; a closed
                // receiver just means the session is winding down.
                let _ = tx.send(resampled);
            }
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}
