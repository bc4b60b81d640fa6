//! Audio resampling for the capture path.
//!
//! The live recognition engine wants 16kHz mono f32 PCM regardless of what
//! the input device produces.

use anyhow::{Context, Result};
use rubato::{FftFixedIn, Resampler};

/// Sample rate the recognition engine consumes.
pub const TARGET_SAMPLE_RATE: u32 = 16000;

/// Frames fed to the FFT resampler per process call.
const CHUNK_FRAMES: usize = 1024;

/// Streaming resampler to 16kHz mono.
///
/// Capture callbacks deliver arbitrarily sized sample runs; whole chunks are
/// resampled as they fill up and the remainder is carried into the next push,
/// so no padding distortion leaks into the stream mid-session.
pub struct ChunkResampler {
    inner: Option<FftFixedIn<f32>>,
    pending: Vec<f32>,
}

impl ChunkResampler {
    /// Create a resampler from `source_rate` to 16kHz. A source already at
    /// 16kHz passes samples through untouched.
    pub fn new(source_rate: u32) -> Result<Self> {
        let inner = if source_rate == TARGET_SAMPLE_RATE {
            None
        } else {
            Some(
                FftFixedIn::<f32>::new(
                    source_rate as usize,
                    TARGET_SAMPLE_RATE as usize,
                    CHUNK_FRAMES,
                    2, // sub-chunks
                    1, // channels (mono)
                )
                .context("Failed to create resampler")?,
            )
        };
        Ok(Self {
            inner,
            pending: Vec::new(),
        })
    }

    /// Feed mono samples in; get whatever full chunks resolved to 16kHz out.
    pub fn push(&mut self, samples: &[f32]) -> Vec<f32> {
        let Some(resampler) = self.inner.as_mut() else {
            return samples.to_vec();
        };

        self.pending.extend_from_slice(samples);

        let mut output = Vec::new();
        while self.pending.len() >= CHUNK_FRAMES {
            let chunk: Vec<f32> = self.pending.drain(..CHUNK_FRAMES).collect();
            match resampler.process(&[chunk], None) {
                Ok(result) => output.extend_from_slice(&result[0]),
                Err(e) => {
                    crate::verbose!("resampler dropped a chunk: {e}");
                }
            }
        }
        output
    }
}

/// Convert multichannel audio to mono by averaging all channels
pub fn mix_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks(channels as usize)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mix_to_mono() {
        let stereo = vec![0.5, 0.3, 0.8, 0.2, 1.0, 0.0];
        let mono = mix_to_mono(&stereo, 2);
        assert_eq!(mono.len(), 3);
        assert!((mono[0] - 0.4).abs() < 0.001);
        assert!((mono[1] - 0.5).abs() < 0.001);
        assert!((mono[2] - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_mono_passthrough() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(mix_to_mono(&samples, 1), samples);
    }

    #[test]
    fn test_passthrough_at_16k() {
        let mut resampler = ChunkResampler::new(16000).unwrap();
        let samples = vec![0.1, 0.2, 0.3, 0.4, 0.5];
        assert_eq!(resampler.push(&samples), samples);
    }

    #[test]
    fn test_partial_chunks_are_carried_over() {
        let mut resampler = ChunkResampler::new(48000).unwrap();
        // Below one chunk: nothing comes out yet, nothing is lost.
        assert!(resampler.push(&vec![0.0; 512]).is_empty());
        // Crossing the chunk boundary flushes the buffered frames.
        let out = resampler.push(&vec![0.0; 512]);
        assert!(!out.is_empty());
        // 48k -> 16k shrinks the frame count to roughly a third.
        assert!(out.len() < CHUNK_FRAMES);
    }
}
