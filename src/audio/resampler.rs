//! Sample rate conversion for devices that cannot open a stream at the
//! source rate.
//!
//! Wraps `rubato`'s FFT resampler behind an interleaved-in, interleaved-out
//! API so the decoder thread can stay oblivious to planar buffers.

use {
    rubato::{FftFixedIn, Resampler},
    thiserror::Error,
    tracing::info,
};

/// Input frames per resampler chunk.
const CHUNK_SIZE: usize = 1024;

/// Error type for resampling operations.
#[derive(Error, Debug)]
pub enum ResamplingError {
    /// Rubato resampling error.
    #[error("Rubato error: {0}")]
    RubatoError(String),
    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Interleaved real-time resampler.
pub struct AudioResampler {
    /// Rubato resampler instance.
    resampler: FftFixedIn<f32>,
    /// Number of channels.
    channels: usize,
    /// Accumulated interleaved input not yet consumed by a full chunk.
    pending: Vec<f32>,
}

impl AudioResampler {
    /// Creates a new audio resampler.
    ///
    /// # Arguments
    ///
    /// * `source_rate` - Source sample rate in Hz.
    /// * `target_rate` - Target sample rate in Hz.
    /// * `channels` - Number of audio channels.
    ///
    /// # Errors
    ///
    /// Returns `ResamplingError` if the rates are zero or identical, or if
    /// rubato rejects the configuration.
    pub fn new(
        source_rate: u32,
        target_rate: u32,
        channels: usize,
    ) -> Result<Self, ResamplingError> {
        if source_rate == 0 || target_rate == 0 || channels == 0 {
            return Err(ResamplingError::InvalidConfiguration(
                "Sample rates and channel count must be greater than 0".to_string(),
            ));
        }

        if source_rate == target_rate {
            return Err(ResamplingError::InvalidConfiguration(
                "Source and target rates must be different".to_string(),
            ));
        }

        let resampler = FftFixedIn::<f32>::new(
            source_rate as usize,
            target_rate as usize,
            CHUNK_SIZE,
            1,
            channels,
        )
        .map_err(|e| ResamplingError::RubatoError(e.to_string()))?;

        info!(
            "Created resampler: {} Hz -> {} Hz, {} channels",
            source_rate, target_rate, channels
        );

        Ok(Self {
            resampler,
            channels,
            pending: Vec::with_capacity(CHUNK_SIZE * channels),
        })
    }

    /// Resamples a block of interleaved samples.
    ///
    /// Input is buffered until a full chunk is available, so the output of
    /// a single call may be empty.
    ///
    /// # Errors
    ///
    /// Returns `ResamplingError` if rubato fails.
    pub fn resample_block(&mut self, input: &[f32]) -> Result<Vec<f32>, ResamplingError> {
        self.pending.extend_from_slice(input);

        let chunk_len = CHUNK_SIZE * self.channels;
        let mut output = Vec::new();
        while self.pending.len() >= chunk_len {
            let chunk: Vec<f32> = self.pending.drain(..chunk_len).collect();
            let planar = self.deinterleave(&chunk);
            let resampled = self
                .resampler
                .process(planar.as_slice(), None)
                .map_err(|e| ResamplingError::RubatoError(e.to_string()))?;
            interleave_into(&resampled, &mut output);
        }
        Ok(output)
    }

    /// Resamples whatever input is still pending at the end of a track.
    ///
    /// # Errors
    ///
    /// Returns `ResamplingError` if rubato fails.
    pub fn flush(&mut self) -> Result<Vec<f32>, ResamplingError> {
        let mut output = Vec::new();
        if self.pending.is_empty() {
            return Ok(output);
        }

        let chunk = std::mem::take(&mut self.pending);
        let planar = self.deinterleave(&chunk);
        let resampled = self
            .resampler
            .process_partial(Some(planar.as_slice()), None)
            .map_err(|e| ResamplingError::RubatoError(e.to_string()))?;
        interleave_into(&resampled, &mut output);
        Ok(output)
    }

    fn deinterleave(&self, interleaved: &[f32]) -> Vec<Vec<f32>> {
        let frames = interleaved.len() / self.channels;
        let mut planar: Vec<Vec<f32>> = (0..self.channels)
            .map(|_| Vec::with_capacity(frames))
            .collect();
        for frame in interleaved.chunks_exact(self.channels) {
            for (plane, &sample) in planar.iter_mut().zip(frame) {
                plane.push(sample);
            }
        }
        planar
    }
}

fn interleave_into(planar: &[Vec<f32>], output: &mut Vec<f32>) {
    let frames = planar.iter().map(Vec::len).min().unwrap_or(0);
    output.reserve(frames * planar.len());
    for frame in 0..frames {
        for plane in planar {
            output.push(plane[frame]);
        }
    }
}
