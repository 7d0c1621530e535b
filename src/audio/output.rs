//! Audio output management using the `cpal` crate.
//!
//! This module selects a stream configuration on the default output device
//! and builds the real-time callback that drains the sample ring buffer,
//! applies the volume, and reports when a finished track has fully played.

use std::{
    sync::{
        Arc,
        atomic::{
            AtomicBool, AtomicU32,
            Ordering::{Acquire, Relaxed, Release},
        },
    },
    time::Duration,
};

use {
    cpal::{
        BufferSize::Default as CpalDefault,
        BuildStreamError, ChannelCount, Device, OutputCallbackInfo, PlayStreamError,
        SampleFormat::{self, F32, I16, U16},
        SizedSample, Stream, StreamConfig, default_host,
        traits::{DeviceTrait, HostTrait},
    },
    num_traits::cast::ToPrimitive,
    rtrb::{Consumer, PopError::Empty},
    thiserror::Error,
    tracing::error,
};

/// Error type for audio output operations.
#[derive(Error, Debug)]
pub enum OutputError {
    /// CPAL stream construction error.
    #[error("Audio output error: {0}")]
    CpalError(#[from] BuildStreamError),
    /// Failed to start or pause the audio stream.
    #[error("Failed to control audio stream: {0}")]
    StreamStartError(#[from] PlayStreamError),
    /// No suitable audio device found.
    #[error("No suitable audio device found")]
    NoDeviceFound,
    /// Unsupported sample format.
    #[error("Unsupported sample format: {format:?}")]
    UnsupportedSampleFormat { format: SampleFormat },
}

/// Audio output configuration.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Callback timeout in milliseconds.
    pub buffer_duration_ms: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            buffer_duration_ms: 50,
        }
    }
}

/// State shared between the control thread and the real-time callback.
#[derive(Debug)]
pub struct StreamSignals {
    /// Output gain stored as `f32` bits.
    volume: AtomicU32,
    /// Raised by the decoder thread once the whole track is in the ring.
    pub decode_finished: Arc<AtomicBool>,
    /// Raised by the callback once the ring is empty after decoding finished.
    drained: AtomicBool,
}

impl StreamSignals {
    /// Creates signals for a new stream with the given gain.
    #[must_use]
    pub fn new(volume: f32) -> Self {
        Self {
            volume: AtomicU32::new(volume.to_bits()),
            decode_finished: Arc::new(AtomicBool::new(false)),
            drained: AtomicBool::new(false),
        }
    }

    /// Sets the output gain.
    pub fn set_volume(&self, volume: f32) {
        self.volume.store(volume.to_bits(), Relaxed);
    }

    /// Current output gain.
    #[must_use]
    pub fn volume(&self) -> f32 {
        f32::from_bits(self.volume.load(Relaxed))
    }

    /// Whether every decoded sample has been handed to the device.
    #[must_use]
    pub fn is_drained(&self) -> bool {
        self.drained.load(Acquire)
    }

    fn mark_drained_if_finished(&self) {
        if self.decode_finished.load(Acquire) {
            self.drained.store(true, Release);
        }
    }
}

/// Negotiated stream parameters.
#[derive(Debug, Clone)]
pub struct StreamSetup {
    /// Configuration passed to cpal.
    pub config: StreamConfig,
    /// Device sample format.
    pub sample_format: SampleFormat,
}

impl StreamSetup {
    /// Output channel count.
    #[must_use]
    pub fn channels(&self) -> usize {
        usize::from(self.config.channels)
    }
}

/// Handle to the default output device.
pub struct AudioOutput {
    /// The selected output device.
    device: Device,
    /// Current output configuration.
    config: OutputConfig,
}

impl AudioOutput {
    /// Opens the default output device.
    ///
    /// # Errors
    ///
    /// Returns `OutputError::NoDeviceFound` if the host has no output device.
    pub fn new(config: OutputConfig) -> Result<Self, OutputError> {
        let device = default_host()
            .default_output_device()
            .ok_or(OutputError::NoDeviceFound)?;

        Ok(Self { device, config })
    }

    /// Chooses a stream configuration, preferring the source sample rate.
    ///
    /// The device's default channel count and sample format are kept. When
    /// the device cannot run at `source_rate`, its default rate is used and
    /// the caller is expected to resample.
    ///
    /// # Errors
    ///
    /// Returns `OutputError::NoDeviceFound` if device capabilities cannot be
    /// queried.
    pub fn stream_setup(&self, source_rate: u32) -> Result<StreamSetup, OutputError> {
        let default = self
            .device
            .default_output_config()
            .map_err(|_| OutputError::NoDeviceFound)?;
        let channels: ChannelCount = default.channels();
        let sample_format = default.sample_format();

        let supports_source_rate = self
            .device
            .supported_output_configs()
            .map_err(|_| OutputError::NoDeviceFound)?
            .any(|range| {
                range.channels() == channels
                    && range.sample_format() == sample_format
                    && range.min_sample_rate() <= source_rate
                    && source_rate <= range.max_sample_rate()
            });

        let sample_rate = if supports_source_rate {
            source_rate
        } else {
            default.sample_rate()
        };

        Ok(StreamSetup {
            config: StreamConfig {
                channels,
                sample_rate,
                buffer_size: CpalDefault,
            },
            sample_format,
        })
    }

    /// Builds (but does not start) an output stream reading from `consumer`.
    ///
    /// # Errors
    ///
    /// Returns `OutputError` if the sample format is unsupported or cpal
    /// cannot build the stream.
    pub fn create_stream(
        &self,
        setup: &StreamSetup,
        consumer: Consumer<f32>,
        signals: Arc<StreamSignals>,
    ) -> Result<Stream, OutputError> {
        match setup.sample_format {
            F32 => self.build_stream(&setup.config, consumer, signals, |s| s),
            I16 => self.build_stream(&setup.config, consumer, signals, |s| {
                (s * f32::from(i16::MAX)).to_i16().unwrap_or(0)
            }),
            U16 => self.build_stream(&setup.config, consumer, signals, |s| {
                ((s + 1.0) * f32::from(u16::MAX) / 2.0)
                    .to_u16()
                    .unwrap_or(u16::MAX / 2 + 1)
            }),
            format => Err(OutputError::UnsupportedSampleFormat { format }),
        }
    }

    fn build_stream<T>(
        &self,
        config: &StreamConfig,
        mut consumer: Consumer<f32>,
        signals: Arc<StreamSignals>,
        convert: fn(f32) -> T,
    ) -> Result<Stream, OutputError>
    where
        T: SizedSample + Send + 'static,
    {
        let timeout = Duration::from_millis(u64::from(self.config.buffer_duration_ms));
        let silence = convert(0.0);

        let stream = self.device.build_output_stream(
            config,
            move |data: &mut [T], _: &OutputCallbackInfo| {
                let volume = signals.volume();
                for sample in data.iter_mut() {
                    match consumer.pop() {
                        Ok(value) => *sample = convert((value * volume).clamp(-1.0, 1.0)),
                        Err(Empty) => {
                            *sample = silence;
                            signals.mark_drained_if_finished();
                        }
                    }
                }
            },
            |err| error!("Audio stream error: {err}"),
            Some(timeout),
        )?;

        Ok(stream)
    }
}
