//! Audio file decoding using the `symphonia` crate.
//!
//! This module opens audio files, positions them at an arbitrary offset, and
//! feeds decoded interleaved samples to the output stream through a ring
//! buffer.

use std::{
    fs::File,
    io::{Error as StdError, ErrorKind::UnexpectedEof},
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering::Release},
    },
    thread::sleep,
    time::Duration,
};

use {
    rtrb::{Producer, PushError::Full},
    symphonia::{
        core::{
            audio::{AudioBufferRef, SampleBuffer, SignalSpec},
            codecs::{CODEC_TYPE_NULL, Decoder, DecoderOptions},
            errors::Error as SymphoniaError,
            formats::{FormatOptions, FormatReader, SeekMode::Accurate, SeekTo::Time},
            io::{MediaSourceStream, MediaSourceStreamOptions},
            meta::MetadataOptions,
            probe::Hint,
            units::Time as SymphoniaTime,
        },
        default::{get_codecs, get_probe},
    },
    thiserror::Error,
    tracing::{debug, warn},
};

use crate::audio::resampler::AudioResampler;

/// Sleep duration when producer buffer is full.
const PRODUCER_SLEEP_DURATION: Duration = Duration::from_micros(100);

/// Error type for audio decoding operations.
#[derive(Error, Debug)]
pub enum DecoderError {
    /// Failed to open or read the audio file.
    #[error("IO error: {0}")]
    IoError(#[from] StdError),
    /// Symphonia decoding error.
    #[error("Decoding error: {0}")]
    SymphoniaError(#[from] SymphoniaError),
    /// No audio track found in file.
    #[error("No audio track found")]
    NoAudioTrack,
    /// Seek target is not a finite, non-negative number of seconds.
    #[error("Invalid seek position: {position}")]
    InvalidSeekPosition { position: f64 },
    /// Sample rate conversion failed.
    #[error("Resampling error: {0}")]
    ResamplingError(String),
}

/// Outcome of decoding one packet.
pub enum DecodeStep<'a> {
    /// A decoded block of audio.
    Audio(AudioBufferRef<'a>),
    /// A corrupted packet was dropped.
    Skipped,
    /// The end of the stream was reached.
    EndOfStream,
}

/// Audio decoder that reads and decodes audio files.
pub struct AudioDecoder {
    /// The underlying format reader.
    format_reader: Box<dyn FormatReader>,
    /// The active audio decoder.
    decoder: Box<dyn Decoder>,
    /// Id of the selected audio track within the container.
    track_id: u32,
    /// Signal specification from symphonia (sample rate + channel layout).
    pub signal_spec: SignalSpec,
}

impl AudioDecoder {
    /// Creates a new audio decoder for the specified file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the audio file to decode.
    ///
    /// # Errors
    ///
    /// Returns `DecoderError` if:
    /// - The file cannot be opened or read
    /// - The file format is unsupported
    /// - No audio track is found in the file
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, DecoderError> {
        let path = path.as_ref();

        let file = File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), MediaSourceStreamOptions::default());

        let mut hint = Hint::new();
        if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
            hint.with_extension(extension);
        }

        let probed = get_probe().format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )?;
        let format_reader = probed.format;

        let track = format_reader
            .tracks()
            .iter()
            .find(|track| track.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(DecoderError::NoAudioTrack)?;

        let codec_params = &track.codec_params;
        let signal_spec = SignalSpec::new(
            codec_params.sample_rate.unwrap_or(44100),
            codec_params.channels.ok_or(DecoderError::NoAudioTrack)?,
        );
        let track_id = track.id;

        let decoder = get_codecs().make(codec_params, &DecoderOptions::default())?;

        Ok(AudioDecoder {
            format_reader,
            decoder,
            track_id,
            signal_spec,
        })
    }

    /// Reads and decodes the next packet of the selected track.
    ///
    /// # Errors
    ///
    /// Returns `DecoderError` if reading fails or the codec reports an
    /// unrecoverable error.
    pub fn decode_next_packet(&mut self) -> Result<DecodeStep<'_>, DecoderError> {
        let packet = loop {
            match self.format_reader.next_packet() {
                Ok(packet) if packet.track_id() == self.track_id => break packet,
                Ok(_) => {}
                Err(SymphoniaError::IoError(e)) if e.kind() == UnexpectedEof => {
                    return Ok(DecodeStep::EndOfStream);
                }
                Err(SymphoniaError::ResetRequired) => return Ok(DecodeStep::EndOfStream),
                Err(e) => return Err(e.into()),
            }
        };

        match self.decoder.decode(&packet) {
            Ok(decoded) => Ok(DecodeStep::Audio(decoded)),
            Err(SymphoniaError::DecodeError(reason)) => {
                debug!("Skipping undecodable packet: {reason}");
                Ok(DecodeStep::Skipped)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Seeks to the specified position in seconds.
    ///
    /// # Errors
    ///
    /// Returns `DecoderError` if the position is negative or not finite, or
    /// if the container cannot seek there.
    pub fn seek(&mut self, position_seconds: f64) -> Result<(), DecoderError> {
        if !position_seconds.is_finite() || position_seconds < 0.0 {
            return Err(DecoderError::InvalidSeekPosition {
                position: position_seconds,
            });
        }

        let whole = position_seconds.trunc();
        let time = SymphoniaTime::new(whole as u64, position_seconds - whole);
        self.format_reader.seek(
            Accurate,
            Time {
                time,
                track_id: Some(self.track_id),
            },
        )?;
        self.decoder.reset();
        Ok(())
    }

    /// Gets the duration of the selected track in seconds.
    ///
    /// Returns `None` if the container does not report a frame count.
    #[must_use]
    pub fn duration_seconds(&self) -> Option<f64> {
        self.format_reader
            .tracks()
            .iter()
            .find(|track| track.id == self.track_id)
            .and_then(|track| track.codec_params.n_frames)
            .map(|frames| frames as f64 / f64::from(self.signal_spec.rate))
    }

    /// Number of channels in the decoded signal.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.signal_spec.channels.count()
    }
}

/// Audio producer that feeds decoded samples into a ring buffer.
///
/// Samples are optionally resampled to the device rate and remapped to the
/// device channel count before being pushed.
pub struct AudioProducer {
    /// The audio decoder that provides raw audio samples.
    decoder: AudioDecoder,
    /// Ring buffer producer for writing decoded samples.
    producer: Producer<f32>,
    /// Sample rate converter, present when source and device rates differ.
    resampler: Option<AudioResampler>,
    /// Channel count of the output stream.
    output_channels: usize,
    /// Set once every sample of the track has been pushed.
    decode_finished: Arc<AtomicBool>,
}

impl AudioProducer {
    /// Creates a new audio producer.
    ///
    /// # Arguments
    ///
    /// * `decoder` - The audio decoder to use.
    /// * `producer` - The ring buffer producer to write samples to.
    /// * `resampler` - Optional converter to the device sample rate.
    /// * `output_channels` - Channel count expected by the output stream.
    /// * `decode_finished` - Flag raised when the end of the track is reached.
    pub fn new(
        decoder: AudioDecoder,
        producer: Producer<f32>,
        resampler: Option<AudioResampler>,
        output_channels: usize,
        decode_finished: Arc<AtomicBool>,
    ) -> Self {
        Self {
            decoder,
            producer,
            resampler,
            output_channels: output_channels.max(1),
            decode_finished,
        }
    }

    /// Runs the audio production loop until the track ends or the consumer
    /// side of the ring buffer is dropped.
    ///
    /// The finished flag is raised on every exit except an abandoned
    /// consumer, so a decode failure mid-track still lets the output drain
    /// and report the track as done.
    ///
    /// This method blocks and should be run on a dedicated worker thread.
    ///
    /// # Errors
    ///
    /// Returns `DecoderError` if decoding or resampling fails.
    pub fn run(mut self) -> Result<(), DecoderError> {
        let outcome = self.produce();
        mark_finished(&outcome, &self.decode_finished);
        outcome.map(|_| ())
    }

    fn produce(&mut self) -> Result<Production, DecoderError> {
        let source_channels = self.decoder.channel_count().max(1);

        loop {
            let buffer = match self.decoder.decode_next_packet()? {
                DecodeStep::Audio(buffer) => buffer,
                DecodeStep::Skipped => continue,
                DecodeStep::EndOfStream => break,
            };
            let spec = *buffer.spec();
            let mut interleaved = SampleBuffer::<f32>::new(buffer.capacity() as u64, spec);
            interleaved.copy_interleaved_ref(buffer);

            let samples = match self.resampler.as_mut() {
                Some(resampler) => resampler
                    .resample_block(interleaved.samples())
                    .map_err(|e| DecoderError::ResamplingError(e.to_string()))?,
                None => interleaved.samples().to_vec(),
            };

            if !self.push_frames(&samples, source_channels) {
                debug!("Output stream dropped, stopping decoder");
                return Ok(Production::Abandoned);
            }
        }

        if let Some(resampler) = self.resampler.as_mut() {
            let tail = resampler
                .flush()
                .map_err(|e| DecoderError::ResamplingError(e.to_string()))?;
            if !self.push_frames(&tail, source_channels) {
                return Ok(Production::Abandoned);
            }
        }

        debug!("Decoder reached end of track");
        Ok(Production::Finished)
    }

    /// Pushes interleaved frames, remapping channels to the output layout.
    ///
    /// Returns `false` if the consumer was abandoned.
    fn push_frames(&mut self, samples: &[f32], source_channels: usize) -> bool {
        for frame in samples.chunks_exact(source_channels) {
            for ch in 0..self.output_channels {
                let sample = frame[ch.min(source_channels - 1)];
                loop {
                    if self.producer.is_abandoned() {
                        return false;
                    }
                    match self.producer.push(sample) {
                        Ok(()) => break,
                        Err(Full(_)) => sleep(PRODUCER_SLEEP_DURATION),
                    }
                }
            }
        }
        true
    }
}

/// How a production run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Production {
    Finished,
    /// The output stream was dropped before the track ended.
    Abandoned,
}

fn mark_finished(outcome: &Result<Production, DecoderError>, decode_finished: &AtomicBool) {
    match outcome {
        Ok(Production::Abandoned) => {}
        Ok(Production::Finished) => decode_finished.store(true, Release),
        Err(e) => {
            warn!("Decoding stopped early: {e}");
            decode_finished.store(true, Release);
        }
    }
}
