//! Audio playback engine backed by `symphonia`, `rtrb` and `cpal`.
//!
//! The `AudioEngine` implements [`AudioBackend`]. The `cpal` stream is owned
//! by a dedicated control thread; callers talk to it through a command queue
//! and block until the command has been applied, so every backend call
//! reports its own failure.

use std::{
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU32, Ordering::SeqCst},
    },
    thread::{Builder, JoinHandle},
};

use {
    async_channel::{Receiver, Sender, bounded, unbounded},
    cpal::{Stream, traits::StreamTrait},
    parking_lot::RwLock,
    rtrb::RingBuffer,
    tracing::{debug, error, info, warn},
};

use crate::audio::{
    backend::{AudioBackend, BackendError},
    decoder::{AudioDecoder, AudioProducer, DecoderError},
    metadata::TagReader,
    output::{AudioOutput, OutputConfig, OutputError, StreamSignals},
    resampler::AudioResampler,
};

/// Engine construction parameters.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Sample capacity of the decoder-to-device ring buffer.
    pub ring_buffer_size: usize,
    /// Output gain applied to the first stream.
    pub initial_volume: f32,
    /// Device output configuration.
    pub output: OutputConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ring_buffer_size: 16384,
            initial_volume: 0.7,
            output: OutputConfig::default(),
        }
    }
}

type Reply = Sender<Result<(), BackendError>>;

/// Internal control messages for the audio engine.
#[derive(Debug)]
enum ControlMessage {
    /// Open a track without playing it.
    Load { path: PathBuf, reply: Reply },
    /// Start the loaded track at an offset in seconds.
    Play { offset_seconds: f64, reply: Reply },
    /// Pause the running stream.
    Pause { reply: Reply },
    /// Resume the paused stream.
    Resume { reply: Reply },
    /// Tear down the running stream.
    Stop { reply: Reply },
}

/// State readable without a round trip to the control thread.
#[derive(Debug)]
struct EngineShared {
    /// Output gain stored as `f32` bits.
    volume: AtomicU32,
    /// Whether the running stream is paused.
    paused: AtomicBool,
    /// Signals of the running stream, if any.
    signals: RwLock<Option<Arc<StreamSignals>>>,
}

/// Main audio playback engine.
///
/// Cloning is cheap; all clones drive the same control thread.
#[derive(Clone)]
pub struct AudioEngine {
    /// Sender for internal control messages.
    control_tx: Sender<ControlMessage>,
    /// State shared with the control thread.
    shared: Arc<EngineShared>,
}

/// A running device stream and its decoder thread.
struct ActiveStream {
    /// The CPAL audio stream.
    stream: Stream,
    /// Join handle for the decoder thread.
    decoder_handle: Option<JoinHandle<Result<(), DecoderError>>>,
}

/// Owner of the device stream, living on the control thread.
struct EngineWorker {
    config: EngineConfig,
    shared: Arc<EngineShared>,
    loaded: Option<PathBuf>,
    active: Option<ActiveStream>,
}

impl AudioEngine {
    /// Creates a new audio engine and starts its control thread.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Unavailable` if the control thread cannot be
    /// spawned.
    pub fn new(config: EngineConfig) -> Result<Self, BackendError> {
        let (control_tx, control_rx) = unbounded();
        let shared = Arc::new(EngineShared {
            volume: AtomicU32::new(config.initial_volume.to_bits()),
            paused: AtomicBool::new(false),
            signals: RwLock::new(None),
        });

        let worker = EngineWorker {
            config,
            shared: Arc::clone(&shared),
            loaded: None,
            active: None,
        };

        Builder::new()
            .name("audio-control".to_string())
            .spawn(move || worker.control_loop(control_rx))
            .map_err(|e| BackendError::unavailable(format!("cannot spawn control thread: {e}")))?;

        Ok(Self { control_tx, shared })
    }

    /// Sends a command and waits for the control thread to apply it.
    fn request(&self, build: impl FnOnce(Reply) -> ControlMessage) -> Result<(), BackendError> {
        let (reply_tx, reply_rx) = bounded(1);
        self.control_tx
            .send_blocking(build(reply_tx))
            .map_err(|e| BackendError::unavailable(format!("failed to send command: {e}")))?;
        reply_rx
            .recv_blocking()
            .map_err(|e| BackendError::unavailable(format!("no reply from control thread: {e}")))?
    }

    /// Stops playback and terminates the control thread.
    pub fn shutdown(&self) {
        debug!("Shutting down audio engine");
        if let Err(e) = AudioBackend::stop(self) {
            warn!("AudioEngine: stop during shutdown failed: {e}");
        }
        self.control_tx.close();
    }
}

impl AudioBackend for AudioEngine {
    fn load(&self, path: &Path) -> Result<(), BackendError> {
        let path = path.to_path_buf();
        self.request(|reply| ControlMessage::Load { path, reply })
    }

    fn play(&self) -> Result<(), BackendError> {
        self.play_from(0.0)
    }

    fn play_from(&self, offset_seconds: f64) -> Result<(), BackendError> {
        self.request(|reply| ControlMessage::Play {
            offset_seconds,
            reply,
        })
    }

    fn pause(&self) -> Result<(), BackendError> {
        self.request(|reply| ControlMessage::Pause { reply })
    }

    fn resume(&self) -> Result<(), BackendError> {
        self.request(|reply| ControlMessage::Resume { reply })
    }

    fn stop(&self) -> Result<(), BackendError> {
        self.request(|reply| ControlMessage::Stop { reply })
    }

    fn is_busy(&self) -> Result<bool, BackendError> {
        if self.control_tx.is_closed() {
            return Err(BackendError::unavailable("control thread exited"));
        }
        if self.shared.paused.load(SeqCst) {
            return Ok(false);
        }
        Ok(self
            .shared
            .signals
            .read()
            .as_ref()
            .is_some_and(|signals| !signals.is_drained()))
    }

    fn set_volume(&self, level: f32) -> Result<(), BackendError> {
        let level = level.clamp(0.0, 1.0);
        self.shared.volume.store(level.to_bits(), SeqCst);
        if let Some(signals) = self.shared.signals.read().as_ref() {
            signals.set_volume(level);
        }
        Ok(())
    }

    fn duration_seconds(&self, path: &Path) -> Result<f64, BackendError> {
        match TagReader::read_duration_seconds(path) {
            Ok(duration) => Ok(duration),
            Err(tag_error) => {
                debug!("Tag duration unavailable for {path:?}: {tag_error}, asking decoder");
                AudioDecoder::new(path)?
                    .duration_seconds()
                    .ok_or_else(|| tag_error.into())
            }
        }
    }
}

impl EngineWorker {
    /// Processes control messages until every sender is gone.
    fn control_loop(mut self, control_rx: Receiver<ControlMessage>) {
        while let Ok(message) = control_rx.recv_blocking() {
            let (result, reply) = match message {
                ControlMessage::Load { path, reply } => (self.handle_load(path), reply),
                ControlMessage::Play {
                    offset_seconds,
                    reply,
                } => (self.handle_play(offset_seconds), reply),
                ControlMessage::Pause { reply } => (self.handle_pause(), reply),
                ControlMessage::Resume { reply } => (self.handle_resume(), reply),
                ControlMessage::Stop { reply } => {
                    self.stop_stream();
                    (Ok(()), reply)
                }
            };

            if let Err(e) = &result {
                error!("AudioEngine: command failed: {e}");
            }
            if reply.try_send(result).is_err() {
                debug!("AudioEngine: caller stopped waiting for reply");
            }
        }

        self.stop_stream();
        debug!("AudioEngine control loop exited");
    }

    fn handle_load(&mut self, path: PathBuf) -> Result<(), BackendError> {
        // An unreadable file must not interrupt the current stream
        AudioDecoder::new(&path)?;
        self.stop_stream();
        info!("Loaded {}", path.display());
        self.loaded = Some(path);
        Ok(())
    }

    fn handle_play(&mut self, offset_seconds: f64) -> Result<(), BackendError> {
        let path = self.loaded.clone().ok_or(BackendError::NoTrackLoaded)?;

        let mut decoder = AudioDecoder::new(&path)?;
        if offset_seconds > 0.0 {
            decoder.seek(offset_seconds)?;
        }
        self.stop_stream();

        let output = AudioOutput::new(self.config.output.clone())?;
        let source_rate = decoder.signal_spec.rate;
        let setup = output.stream_setup(source_rate)?;

        let resampler = if setup.config.sample_rate == source_rate {
            None
        } else {
            Some(
                AudioResampler::new(source_rate, setup.config.sample_rate, decoder.channel_count())
                    .map_err(|e| DecoderError::ResamplingError(e.to_string()))?,
            )
        };

        let volume = f32::from_bits(self.shared.volume.load(SeqCst));
        let signals = Arc::new(StreamSignals::new(volume));
        let (producer, consumer) = RingBuffer::<f32>::new(self.config.ring_buffer_size);

        let stream = output.create_stream(&setup, consumer, Arc::clone(&signals))?;
        let producer = AudioProducer::new(
            decoder,
            producer,
            resampler,
            setup.channels(),
            Arc::clone(&signals.decode_finished),
        );
        let decoder_handle = Builder::new()
            .name("audio-decoder".to_string())
            .spawn(move || producer.run())
            .map_err(|e| BackendError::unavailable(format!("cannot spawn decoder: {e}")))?;

        if let Err(e) = stream.play() {
            // Dropping the stream abandons the ring, which ends the decoder
            drop(stream);
            join_decoder(decoder_handle);
            return Err(OutputError::from(e).into());
        }
        self.active = Some(ActiveStream {
            stream,
            decoder_handle: Some(decoder_handle),
        });

        self.shared.paused.store(false, SeqCst);
        *self.shared.signals.write() = Some(signals);
        debug!("Playback started at {offset_seconds:.2}s");
        Ok(())
    }

    fn handle_pause(&mut self) -> Result<(), BackendError> {
        if let Some(active) = &self.active {
            active
                .stream
                .pause()
                .map_err(|e| BackendError::unavailable(format!("failed to pause stream: {e}")))?;
            self.shared.paused.store(true, SeqCst);
        }
        Ok(())
    }

    fn handle_resume(&mut self) -> Result<(), BackendError> {
        let active = self.active.as_ref().ok_or(BackendError::NoTrackLoaded)?;
        active.stream.play().map_err(OutputError::from)?;
        self.shared.paused.store(false, SeqCst);
        Ok(())
    }

    /// Stops the current audio stream and joins its decoder thread.
    fn stop_stream(&mut self) {
        *self.shared.signals.write() = None;
        self.shared.paused.store(false, SeqCst);

        let Some(mut active) = self.active.take() else {
            return;
        };
        debug!("Stopping audio stream");

        let decoder_handle = active.decoder_handle.take();
        // Dropping the stream drops the ring consumer, which ends the decoder
        drop(active);

        if let Some(handle) = decoder_handle {
            join_decoder(handle);
        }
    }
}

fn join_decoder(handle: JoinHandle<Result<(), DecoderError>>) {
    match handle.join() {
        Ok(Ok(())) => debug!("Decoder thread stopped successfully"),
        Ok(Err(e)) => error!("Decoder thread stopped with error: {e}"),
        Err(e) => error!("Decoder thread panicked: {e:?}"),
    }
}
