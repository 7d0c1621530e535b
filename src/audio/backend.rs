//! Audio backend capability used by the playback controller.
//!
//! The controller never decodes or outputs audio itself. Everything that
//! touches a sound device goes through the [`AudioBackend`] trait so the
//! state machine can be driven by the real `AudioEngine` in the binary and by
//! a recording mock in tests.

use std::path::Path;

use thiserror::Error;

use crate::audio::{decoder::DecoderError, metadata::MetadataError, output::OutputError};

/// Error type for audio backend calls.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Decoder error.
    #[error("Decoder error: {0}")]
    DecoderError(#[from] DecoderError),
    /// Output error.
    #[error("Output error: {0}")]
    OutputError(#[from] OutputError),
    /// Metadata error.
    #[error("Metadata error: {0}")]
    MetadataError(#[from] MetadataError),
    /// No track has been loaded into the backend.
    #[error("No track loaded")]
    NoTrackLoaded,
    /// The backend control thread is gone or did not answer.
    #[error("Audio backend unavailable: {reason}")]
    Unavailable { reason: String },
}

impl BackendError {
    /// Creates a new `Unavailable` error.
    ///
    /// # Arguments
    ///
    /// * `reason` - Why the backend could not be reached.
    ///
    /// # Returns
    ///
    /// A new `BackendError::Unavailable`.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }
}

/// Synchronous, fast audio playback capability.
///
/// Calls are fire-and-forget from the caller's point of view: they return
/// as soon as the backend has accepted the command. Failure is reported per
/// call and never retried by the backend.
pub trait AudioBackend: Send + Sync {
    /// Loads a track without starting playback. Any current playback stops.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the file cannot be opened or decoded.
    fn load(&self, path: &Path) -> Result<(), BackendError>;

    /// Starts playback of the loaded track from the beginning.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NoTrackLoaded` if nothing is loaded, or an
    /// output error if the device stream cannot be started.
    fn play(&self) -> Result<(), BackendError>;

    /// Starts playback of the loaded track at `offset_seconds`.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if nothing is loaded or seeking fails.
    fn play_from(&self, offset_seconds: f64) -> Result<(), BackendError>;

    /// Pauses playback, keeping the position.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the backend cannot be reached.
    fn pause(&self) -> Result<(), BackendError>;

    /// Resumes paused playback.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the backend cannot be reached.
    fn resume(&self) -> Result<(), BackendError>;

    /// Stops playback. The loaded track stays loaded.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the backend cannot be reached.
    fn stop(&self) -> Result<(), BackendError>;

    /// Whether the loaded track is actively producing sound.
    ///
    /// Returns `false` once a track has played to its end, after `stop`,
    /// and while paused.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the state cannot be queried.
    fn is_busy(&self) -> Result<bool, BackendError>;

    /// Sets the output volume on a `0.0..=1.0` scale.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the backend cannot be reached.
    fn set_volume(&self, level: f32) -> Result<(), BackendError>;

    /// Duration of the audio file at `path`, in seconds.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the file cannot be probed.
    fn duration_seconds(&self, path: &Path) -> Result<f64, BackendError>;
}
