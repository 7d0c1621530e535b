//! Domain-specific error types using `thiserror`.
//!
//! Playback errors are deliberately non-fatal: every variant describes a
//! command that was rejected as a whole and left the session untouched.

use std::{io::Error as StdError, result::Result as StdResult};

use {serde_json::Error as SerdeJsonError, thiserror::Error};

use crate::audio::backend::BackendError;

/// Playback controller errors.
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// Play target outside the active playlist.
    #[error("Invalid track index {index} for playlist of {len} tracks")]
    InvalidTrackIndex { index: usize, len: usize },
    /// Seek target outside `[0, duration]`.
    #[error("Seek position {position:.2}s outside track duration {duration:.2}s")]
    SeekOutOfRange { position: f64, duration: f64 },
    /// Seek or resume requested with nothing loaded.
    #[error("No track loaded")]
    NoTrackLoaded,
    /// The audio backend rejected a command.
    #[error("Audio backend unavailable: {0}")]
    BackendUnavailable(#[from] BackendError),
}

/// Playlist catalog and music directory errors.
#[derive(Error, Debug)]
pub enum LibraryError {
    /// Failed to read or write the catalog or a music file.
    #[error("IO error: {0}")]
    IoError(#[from] StdError),
    /// Catalog document could not be (de)serialized.
    #[error("Catalog format error: {0}")]
    SerializationError(#[from] SerdeJsonError),
    /// Playlist name not present in the catalog.
    #[error("Playlist not found: {name}")]
    PlaylistNotFound { name: String },
    /// Playlist name already taken.
    #[error("Playlist already exists: {name}")]
    PlaylistExists { name: String },
    /// Track index outside the playlist.
    #[error("Track index {index} out of range for playlist {playlist}")]
    TrackIndexOutOfRange { playlist: String, index: usize },
    /// Invalid file path or name.
    #[error("Invalid data: {reason}")]
    InvalidData { reason: String },
}

/// Result alias for playback controller operations.
pub type Result<T> = StdResult<T, PlaybackError>;
