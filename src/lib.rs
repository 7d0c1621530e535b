//! Musicora - playlist music player for the terminal
//!
//! A local audio player built around a playback session state machine: it
//! plays tracks from named playlists, tracks the elapsed position against a
//! monotonic clock, and advances through a playlist on its own in "play all"
//! mode. Audio goes through `symphonia` and `cpal`; playlists are kept in a
//! JSON catalog next to a scanned music directory.

pub mod audio;
pub mod cli;
pub mod config;
pub mod error;
pub mod library;
pub mod playback;

// Re-export key types for convenience
pub use {
    audio::{
        backend::{AudioBackend, BackendError},
        engine::{AudioEngine, EngineConfig},
    },
    config::{SettingsManager, UserSettings},
    error::{LibraryError, PlaybackError},
    library::{PlaylistCatalog, PlaylistSource, Track},
    playback::{
        EndOfTrackMonitor, PlaybackController, PlaybackEvent, PlaybackSession, PlaybackState,
        TimelineReporter,
    },
};
