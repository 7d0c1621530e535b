//! The live record of what is loaded and playing.

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};

use crate::library::models::Track;

/// Playback state of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaybackState {
    /// Nothing is playing.
    #[default]
    Stopped,
    /// The loaded track is playing.
    Playing,
    /// The loaded track is paused and keeps its position.
    Paused,
}

impl Display for PlaybackState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let label = match self {
            PlaybackState::Stopped => "stopped",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
        };
        f.write_str(label)
    }
}

/// Mutable playback session.
///
/// One instance exists per process. It is shared behind a mutex and only
/// the playback controller writes to it; time fields are in seconds on the
/// controller's [`Clock`](crate::playback::clock::Clock).
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSession {
    /// Playlist that `track_index` refers to.
    pub active_playlist: String,
    /// Index into the active playlist. Meaningful only when not stopped.
    pub track_index: usize,
    /// Current playback state.
    pub state: PlaybackState,
    /// Output volume in `[0.0, 1.0]`.
    pub volume: f32,
    /// Duration of the loaded track, `0.0` if none.
    pub duration_seconds: f64,
    /// Clock reading at which elapsed time was zero for the current segment.
    pub play_anchor_seconds: f64,
    /// Elapsed time captured at pause.
    pub paused_elapsed_seconds: f64,
    /// Advance to the next track when the current one ends.
    pub continuous_play: bool,
    /// An interactive seek gesture is in progress.
    pub user_is_scrubbing: bool,
    /// Last position reported by the seek gesture.
    pub scrub_position_seconds: f64,
    /// The loaded track.
    pub current_track: Option<Track>,
}

impl PlaybackSession {
    /// Default output volume of a fresh session.
    pub const DEFAULT_VOLUME: f32 = 0.7;

    /// Creates a stopped session on `active_playlist`.
    ///
    /// `volume` is clamped to `[0.0, 1.0]`; a non-finite value falls back to
    /// [`Self::DEFAULT_VOLUME`].
    pub fn new(active_playlist: impl Into<String>, volume: f32) -> Self {
        let volume = if volume.is_finite() {
            volume.clamp(0.0, 1.0)
        } else {
            Self::DEFAULT_VOLUME
        };

        Self {
            active_playlist: active_playlist.into(),
            track_index: 0,
            state: PlaybackState::Stopped,
            volume,
            duration_seconds: 0.0,
            play_anchor_seconds: 0.0,
            paused_elapsed_seconds: 0.0,
            continuous_play: false,
            user_is_scrubbing: false,
            scrub_position_seconds: 0.0,
            current_track: None,
        }
    }

    /// Elapsed playback time at clock reading `now`, ignoring any scrub
    /// gesture. Always within `[0, duration_seconds]`.
    #[must_use]
    pub fn elapsed_at(&self, now: f64) -> f64 {
        let elapsed = match self.state {
            PlaybackState::Playing => now - self.play_anchor_seconds,
            PlaybackState::Paused => self.paused_elapsed_seconds,
            PlaybackState::Stopped => 0.0,
        };
        self.clamp_position(elapsed)
    }

    /// Clamps a position to `[0, duration_seconds]`, mapping NaN to zero.
    #[must_use]
    pub fn clamp_position(&self, position: f64) -> f64 {
        if position.is_nan() {
            0.0
        } else {
            position.clamp(0.0, self.duration_seconds)
        }
    }

    /// Whether a track has been loaded since startup.
    #[must_use]
    pub fn has_track(&self) -> bool {
        self.current_track.is_some()
    }
}

impl Default for PlaybackSession {
    fn default() -> Self {
        Self::new(String::new(), Self::DEFAULT_VOLUME)
    }
}
