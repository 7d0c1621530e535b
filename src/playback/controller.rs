//! Playback session state machine.
//!
//! The `PlaybackController` is the only writer of the [`PlaybackSession`].
//! Every operation locks the session for its whole transition, talks to the
//! audio backend first, and mutates the session only after every backend
//! call has succeeded. A rejected command therefore leaves the session
//! exactly as it was. The one exception is a track that loads but fails to
//! start: loading has already replaced the previous stream, so the session
//! falls back to `Stopped` to match the idle backend. Commands from the
//! front-end and completions from the end-of-track monitor are applied in a
//! strict total order.

use std::sync::Arc;

use {
    parking_lot::Mutex,
    tokio::sync::broadcast::Receiver,
    tracing::{debug, info, warn},
};

use crate::{
    audio::backend::AudioBackend,
    error::domain::{PlaybackError, Result},
    library::source::PlaylistSource,
    playback::{
        clock::Clock,
        events::{EventSender, PlaybackEvent},
        session::{
            PlaybackSession,
            PlaybackState::{self, Paused, Playing, Stopped},
        },
    },
};

/// Drives the audio backend and owns all session transitions.
pub struct PlaybackController {
    /// The shared session.
    session: Arc<Mutex<PlaybackSession>>,
    /// Audio output capability.
    backend: Arc<dyn AudioBackend>,
    /// Playlist contents, re-read on every navigation.
    source: Arc<dyn PlaylistSource>,
    /// Time source for elapsed-time anchors.
    clock: Arc<dyn Clock>,
    /// Observer notifications.
    events: EventSender,
}

impl PlaybackController {
    /// Creates a controller over an existing session.
    ///
    /// # Arguments
    ///
    /// * `session` - The process-wide session, shared with timeline readers.
    /// * `backend` - Audio backend to drive.
    /// * `source` - Provider of playlist contents.
    /// * `clock` - Monotonic time source.
    pub fn new(
        session: Arc<Mutex<PlaybackSession>>,
        backend: Arc<dyn AudioBackend>,
        source: Arc<dyn PlaylistSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            session,
            backend,
            source,
            clock,
            events: EventSender::new(),
        }
    }

    /// The shared session handle.
    #[must_use]
    pub fn session(&self) -> Arc<Mutex<PlaybackSession>> {
        Arc::clone(&self.session)
    }

    /// The controller's time source.
    #[must_use]
    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// Subscribes to playback events.
    #[must_use]
    pub fn subscribe(&self) -> Receiver<PlaybackEvent> {
        self.events.subscribe()
    }

    /// A copy of the current session for display.
    #[must_use]
    pub fn session_snapshot(&self) -> PlaybackSession {
        self.session.lock().clone()
    }

    /// Loads and starts track `index` of the active playlist.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::InvalidTrackIndex` if `index` is outside the
    /// active playlist, or `PlaybackError::BackendUnavailable` if the
    /// backend rejects the track. A track that loads but fails to start
    /// leaves the session `Stopped` with no current track.
    pub fn play(&self, index: usize) -> Result<()> {
        let mut session = self.session.lock();
        self.play_locked(&mut session, index)
    }

    /// Pauses when playing, resumes when paused, does nothing when stopped.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::BackendUnavailable` if the backend rejects the
    /// pause or resume.
    pub fn toggle_play_pause(&self) -> Result<()> {
        let mut session = self.session.lock();
        self.toggle_locked(&mut session)
    }

    /// Stops playback and leaves continuous play. Calling it while stopped
    /// is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::BackendUnavailable` if the backend cannot stop.
    pub fn stop(&self) -> Result<()> {
        let mut session = self.session.lock();
        self.stop_locked(&mut session)
    }

    /// Plays the track after the current one.
    ///
    /// Past the end of the playlist the session is stopped instead.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError` if playing the next track or stopping fails.
    pub fn next(&self) -> Result<()> {
        let mut session = self.session.lock();
        self.next_locked(&mut session)
    }

    /// Plays the track before the current one. A no-op at the first track.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError` if the previous track cannot be played.
    pub fn prev(&self) -> Result<()> {
        let mut session = self.session.lock();
        match session.track_index.checked_sub(1) {
            Some(index) => self.play_locked(&mut session, index),
            None => {
                debug!("Already at the first track");
                Ok(())
            }
        }
    }

    /// Restarts the loaded track at `position_seconds` and plays it.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::NoTrackLoaded` if nothing was ever played,
    /// `PlaybackError::SeekOutOfRange` if the position is outside
    /// `[0, duration]`, or `PlaybackError::BackendUnavailable` if the backend
    /// cannot restart playback.
    pub fn seek(&self, position_seconds: f64) -> Result<()> {
        let mut session = self.session.lock();
        self.seek_locked(&mut session, position_seconds)
    }

    /// Sets the output volume, clamped to `[0.0, 1.0]`.
    ///
    /// Non-finite levels are ignored.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::BackendUnavailable` if the backend rejects the
    /// new level.
    pub fn set_volume(&self, level: f32) -> Result<()> {
        if !level.is_finite() {
            debug!("Ignoring non-finite volume {level}");
            return Ok(());
        }
        let level = level.clamp(0.0, 1.0);

        let mut session = self.session.lock();
        self.backend.set_volume(level)?;
        session.volume = level;
        self.events.send(PlaybackEvent::VolumeChanged(level));
        Ok(())
    }

    /// Enters continuous play and starts the first track of the active
    /// playlist.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError` if the first track cannot be played, in which
    /// case continuous play is left as it was.
    pub fn begin_play_all(&self) -> Result<()> {
        let mut session = self.session.lock();
        let previous = session.continuous_play;
        session.continuous_play = true;

        let result = self.play_locked(&mut session, 0);
        if result.is_err() {
            session.continuous_play = previous && session.state != Stopped;
        }
        result
    }

    /// Switches the playlist that indices refer to.
    ///
    /// The current track keeps playing; navigation afterwards uses the new
    /// playlist.
    pub fn select_playlist(&self, name: &str) {
        let mut session = self.session.lock();
        if session.active_playlist == name {
            return;
        }
        session.active_playlist = name.to_string();
        info!("Active playlist is now {name:?}");
        self.events
            .send(PlaybackEvent::PlaylistChanged(name.to_string()));
    }

    /// Per-track play button: toggles pause when `index` is the track that
    /// is playing, otherwise plays `index`. Leaves continuous play.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError` from the underlying toggle or play.
    pub fn play_or_toggle(&self, index: usize) -> Result<()> {
        let mut session = self.session.lock();
        if session.state == Playing && session.track_index == index {
            self.toggle_locked(&mut session)?;
        } else {
            self.play_locked(&mut session, index)?;
        }
        session.continuous_play = false;
        Ok(())
    }

    /// Starts a seek gesture at the current position.
    ///
    /// While scrubbing, timeline reads report the gesture position instead
    /// of the playback position.
    pub fn begin_scrub(&self) {
        let now = self.clock.now_seconds();
        let mut session = self.session.lock();
        session.scrub_position_seconds = session.elapsed_at(now);
        session.user_is_scrubbing = true;
    }

    /// Moves the seek gesture to `position_seconds`, clamped to the track.
    ///
    /// Ignored when no gesture is in progress.
    pub fn scrub_to(&self, position_seconds: f64) {
        let mut session = self.session.lock();
        if session.user_is_scrubbing {
            session.scrub_position_seconds = session.clamp_position(position_seconds);
        }
    }

    /// Ends the seek gesture and seeks to where it stopped.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError` if the seek fails. The gesture is over either
    /// way.
    pub fn end_scrub(&self) -> Result<()> {
        let mut session = self.session.lock();
        if !session.user_is_scrubbing {
            return Ok(());
        }
        session.user_is_scrubbing = false;

        if !session.has_track() {
            return Ok(());
        }
        let position = session.clamp_position(session.scrub_position_seconds);
        self.seek_locked(&mut session, position)
    }

    /// Handles natural completion of the playing track.
    ///
    /// When the session is playing and the backend is no longer busy, either
    /// advances to the next track (continuous play) or stops keeping the
    /// track index. If advancing fails the session is stopped.
    ///
    /// # Returns
    ///
    /// Whether a completion was handled.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::BackendUnavailable` if the busy query or the
    /// stop fails; the check can simply be repeated later.
    pub fn check_track_end(&self) -> Result<bool> {
        let mut session = self.session.lock();
        if session.state != Playing || self.backend.is_busy()? {
            return Ok(false);
        }

        debug!(index = session.track_index, "Track finished");
        if session.continuous_play {
            if let Err(e) = self.next_locked(&mut session) {
                warn!("Auto-advance failed, stopping: {e}");
                self.stop_locked(&mut session)?;
            }
        } else {
            self.stop_locked(&mut session)?;
        }
        Ok(true)
    }

    fn play_locked(&self, session: &mut PlaybackSession, index: usize) -> Result<()> {
        let tracks = self.source.tracks(&session.active_playlist);
        let track = tracks
            .get(index)
            .cloned()
            .ok_or(PlaybackError::InvalidTrackIndex {
                index,
                len: tracks.len(),
            })?;

        let duration = self.backend.duration_seconds(&track.path)?;
        self.backend.load(&track.path)?;
        if let Err(e) = self.backend.play() {
            // Loading replaced whatever was playing, so the backend is idle now
            warn!(index, "Playback failed to start: {e}");
            if let Err(stop_error) = self.stop_locked(session) {
                debug!("Stop after failed start also failed: {stop_error}");
                session.continuous_play = false;
                session.paused_elapsed_seconds = 0.0;
                self.set_state(session, Stopped);
            }
            session.current_track = None;
            session.duration_seconds = 0.0;
            return Err(e.into());
        }
        let now = self.clock.now_seconds();

        session.track_index = index;
        session.duration_seconds = if duration.is_finite() {
            duration.max(0.0)
        } else {
            0.0
        };
        session.play_anchor_seconds = now;
        session.paused_elapsed_seconds = 0.0;
        session.current_track = Some(track.clone());
        info!(
            index,
            duration = session.duration_seconds,
            "Playing {:?}",
            track.name
        );

        self.events.send(PlaybackEvent::TrackChanged { index, track });
        self.set_state(session, Playing);
        Ok(())
    }

    fn toggle_locked(&self, session: &mut PlaybackSession) -> Result<()> {
        let now = self.clock.now_seconds();
        match session.state {
            Playing => {
                let elapsed = session.elapsed_at(now);
                self.backend.pause()?;
                session.paused_elapsed_seconds = elapsed;
                debug!("Paused at {elapsed:.2}s");
                self.set_state(session, Paused);
            }
            Paused => {
                self.backend.resume()?;
                session.play_anchor_seconds = now - session.paused_elapsed_seconds;
                debug!("Resumed at {:.2}s", session.paused_elapsed_seconds);
                self.set_state(session, Playing);
            }
            Stopped => debug!("Toggle ignored while stopped"),
        }
        Ok(())
    }

    fn stop_locked(&self, session: &mut PlaybackSession) -> Result<()> {
        if session.state == Stopped {
            return Ok(());
        }

        self.backend.stop()?;
        session.continuous_play = false;
        session.paused_elapsed_seconds = 0.0;
        self.set_state(session, Stopped);
        Ok(())
    }

    fn next_locked(&self, session: &mut PlaybackSession) -> Result<()> {
        let index = session.track_index + 1;
        let len = self.source.tracks(&session.active_playlist).len();
        if index >= len {
            debug!("End of playlist reached");
            return self.stop_locked(session);
        }
        self.play_locked(session, index)
    }

    fn seek_locked(
        &self,
        session: &mut PlaybackSession,
        position_seconds: f64,
    ) -> Result<()> {
        if !session.has_track() {
            return Err(PlaybackError::NoTrackLoaded);
        }
        let duration = session.duration_seconds;
        if !(0.0..=duration).contains(&position_seconds) {
            return Err(PlaybackError::SeekOutOfRange {
                position: position_seconds,
                duration,
            });
        }

        self.backend.play_from(position_seconds)?;
        session.play_anchor_seconds = self.clock.now_seconds() - position_seconds;
        session.paused_elapsed_seconds = 0.0;
        debug!("Seeked to {position_seconds:.2}s");
        self.set_state(session, Playing);
        Ok(())
    }

    fn set_state(&self, session: &mut PlaybackSession, state: PlaybackState) {
        session.state = state;
        self.events.send(PlaybackEvent::PlaybackStateChanged(state));
    }
}
