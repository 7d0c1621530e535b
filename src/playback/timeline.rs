//! Display-ready playback position.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::playback::{
    clock::Clock,
    session::{PlaybackSession, PlaybackState},
};

/// Elapsed and total time of the loaded track at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timeline {
    /// Position in `[0, duration_seconds]`.
    pub elapsed_seconds: f64,
    /// Duration of the loaded track.
    pub duration_seconds: f64,
    /// Playback state at the time of the read.
    pub state: PlaybackState,
}

impl Timeline {
    /// `"MM:SS / MM:SS"` label.
    #[must_use]
    pub fn label(&self) -> String {
        format!(
            "{} / {}",
            format_time(self.elapsed_seconds),
            format_time(self.duration_seconds)
        )
    }
}

/// Reads the timeline from the shared session.
///
/// Reads have no side effects and may happen at any cadence.
#[derive(Clone)]
pub struct TimelineReporter {
    session: Arc<Mutex<PlaybackSession>>,
    clock: Arc<dyn Clock>,
}

impl TimelineReporter {
    /// Creates a reporter over `session` using the controller's clock.
    pub fn new(session: Arc<Mutex<PlaybackSession>>, clock: Arc<dyn Clock>) -> Self {
        Self { session, clock }
    }

    /// Current timeline.
    ///
    /// During a seek gesture the gesture position is reported instead of
    /// the playback position.
    #[must_use]
    pub fn timeline(&self) -> Timeline {
        let now = self.clock.now_seconds();
        let session = self.session.lock();

        let elapsed_seconds = if session.user_is_scrubbing {
            session.clamp_position(session.scrub_position_seconds)
        } else {
            session.elapsed_at(now)
        };

        Timeline {
            elapsed_seconds,
            duration_seconds: session.duration_seconds,
            state: session.state,
        }
    }
}

/// Formats seconds as `MM:SS`, truncating fractions.
///
/// Minutes are not wrapped into hours; negative or non-finite input
/// formats as `00:00`.
#[must_use]
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    format!("{:02}:{:02}", total / 60, total % 60)
}
