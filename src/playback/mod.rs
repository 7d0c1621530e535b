//! Playback session state machine and its collaborators.
//!
//! The [`PlaybackController`] owns every session transition; the
//! [`EndOfTrackMonitor`] polls for natural track completion and the
//! [`TimelineReporter`] answers position queries for display.

pub mod clock;
pub mod controller;
pub mod events;
pub mod monitor;
pub mod session;
pub mod timeline;

#[cfg(test)]
mod controller_tests;
#[cfg(test)]
pub(crate) mod test_support;

pub use {
    clock::{Clock, SystemClock},
    controller::PlaybackController,
    events::PlaybackEvent,
    monitor::EndOfTrackMonitor,
    session::{PlaybackSession, PlaybackState},
    timeline::{Timeline, TimelineReporter, format_time},
};
