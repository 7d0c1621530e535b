//! Notifications emitted by the playback controller.
//!
//! Observers subscribe through a `tokio` broadcast channel. A slow observer
//! only loses old events; it never blocks the controller.

use tokio::sync::broadcast::{Receiver, Sender, channel};

use crate::{library::models::Track, playback::session::PlaybackState};

/// Buffered events per subscriber before the oldest are dropped.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Playback change events.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    /// A new track was loaded and started.
    TrackChanged { index: usize, track: Track },
    /// Playback state changed.
    PlaybackStateChanged(PlaybackState),
    /// Output volume changed.
    VolumeChanged(f32),
    /// The active playlist changed.
    PlaylistChanged(String),
}

/// Sending half of the event channel.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: Sender<PlaybackEvent>,
}

impl EventSender {
    /// Creates a channel with no subscribers yet.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Publishes an event. Having no subscribers is not an error.
    pub fn send(&self, event: PlaybackEvent) {
        let _ = self.tx.send(event);
    }

    /// Subscribes to events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> Receiver<PlaybackEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventSender {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use crate::playback::{
        events::{EventSender, PlaybackEvent},
        session::PlaybackState,
    };

    #[test]
    fn test_send_without_subscribers() {
        EventSender::new().send(PlaybackEvent::VolumeChanged(0.5));
    }

    #[test]
    fn test_subscriber_receives_in_order() {
        let events = EventSender::new();
        let mut rx = events.subscribe();

        events.send(PlaybackEvent::PlaylistChanged("Chill".to_string()));
        events.send(PlaybackEvent::PlaybackStateChanged(PlaybackState::Paused));

        assert_eq!(
            rx.try_recv().unwrap(),
            PlaybackEvent::PlaylistChanged("Chill".to_string())
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            PlaybackEvent::PlaybackStateChanged(PlaybackState::Paused)
        );
        assert!(rx.try_recv().is_err());
    }
}
