//! Background detection of natural track completion.
//!
//! The audio backend only reports "no longer busy", never an explicit end
//! event, so completion has to be polled. The monitor ticks on a `tokio`
//! interval and hands every check to the controller, which decides under
//! the session lock whether anything finished.

use std::{sync::Arc, time::Duration};

use {
    async_channel::{Sender, bounded},
    tokio::{
        select,
        task::{JoinHandle, spawn_blocking},
        time::{MissedTickBehavior::Delay, interval},
    },
    tracing::{debug, warn},
};

use crate::playback::controller::PlaybackController;

/// Handle to the running end-of-track monitor task.
///
/// Dropping the handle also stops the task at its next tick.
pub struct EndOfTrackMonitor {
    /// Signals the task to exit.
    shutdown_tx: Sender<()>,
    /// The polling task.
    handle: JoinHandle<()>,
}

impl EndOfTrackMonitor {
    /// Spawns the monitor on the current `tokio` runtime.
    ///
    /// # Arguments
    ///
    /// * `controller` - Controller whose track end is checked each tick.
    /// * `period` - Time between checks.
    ///
    /// # Panics
    ///
    /// Panics if called outside a `tokio` runtime, or if `period` is zero.
    pub fn spawn(controller: Arc<PlaybackController>, period: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);

        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(Delay);
            debug!("End-of-track monitor started ({period:?})");

            loop {
                select! {
                    _ = shutdown_rx.recv() => break,
                    _ = ticker.tick() => {
                        let controller = Arc::clone(&controller);
                        // Backend calls block until the audio thread answers
                        match spawn_blocking(move || controller.check_track_end()).await {
                            Ok(Ok(true)) => debug!("Track completion handled"),
                            Ok(Ok(false)) => {}
                            Ok(Err(e)) => warn!("End-of-track check failed: {e}"),
                            Err(e) => warn!("End-of-track check did not finish: {e}"),
                        }
                    }
                }
            }

            debug!("End-of-track monitor stopped");
        });

        Self {
            shutdown_tx,
            handle,
        }
    }

    /// Stops the monitor and waits for the task to finish.
    pub async fn shutdown(self) {
        self.shutdown_tx.close();
        if let Err(e) = self.handle.await {
            warn!("End-of-track monitor task failed: {e}");
        }
    }
}
