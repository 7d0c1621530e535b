//! Operational error context propagation with `anyhow`.
//!
//! Startup failures in the binary carry context through [`ResultExt`];
//! rejected playback commands are logged and turned into short messages by
//! [`ErrorReporter`].

use std::{error::Error as StdError, fmt::Display};

use {
    anyhow::{Context, Error, Result as AnyhowResult},
    tracing::{info, warn},
};

use crate::error::domain::PlaybackError;

/// Extension trait for enhanced error context.
pub trait ResultExt<T, E> {
    /// Adds context to an error with a static string.
    fn add_context(self, context: &'static str) -> AnyhowResult<T>
    where
        E: StdError + Send + Sync + 'static;

    /// Adds context to an error with a formatted string.
    fn add_contextf(self, format: impl Display) -> AnyhowResult<T>
    where
        E: StdError + Send + Sync + 'static;
}

impl<T, E> ResultExt<T, E> for Result<T, E> {
    fn add_context(self, context: &'static str) -> AnyhowResult<T>
    where
        E: StdError + Send + Sync + 'static,
    {
        self.context(context)
    }

    fn add_contextf(self, format: impl Display) -> AnyhowResult<T>
    where
        E: StdError + Send + Sync + 'static,
    {
        self.context(format.to_string())
    }
}

/// Centralized reporting for errors that are shown, not propagated.
pub struct ErrorReporter;

impl ErrorReporter {
    /// Logs a rejected playback command.
    ///
    /// Misuse (bad index, bad seek position) is expected from an interactive
    /// front-end and logged at `info`; backend failures at `warn`.
    pub fn playback(error: &PlaybackError, command: &str) {
        match error {
            PlaybackError::BackendUnavailable(_) => {
                warn!(command = command, error = %error, "Playback command failed");
            }
            _ => info!(command = command, error = %error, "Playback command ignored"),
        }
    }

    /// Logs a recoverable operational error.
    pub fn warn(error: &Error, context: &str) {
        warn!(context = context, error = %error, "Recoverable error");
    }

    /// Converts a playback error to a one-line message for the user.
    #[must_use]
    pub fn to_user_message(error: &PlaybackError) -> String {
        match error {
            PlaybackError::InvalidTrackIndex { index, len } if *len == 0 => {
                format!("Playlist is empty, nothing to play at #{index}")
            }
            PlaybackError::InvalidTrackIndex { index, len } => {
                format!("No track #{index}, choose 0..{}", len - 1)
            }
            PlaybackError::SeekOutOfRange { duration, .. } => {
                format!("Seek position must be between 0 and {duration:.0} seconds")
            }
            PlaybackError::NoTrackLoaded => "Nothing is loaded yet".to_string(),
            PlaybackError::BackendUnavailable(e) => format!("Audio output problem: {e}"),
        }
    }
}
