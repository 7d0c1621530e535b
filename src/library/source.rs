//! Read access to playlists for the playback core.

use crate::{error::LibraryError, library::models::Track};

/// Ordered tracks by playlist name.
///
/// Implementations own the playlists; the controller asks again on every
/// navigation instead of caching, so external edits are always observed.
pub trait PlaylistSource: Send + Sync {
    /// Tracks of `playlist` in play order, empty if the playlist is unknown.
    fn tracks(&self, playlist: &str) -> Vec<Track>;

    /// Removes the track at `index` from `playlist`.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError` if the playlist or index does not exist, or if
    /// the change cannot be persisted.
    fn remove_track(&self, playlist: &str, index: usize) -> Result<Track, LibraryError>;
}
