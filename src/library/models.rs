//! Data models for tracks and playlists.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A single playable audio file.
///
/// Two tracks are the same track when their paths are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Track {
    /// Display name, the file stem for scanned files.
    pub name: String,
    /// Location of the audio file.
    pub path: PathBuf,
}

impl Track {
    /// Creates a track.
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Creates a track named after the file stem of `path`.
    ///
    /// Returns `None` if the path has no UTF-8 file stem.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_stem()?.to_str()?;
        Some(Self::new(name, path))
    }
}

/// A named, ordered collection of tracks.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Playlist {
    /// Playlist name.
    pub name: String,
    /// Tracks in play order.
    pub tracks: Vec<Track>,
}
