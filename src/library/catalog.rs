//! JSON-backed playlist catalog.
//!
//! The catalog is a single document mapping playlist names to ordered track
//! lists. Every mutating call persists the document before returning.

use std::{
    collections::BTreeMap,
    fs::{create_dir_all, read_to_string, write},
    path::{Path, PathBuf},
};

use {
    parking_lot::RwLock,
    serde_json::{from_str, to_string_pretty},
    tracing::{debug, info},
};

use crate::{
    error::LibraryError,
    library::{models::Track, source::PlaylistSource},
};

/// Name of the playlist that mirrors the music directory.
pub const ALL_SONGS: &str = "All Songs";

type Playlists = BTreeMap<String, Vec<Track>>;

/// Persistent store of named playlists.
#[derive(Debug)]
pub struct PlaylistCatalog {
    /// Playlists keyed by name.
    playlists: RwLock<Playlists>,
    /// Location of the JSON document.
    path: PathBuf,
}

impl PlaylistCatalog {
    /// Opens the catalog at `path`, creating it with an empty
    /// [`ALL_SONGS`] playlist if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError` if the file cannot be read, parsed, or created.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, LibraryError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            create_dir_all(parent)?;
        }

        let mut playlists: Playlists = if path.exists() {
            debug!("Loading playlist catalog from {:?}", path);
            from_str(&read_to_string(&path)?)?
        } else {
            info!("Creating playlist catalog at {:?}", path);
            BTreeMap::new()
        };
        let created = !playlists.contains_key(ALL_SONGS);
        playlists.entry(ALL_SONGS.to_string()).or_default();

        let catalog = Self {
            playlists: RwLock::new(playlists),
            path,
        };
        if created {
            catalog.save()?;
        }
        Ok(catalog)
    }

    /// Location of the catalog document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All playlist names in sorted order.
    #[must_use]
    pub fn playlist_names(&self) -> Vec<String> {
        self.playlists.read().keys().cloned().collect()
    }

    /// Whether a playlist with this name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.playlists.read().contains_key(name)
    }

    /// Creates an empty playlist.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::InvalidData` for a blank name,
    /// `LibraryError::PlaylistExists` for a taken one, or an IO error if the
    /// catalog cannot be saved.
    pub fn add_playlist(&self, name: &str) -> Result<(), LibraryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LibraryError::InvalidData {
                reason: "playlist name is empty".to_string(),
            });
        }

        {
            let mut playlists = self.playlists.write();
            if playlists.contains_key(name) {
                return Err(LibraryError::PlaylistExists {
                    name: name.to_string(),
                });
            }
            playlists.insert(name.to_string(), Vec::new());
        }
        info!("Created playlist {name:?}");
        self.save()
    }

    /// Replaces the contents of [`ALL_SONGS`].
    ///
    /// # Errors
    ///
    /// Returns `LibraryError` if the catalog cannot be saved.
    pub fn replace_all_songs(&self, tracks: Vec<Track>) -> Result<(), LibraryError> {
        debug!("Refreshing {ALL_SONGS} with {} tracks", tracks.len());
        self.playlists.write().insert(ALL_SONGS.to_string(), tracks);
        self.save()
    }

    /// Tracks of `playlist` whose name contains `term`, ignoring case.
    ///
    /// Each match carries its index in the full playlist so it can be passed
    /// straight to `play`.
    #[must_use]
    pub fn search(&self, playlist: &str, term: &str) -> Vec<(usize, Track)> {
        let needle = term.to_lowercase();
        self.playlists
            .read()
            .get(playlist)
            .map(|tracks| {
                tracks
                    .iter()
                    .enumerate()
                    .filter(|(_, track)| track.name.to_lowercase().contains(&needle))
                    .map(|(index, track)| (index, track.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Writes the catalog document to disk.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError` if serialization or the write fails.
    pub fn save(&self) -> Result<(), LibraryError> {
        let contents = to_string_pretty(&*self.playlists.read())?;
        write(&self.path, contents)?;
        debug!("Saved playlist catalog to {:?}", self.path);
        Ok(())
    }
}

impl PlaylistSource for PlaylistCatalog {
    fn tracks(&self, playlist: &str) -> Vec<Track> {
        self.playlists
            .read()
            .get(playlist)
            .cloned()
            .unwrap_or_default()
    }

    fn remove_track(&self, playlist: &str, index: usize) -> Result<Track, LibraryError> {
        let removed = {
            let mut playlists = self.playlists.write();
            let tracks = playlists
                .get_mut(playlist)
                .ok_or_else(|| LibraryError::PlaylistNotFound {
                    name: playlist.to_string(),
                })?;
            if index >= tracks.len() {
                return Err(LibraryError::TrackIndexOutOfRange {
                    playlist: playlist.to_string(),
                    index,
                });
            }
            tracks.remove(index)
        };
        info!("Removed {:?} from {playlist:?}", removed.name);
        self.save()?;
        Ok(removed)
    }
}
