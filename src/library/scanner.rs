//! Music directory scanning and file import.

use std::{
    fs::{copy, create_dir_all, read_dir},
    path::{Path, PathBuf},
    sync::Arc,
};

use tracing::{debug, info, warn};

use crate::{
    error::LibraryError,
    library::{catalog::PlaylistCatalog, models::Track},
};

/// Lists the audio files directly inside `dir` as tracks.
///
/// A file qualifies when its extension matches one of `extensions`,
/// ignoring case. Tracks are named after the file stem and sorted by name.
///
/// # Errors
///
/// Returns `LibraryError::IoError` if the directory cannot be read.
pub fn scan_music_dir(dir: &Path, extensions: &[String]) -> Result<Vec<Track>, LibraryError> {
    let mut tracks = Vec::new();
    for entry in read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() || !has_audio_extension(&path, extensions) {
            continue;
        }
        match Track::from_path(&path) {
            Some(track) => tracks.push(track),
            None => warn!("Skipping file with unusable name: {}", path.display()),
        }
    }
    tracks.sort_by(|a, b| a.name.cmp(&b.name));
    debug!("Found {} tracks in {}", tracks.len(), dir.display());
    Ok(tracks)
}

fn has_audio_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|known| known.eq_ignore_ascii_case(ext)))
}

/// Copies `source` into `music_dir`.
///
/// Returns `Ok(None)` without copying when a file of the same name is
/// already there, otherwise the destination path.
///
/// # Errors
///
/// Returns `LibraryError` if `source` has no file name or the copy fails.
pub fn import_file(source: &Path, music_dir: &Path) -> Result<Option<PathBuf>, LibraryError> {
    let file_name = source
        .file_name()
        .ok_or_else(|| LibraryError::InvalidData {
            reason: format!("{} has no file name", source.display()),
        })?;
    let destination = music_dir.join(file_name);
    if destination.exists() {
        info!("{} is already in the library", destination.display());
        return Ok(None);
    }

    create_dir_all(music_dir)?;
    copy(source, &destination)?;
    info!("Imported {}", destination.display());
    Ok(Some(destination))
}

/// Keeps the "All Songs" playlist in step with the music directory.
pub struct LibraryScanner {
    catalog: Arc<PlaylistCatalog>,
    music_dir: PathBuf,
    extensions: Vec<String>,
}

impl LibraryScanner {
    /// Creates a scanner for `music_dir`.
    pub fn new(catalog: Arc<PlaylistCatalog>, music_dir: PathBuf, extensions: Vec<String>) -> Self {
        Self {
            catalog,
            music_dir,
            extensions,
        }
    }

    /// The scanned directory.
    #[must_use]
    pub fn music_dir(&self) -> &Path {
        &self.music_dir
    }

    /// Rescans the music directory and saves the refreshed catalog.
    ///
    /// A missing directory is created and yields an empty playlist.
    ///
    /// # Returns
    ///
    /// The number of tracks found.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError` if the directory cannot be read or the catalog
    /// cannot be saved.
    pub fn rescan(&self) -> Result<usize, LibraryError> {
        create_dir_all(&self.music_dir)?;
        let tracks = scan_music_dir(&self.music_dir, &self.extensions)?;
        let count = tracks.len();
        self.catalog.replace_all_songs(tracks)?;
        info!("Library scan complete: {count} tracks");
        Ok(count)
    }

    /// Imports `source` and rescans when something was copied.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError` if the import or the rescan fails.
    pub fn import(&self, source: &Path) -> Result<Option<PathBuf>, LibraryError> {
        let imported = import_file(source, &self.music_dir)?;
        if imported.is_some() {
            self.rescan()?;
        }
        Ok(imported)
    }
}
