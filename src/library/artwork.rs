//! Album art lookup by track name.

use std::path::{Path, PathBuf};

use tracing::debug;

/// Returns `<art_dir>/<track_name>.jpg` if that file exists.
#[must_use]
pub fn find_album_art(art_dir: &Path, track_name: &str) -> Option<PathBuf> {
    let candidate = art_dir.join(format!("{track_name}.jpg"));
    if candidate.is_file() {
        Some(candidate)
    } else {
        debug!("No album art at {}", candidate.display());
        None
    }
}
