//! Music library: tracks, playlists, and the JSON playlist catalog.
//!
//! The playback core only sees the [`PlaylistSource`] trait; the catalog,
//! directory scanner, and artwork lookup are glue for the binary.

pub mod artwork;
pub mod catalog;
pub mod models;
pub mod scanner;
pub mod source;

pub use {
    artwork::find_album_art,
    catalog::{ALL_SONGS, PlaylistCatalog},
    models::{Playlist, Track},
    scanner::{LibraryScanner, import_file, scan_music_dir},
    source::PlaylistSource,
};
