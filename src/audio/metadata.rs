//! Track duration lookup using the `lofty` crate.
//!
//! Only the properties the playback controller needs are read here. Tag
//! values and embedded pictures are left to the display layer.

use std::path::Path;

use {
    lofty::{error::LoftyError, prelude::AudioFile, probe::Probe},
    thiserror::Error,
};

/// Error type for metadata extraction operations.
#[derive(Error, Debug)]
pub enum MetadataError {
    /// Failed to read or parse the audio file.
    #[error("Failed to read audio file: {0}")]
    ReadError(#[from] LoftyError),
    /// The file has no usable duration.
    #[error("Unknown duration for {path}")]
    UnknownDuration { path: String },
}

/// Reads audio properties from files on disk.
///
/// # Examples
///
/// ```no_run
/// use musicora::audio::metadata::TagReader;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let duration = TagReader::read_duration_seconds("/path/to/song.mp3")?;
///     println!("Duration: {duration:.1} s");
///     Ok(())
/// }
/// ```
pub struct TagReader;

impl TagReader {
    /// Reads the duration of a file, in seconds.
    ///
    /// # Errors
    ///
    /// Returns `MetadataError` if:
    /// - The file cannot be read or parsed
    /// - The container reports a zero duration
    pub fn read_duration_seconds<P: AsRef<Path>>(path: P) -> Result<f64, MetadataError> {
        let path = path.as_ref();

        let tagged_file = Probe::open(path)?.read()?;
        let duration_seconds = tagged_file.properties().duration().as_secs_f64();
        if duration_seconds <= 0.0 {
            return Err(MetadataError::UnknownDuration {
                path: path.display().to_string(),
            });
        }
        Ok(duration_seconds)
    }
}
